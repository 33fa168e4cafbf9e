//! Classification of LiveKit webhook events.

use crate::proto::WebhookEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    EgressStarted,
    EgressUpdated,
    EgressEnded,
    Other,
}

impl EventKind {
    pub fn of(event: &WebhookEvent) -> Self {
        match event.event.as_str() {
            "egress_started" => Self::EgressStarted,
            "egress_updated" => Self::EgressUpdated,
            "egress_ended" => Self::EgressEnded,
            _ => Self::Other,
        }
    }
}

/// Name of the room the event concerns, looked up in the room, egress and
/// ingress payloads in that order.
pub fn room_name(event: &WebhookEvent) -> Option<&str> {
    let from_room = event.room.as_ref().map(|room| room.name.as_str());
    let from_egress = event.egress_info.as_ref().map(|info| info.room_name.as_str());
    let from_ingress = event.ingress_info.as_ref().map(|info| info.room_name.as_str());

    [from_room, from_egress, from_ingress]
        .into_iter()
        .flatten()
        .find(|name| !name.is_empty())
}
