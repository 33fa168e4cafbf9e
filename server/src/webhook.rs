//! Egress webhook bridge.
//!
//! Turns egress lifecycle events for rooms this application created into
//! `recordingStatus` updates on the room metadata, and persists the sidecar
//! once an egress has produced its file.

use crate::catalog::RecordingCatalog;
use crate::livekit::RoomDirectory;
use recording_catalog_proto::proto::{EgressInfo, WebhookEvent};
use recording_catalog_proto::{EventKind, RecordingStatus, RoomMetadata, sidecar, webhook};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What the bridge did with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeOutcome {
    /// Not an egress event, or one without egress details
    Ignored,
    /// The room belongs to another application, or is gone
    NotOwned,
    Handled {
        status: RecordingStatus,
        /// Whether a sidecar was written (egress_ended only)
        sidecar_saved: bool,
        /// Whether the room metadata update succeeded
        status_published: bool,
    },
}

pub struct EgressWebhookBridge {
    app_name: String,
    rooms: Arc<dyn RoomDirectory>,
    catalog: RecordingCatalog,
}

impl std::fmt::Debug for EgressWebhookBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EgressWebhookBridge")
            .field("app_name", &self.app_name)
            .field("rooms", &"<dyn RoomDirectory>")
            .field("catalog", &self.catalog)
            .finish()
    }
}

impl EgressWebhookBridge {
    pub fn new(
        app_name: impl Into<String>,
        rooms: Arc<dyn RoomDirectory>,
        catalog: RecordingCatalog,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            rooms,
            catalog,
        }
    }

    /// Apply a verified webhook event. Failures are logged, never returned,
    /// so the sender does not redeliver.
    pub async fn handle(&self, event: &WebhookEvent) -> BridgeOutcome {
        let kind = EventKind::of(event);
        if kind == EventKind::Other {
            debug!("Ignoring webhook event {}", event.event);
            return BridgeOutcome::Ignored;
        }

        let Some(egress) = event.egress_info.as_ref() else {
            warn!("Webhook event {} ({}) carries no egress info", event.event, event.id);
            return BridgeOutcome::Ignored;
        };

        if !self.is_owned(event).await {
            debug!("Webhook event {} is for a room we don't manage", event.id);
            return BridgeOutcome::NotOwned;
        }

        let status = RecordingStatus::from_egress_status(egress.status);
        info!(
            "📨 {} for egress {} in room {} ({})",
            event.event, egress.egress_id, egress.room_name, status
        );

        let sidecar_saved = match kind {
            EventKind::EgressEnded => self.save_sidecar(egress).await,
            _ => false,
        };

        let status_published = self.publish_status(&egress.room_name, status).await;

        BridgeOutcome::Handled {
            status,
            sidecar_saved,
            status_published,
        }
    }

    /// Whether the event's room was created by this application.
    ///
    /// Uses the metadata carried by the event when present, otherwise looks
    /// the room up. Lookup failures count as "not ours".
    async fn is_owned(&self, event: &WebhookEvent) -> bool {
        let carried = event
            .room
            .as_ref()
            .filter(|room| !room.metadata.is_empty())
            .map(|room| room.metadata.clone());

        let metadata = match carried {
            Some(metadata) => metadata,
            None => {
                let Some(room_name) = webhook::room_name(event) else {
                    return false;
                };
                match self.rooms.get_room(room_name).await {
                    Ok(Some(room)) => room.metadata,
                    Ok(None) => return false,
                    Err(e) => {
                        error!("Failed to look up room {}: {}", room_name, e);
                        return false;
                    }
                }
            }
        };

        RoomMetadata::parse(&metadata).is_some_and(|m| m.is_owned_by(&self.app_name))
    }

    async fn save_sidecar(&self, egress: &EgressInfo) -> bool {
        let record = match sidecar::to_record(egress) {
            Ok(record) => record,
            Err(e) => {
                error!("Cannot build sidecar for egress {}: {}", egress.egress_id, e);
                return false;
            }
        };

        match self.catalog.save_sidecar(&record).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to save sidecar for {}: {}", record.name, e);
                false
            }
        }
    }

    async fn publish_status(&self, room_name: &str, status: RecordingStatus) -> bool {
        let metadata = match RoomMetadata::new(self.app_name.clone(), status).to_json() {
            Ok(metadata) => metadata,
            Err(e) => {
                error!("Failed to encode room metadata: {}", e);
                return false;
            }
        };

        match self.rooms.update_room_metadata(room_name, &metadata).await {
            Ok(_) => {
                debug!("Room {} recording status is now {}", room_name, status);
                true
            }
            Err(e) => {
                error!("Failed to update metadata of room {}: {}", room_name, e);
                false
            }
        }
    }
}
