use super::ServiceResult;
use livekit_api::services::room::{CreateRoomOptions, RoomClient, SendDataOptions};
use recording_catalog_proto::proto;
use std::sync::Arc;
use tracing::debug;

/// Room operations the service needs from LiveKit
#[async_trait::async_trait]
pub trait RoomDirectory: Send + Sync {
    /// Look a room up by name; `None` when it does not exist
    async fn get_room(&self, name: &str) -> ServiceResult<Option<proto::Room>>;

    async fn create_room(&self, name: &str, metadata: &str) -> ServiceResult<proto::Room>;

    async fn update_room_metadata(&self, name: &str, metadata: &str) -> ServiceResult<proto::Room>;

    /// Send a reliable data packet to every participant of the room
    async fn send_data(&self, room: &str, payload: Vec<u8>, topic: &str) -> ServiceResult<()>;
}

/// [`RoomDirectory`] backed by the LiveKit RoomService
#[derive(Debug, Clone)]
pub struct LiveKitRooms {
    client: Arc<RoomClient>,
}

impl LiveKitRooms {
    pub fn new(client: RoomClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

#[async_trait::async_trait]
impl RoomDirectory for LiveKitRooms {
    async fn get_room(&self, name: &str) -> ServiceResult<Option<proto::Room>> {
        let rooms = self.client.list_rooms(vec![name.to_string()]).await?;
        Ok(rooms.into_iter().find(|room| room.name == name))
    }

    async fn create_room(&self, name: &str, metadata: &str) -> ServiceResult<proto::Room> {
        debug!("Creating room {}", name);
        let options = CreateRoomOptions {
            metadata: metadata.to_string(),
            ..Default::default()
        };
        self.client.create_room(name, options).await
    }

    async fn update_room_metadata(&self, name: &str, metadata: &str) -> ServiceResult<proto::Room> {
        self.client.update_room_metadata(name, metadata).await
    }

    async fn send_data(&self, room: &str, payload: Vec<u8>, topic: &str) -> ServiceResult<()> {
        let options = SendDataOptions {
            kind: proto::data_packet::Kind::Reliable,
            topic: Some(topic.to_string()),
            ..Default::default()
        };

        // RoomClient::send_data holds a thread-local RNG across its request,
        // so its future is not Send; drive it on a blocking thread.
        let client = self.client.clone();
        let room = room.to_string();
        let handle = tokio::runtime::Handle::current();
        tokio::task::spawn_blocking(move || {
            handle.block_on(client.send_data(&room, payload, options))
        })
        .await
        .unwrap_or_else(|e| std::panic::resume_unwind(e.into_panic()))
    }
}
