//! In-process fakes of LiveKit and object storage for unit and router tests.

use crate::livekit::{
    EgressController, RoomDirectory, ServiceError, ServiceResult, TwirpError, TwirpErrorCode,
};
use crate::storage::{ByteRange, ObjectStore, ObjectStream, OperatorStore, StorageError};
use bytes::Bytes;
use recording_catalog_proto::proto::{EgressInfo, EgressStatus, Room};
use recording_catalog_proto::{RecordingStatus, RoomMetadata};
use std::sync::Mutex;
use std::time::Duration;

fn twirp_error(code: &str, msg: &str) -> ServiceError {
    ServiceError::Twirp(TwirpError::Twirp(TwirpErrorCode {
        code: code.to_string(),
        msg: msg.to_string(),
    }))
}

fn unavailable() -> ServiceError {
    twirp_error(TwirpErrorCode::UNAVAILABLE, "livekit is down")
}

pub fn room_owned_by(name: &str, created_by: &str) -> Room {
    Room {
        sid: format!("RM_{}", name),
        name: name.to_string(),
        metadata: RoomMetadata::new(created_by, RecordingStatus::Stopped)
            .to_json()
            .unwrap(),
        ..Default::default()
    }
}

#[derive(Default)]
pub struct FakeRooms {
    pub rooms: Mutex<Vec<Room>>,
    pub updates: Mutex<Vec<(String, String)>>,
    /// (room, payload, topic)
    pub sent: Mutex<Vec<(String, Vec<u8>, String)>>,
    pub fail_updates: bool,
}

impl FakeRooms {
    pub fn with_room(room: Room) -> Self {
        let fake = Self::default();
        fake.rooms.lock().unwrap().push(room);
        fake
    }

    pub fn last_status(&self) -> Option<RecordingStatus> {
        let updates = self.updates.lock().unwrap();
        let (_, metadata) = updates.last()?;
        RoomMetadata::parse(metadata).map(|m| m.recording_status)
    }
}

#[async_trait::async_trait]
impl RoomDirectory for FakeRooms {
    async fn get_room(&self, name: &str) -> ServiceResult<Option<Room>> {
        Ok(self
            .rooms
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.name == name)
            .cloned())
    }

    async fn create_room(&self, name: &str, metadata: &str) -> ServiceResult<Room> {
        let room = Room {
            sid: format!("RM_{}", name),
            name: name.to_string(),
            metadata: metadata.to_string(),
            ..Default::default()
        };
        self.rooms.lock().unwrap().push(room.clone());
        Ok(room)
    }

    async fn update_room_metadata(&self, name: &str, metadata: &str) -> ServiceResult<Room> {
        if self.fail_updates {
            return Err(unavailable());
        }
        self.updates
            .lock()
            .unwrap()
            .push((name.to_string(), metadata.to_string()));
        Ok(Room {
            name: name.to_string(),
            metadata: metadata.to_string(),
            ..Default::default()
        })
    }

    async fn send_data(&self, room: &str, payload: Vec<u8>, topic: &str) -> ServiceResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((room.to_string(), payload, topic.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeEgress {
    pub active: Mutex<Vec<EgressInfo>>,
    /// (room, filepath template)
    pub started: Mutex<Vec<(String, String)>>,
    pub fail_listing: bool,
}

#[async_trait::async_trait]
impl EgressController for FakeEgress {
    async fn start_room_composite(
        &self,
        room_name: &str,
        filepath: &str,
    ) -> ServiceResult<EgressInfo> {
        let egress = EgressInfo {
            egress_id: format!("EG_{}", room_name),
            room_name: room_name.to_string(),
            room_id: format!("RM_{}", room_name),
            status: EgressStatus::EgressStarting as i32,
            started_at: 1_700_000_000_000_000_000,
            ..Default::default()
        };
        self.started
            .lock()
            .unwrap()
            .push((room_name.to_string(), filepath.to_string()));
        self.active.lock().unwrap().push(egress.clone());
        Ok(egress)
    }

    async fn stop_egress(&self, egress_id: &str) -> ServiceResult<EgressInfo> {
        let mut active = self.active.lock().unwrap();
        let idx = active
            .iter()
            .position(|e| e.egress_id == egress_id)
            .ok_or_else(|| twirp_error(TwirpErrorCode::NOT_FOUND, "egress not found"))?;
        let mut egress = active.remove(idx);
        egress.status = EgressStatus::EgressEnding as i32;
        Ok(egress)
    }

    async fn list_active(&self, room_name: &str) -> ServiceResult<Vec<EgressInfo>> {
        if self.fail_listing {
            return Err(unavailable());
        }
        Ok(self
            .active
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.room_name == room_name)
            .cloned()
            .collect())
    }
}

/// In-memory [`ObjectStore`] that fails selected operations.
///
/// Seed it through [`FailingStore::inner`], which bypasses the injected
/// failures.
pub struct FailingStore {
    inner: OperatorStore,
    failing_deletes: Vec<String>,
    fail_lists: bool,
    fail_writes: bool,
    signer: Option<OperatorStore>,
    deletes: Mutex<Vec<String>>,
    writes: Mutex<Vec<String>>,
}

fn injected(op: &str, key: &str) -> StorageError {
    StorageError::Unavailable(format!("{} of {} failed: backend unreachable", op, key).into())
}

impl FailingStore {
    pub fn new() -> Self {
        Self {
            inner: OperatorStore::memory().unwrap(),
            failing_deletes: Vec::new(),
            fail_lists: false,
            fail_writes: false,
            signer: None,
            deletes: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_delete_of(mut self, key: &str) -> Self {
        self.failing_deletes.push(key.to_string());
        self
    }

    pub fn fail_lists(mut self) -> Self {
        self.fail_lists = true;
        self
    }

    pub fn fail_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Sign URLs with `signer`; the in-memory backend cannot presign
    pub fn signing_with(mut self, signer: OperatorStore) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn inner(&self) -> &OperatorStore {
        &self.inner
    }

    /// Keys passed to `delete_object`, failed or not, in call order
    pub fn attempted_deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn attempted_writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ObjectStore for FailingStore {
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        self.inner.exists(key).await
    }

    async fn head_object_size(&self, key: &str) -> Result<u64, StorageError> {
        self.inner.head_object_size(key).await
    }

    async fn get_object(
        &self,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<ObjectStream, StorageError> {
        self.inner.get_object(key, range).await
    }

    async fn get_bytes(&self, key: &str) -> Result<Bytes, StorageError> {
        self.inner.get_bytes(key).await
    }

    async fn put_json(&self, key: &str, body: Bytes) -> Result<(), StorageError> {
        self.writes.lock().unwrap().push(key.to_string());
        if self.fail_writes {
            return Err(injected("write", key));
        }
        self.inner.put_json(key, body).await
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        if self.fail_lists {
            return Err(injected("list", prefix));
        }
        self.inner.list_keys(prefix).await
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.deletes.lock().unwrap().push(key.to_string());
        if self.failing_deletes.iter().any(|k| k == key) {
            return Err(injected("delete", key));
        }
        self.inner.delete_object(key).await
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        self.signer.as_ref().unwrap_or(&self.inner).signed_url(key, ttl).await
    }

    fn supports_signed_urls(&self) -> bool {
        self.signer.as_ref().unwrap_or(&self.inner).supports_signed_urls()
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}
