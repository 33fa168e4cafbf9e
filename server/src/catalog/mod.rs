//! Recording catalog over an [`ObjectStore`].
//!
//! Recordings are discovered through their JSON sidecars; media objects are
//! only touched for size lookups, ranged reads and deletion.

pub mod range;

use crate::storage::{ByteRange, ObjectStore, ObjectStream, StorageError};
use futures::{StreamExt, TryStreamExt, stream};
use recording_catalog_proto::sidecar;
use recording_catalog_proto::{KeyLayout, RecordFilter, RecordingRecord, SidecarError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default playback window for requests without an explicit end (5 MiB)
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// Default number of sidecars fetched concurrently while listing
pub const DEFAULT_LIST_CONCURRENCY: usize = 16;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Invalid recording name: {0:?}")]
    InvalidName(String),

    #[error("Recording not found: {0}")]
    NotFound(String),

    #[error("Requested range not satisfiable (object size {size})")]
    RangeNotSatisfiable { size: u64 },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Sidecar(#[from] SidecarError),
}

impl From<range::Unsatisfiable> for CatalogError {
    fn from(e: range::Unsatisfiable) -> Self {
        CatalogError::RangeNotSatisfiable { size: e.size }
    }
}

/// A window of a recording ready to be sent to a client
pub struct RecordingStream {
    pub body: ObjectStream,
    /// Total size of the media object
    pub size: u64,
    /// Served window; `None` for empty objects
    pub range: Option<ByteRange>,
}

impl std::fmt::Debug for RecordingStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingStream")
            .field("size", &self.size)
            .field("range", &self.range)
            .finish()
    }
}

/// Reject names that could escape the recordings prefix
pub fn validate_name(name: &str) -> Result<(), CatalogError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(CatalogError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct RecordingCatalog {
    store: Arc<dyn ObjectStore>,
    layout: KeyLayout,
    chunk_size: u64,
    list_concurrency: usize,
}

impl std::fmt::Debug for RecordingCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingCatalog")
            .field("store", &self.store.backend_name())
            .field("layout", &self.layout)
            .field("chunk_size", &self.chunk_size)
            .field("list_concurrency", &self.list_concurrency)
            .finish()
    }
}

impl RecordingCatalog {
    pub fn new(store: Arc<dyn ObjectStore>, layout: KeyLayout) -> Self {
        Self {
            store,
            layout,
            chunk_size: DEFAULT_CHUNK_SIZE,
            list_concurrency: DEFAULT_LIST_CONCURRENCY,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_list_concurrency(mut self, list_concurrency: usize) -> Self {
        self.list_concurrency = list_concurrency.max(1);
        self
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    /// List recordings matching `filter`, newest first.
    ///
    /// Sidecars that disappear between listing and fetching, or that do not
    /// decode, are skipped. Any other storage failure fails the listing.
    pub async fn list(&self, filter: &RecordFilter) -> Result<Vec<RecordingRecord>, CatalogError> {
        let metadata_dir = self.layout.metadata_dir();
        let keys: Vec<String> = self
            .store
            .list_keys(&metadata_dir)
            .await?
            .into_iter()
            .filter(|key| self.layout.matches_sidecar(key, filter))
            .collect();

        debug!("Fetching {} sidecars for {:?}", keys.len(), filter);

        let fetched: Vec<Option<RecordingRecord>> = stream::iter(keys)
            .map(|key| async move { self.read_sidecar(&key).await })
            .buffered(self.list_concurrency)
            .try_collect()
            .await?;

        let mut records: Vec<RecordingRecord> = fetched
            .into_iter()
            .flatten()
            .filter(|record| filter.accepts(record))
            .collect();

        // Stable: records sharing a start time keep listing order
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(records)
    }

    async fn read_sidecar(&self, key: &str) -> Result<Option<RecordingRecord>, CatalogError> {
        let data = match self.store.get_bytes(key).await {
            Ok(data) => data,
            Err(StorageError::NotFound(_)) => {
                warn!("Sidecar {} vanished while listing, skipping", key);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        match sidecar::decode(&data) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Skipping invalid sidecar {}: {}", key, e);
                Ok(None)
            }
        }
    }

    /// Whether the media object for `name` exists
    pub async fn exists(&self, name: &str) -> Result<bool, CatalogError> {
        validate_name(name)?;
        Ok(self.store.exists(&self.layout.media_key(name)).await?)
    }

    /// The sidecar record for `name`, if one is stored and readable
    pub async fn metadata(&self, name: &str) -> Result<Option<RecordingRecord>, CatalogError> {
        validate_name(name)?;
        self.read_sidecar(&self.layout.sidecar_key(name)).await
    }

    /// Persist the sidecar for a finished recording
    pub async fn save_sidecar(&self, record: &RecordingRecord) -> Result<(), CatalogError> {
        validate_name(&record.name)?;
        let key = self.layout.sidecar_key(&record.name);
        let body = sidecar::encode(record)?;
        self.store.put_json(&key, body.into()).await?;
        info!("💾 Saved sidecar {} for egress {}", key, record.id);
        Ok(())
    }

    /// Open a window of the recording for playback
    pub async fn stream_range(
        &self,
        name: &str,
        range_header: Option<&str>,
    ) -> Result<RecordingStream, CatalogError> {
        validate_name(name)?;
        let key = self.layout.media_key(name);

        let size = match self.store.head_object_size(&key).await {
            Ok(size) => size,
            Err(StorageError::NotFound(_)) => return Err(CatalogError::NotFound(name.to_string())),
            Err(e) => return Err(e.into()),
        };

        let spec = range_header.and_then(range::parse_range_header);
        let window = range::resolve_window(spec, size, self.chunk_size)?;

        let body = match window {
            Some(window) => self.store.get_object(&key, Some(window)).await?,
            None => stream::empty().boxed(),
        };

        debug!("Serving {} window {:?} of {} bytes", name, window, size);
        Ok(RecordingStream {
            body,
            size,
            range: window,
        })
    }

    /// Signed URL for direct playback from the backend
    pub async fn signed_url(&self, name: &str, ttl: Duration) -> Result<String, CatalogError> {
        validate_name(name)?;
        Ok(self.store.signed_url(&self.layout.media_key(name), ttl).await?)
    }

    /// Delete a recording's media object and sidecar.
    ///
    /// Returns the sidecar record read before deletion, when there was one.
    /// Both deletions are always attempted; the first failure is returned.
    pub async fn delete(&self, name: &str) -> Result<Option<RecordingRecord>, CatalogError> {
        if !self.exists(name).await? {
            return Err(CatalogError::NotFound(name.to_string()));
        }

        let record = match self.metadata(name).await {
            Ok(record) => record,
            Err(e) => {
                warn!("Could not read sidecar for {} before deleting: {}", name, e);
                None
            }
        };

        let media_key = self.layout.media_key(name);
        let sidecar_key = self.layout.sidecar_key(name);
        let (media, sidecar) = futures::join!(
            self.store.delete_object(&media_key),
            self.store.delete_object(&sidecar_key)
        );
        media?;
        sidecar?;

        info!("🗑️ Deleted recording {}", name);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::OperatorStore;
    use crate::testing::FailingStore;
    use bytes::Bytes;

    fn record(name: &str, room_name: &str, room_id: &str, started_at: i64) -> RecordingRecord {
        RecordingRecord {
            id: format!("EG_{}", started_at),
            name: name.to_string(),
            room_name: room_name.to_string(),
            room_id: room_id.to_string(),
            started_at,
            duration: Some(1.0),
            size: Some(10),
        }
    }

    fn create_test_catalog() -> RecordingCatalog {
        let store = OperatorStore::memory().unwrap();
        RecordingCatalog::new(Arc::new(store), KeyLayout::default())
    }

    async fn add_recording(catalog: &RecordingCatalog, record: &RecordingRecord, media: &[u8]) {
        catalog
            .store()
            .put_json(
                &catalog.layout().media_key(&record.name),
                Bytes::copy_from_slice(media),
            )
            .await
            .unwrap();
        catalog.save_sidecar(record).await.unwrap();
    }

    async fn collect(stream: ObjectStream) -> Vec<u8> {
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        chunks.concat()
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("RoomA-RM_1-2024.mp4").is_ok());
        for bad in ["", "a/b.mp4", "..", "a..b", "..\\x", "c\\d"] {
            assert!(
                matches!(validate_name(bad), Err(CatalogError::InvalidName(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let catalog = create_test_catalog();
        add_recording(&catalog, &record("RoomA-id1-a.mp4", "RoomA", "id1", 1000), b"a").await;
        add_recording(&catalog, &record("RoomA-id2-b.mp4", "RoomA", "id2", 2000), b"b").await;
        add_recording(&catalog, &record("RoomB-id3-c.mp4", "RoomB", "id3", 3000), b"c").await;

        let room_a = catalog.list(&RecordFilter::by_room("RoomA")).await.unwrap();
        let ids: Vec<&str> = room_a.iter().map(|r| r.room_id.as_str()).collect();
        assert_eq!(ids, vec!["id2", "id1"]);

        let only_id1 = catalog
            .list(&RecordFilter::new(Some("RoomA".into()), Some("id1".into())))
            .await
            .unwrap();
        assert_eq!(only_id1.len(), 1);
        assert_eq!(only_id1[0].room_id, "id1");

        let all = catalog.list(&RecordFilter::default()).await.unwrap();
        let started: Vec<i64> = all.iter().map(|r| r.started_at).collect();
        assert_eq!(started, vec![3000, 2000, 1000]);
    }

    #[tokio::test]
    async fn test_list_skips_invalid_sidecars() {
        let catalog = create_test_catalog();
        add_recording(&catalog, &record("RoomA-id1-a.mp4", "RoomA", "id1", 1000), b"a").await;
        catalog
            .store()
            .put_json(
                "recordings/.metadata/RoomA-id9-broken.json",
                Bytes::from_static(b"{not json"),
            )
            .await
            .unwrap();

        let records = catalog.list(&RecordFilter::by_room("RoomA")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].room_id, "id1");
    }

    #[tokio::test]
    async fn test_list_uses_exact_room_match() {
        let catalog = create_test_catalog();
        // Key prefix "RoomA-" also matches room "RoomA-B"
        add_recording(&catalog, &record("RoomA-B-id1-a.mp4", "RoomA-B", "id1", 1000), b"a").await;
        add_recording(&catalog, &record("RoomA-id2-b.mp4", "RoomA", "id2", 2000), b"b").await;

        let records = catalog.list(&RecordFilter::by_room("RoomA")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].room_name, "RoomA");
    }

    #[tokio::test]
    async fn test_list_with_bounded_concurrency() {
        let catalog = create_test_catalog().with_list_concurrency(2);
        for i in 0..10 {
            let name = format!("RoomA-id{}-x.mp4", i);
            add_recording(&catalog, &record(&name, "RoomA", &format!("id{}", i), i), b"x").await;
        }
        let records = catalog.list(&RecordFilter::default()).await.unwrap();
        assert_eq!(records.len(), 10);
        assert_eq!(records[0].started_at, 9);
        assert_eq!(records[9].started_at, 0);
    }

    #[tokio::test]
    async fn test_stream_range_windows() {
        let catalog = create_test_catalog().with_chunk_size(64);
        let media: Vec<u8> = (0..=255u8).collect();
        add_recording(&catalog, &record("RoomA-id1-a.mp4", "RoomA", "id1", 1), &media).await;

        let default = catalog.stream_range("RoomA-id1-a.mp4", None).await.unwrap();
        assert_eq!(default.size, 256);
        assert_eq!(default.range, Some(ByteRange::new(0, 63)));
        assert_eq!(collect(default.body).await, media[0..64].to_vec());

        let explicit = catalog
            .stream_range("RoomA-id1-a.mp4", Some("bytes=100-200"))
            .await
            .unwrap();
        assert_eq!(explicit.range, Some(ByteRange::new(100, 200)));
        assert_eq!(collect(explicit.body).await, media[100..=200].to_vec());

        let clamped = catalog
            .stream_range("RoomA-id1-a.mp4", Some("bytes=200-999"))
            .await
            .unwrap();
        assert_eq!(clamped.range, Some(ByteRange::new(200, 255)));
    }

    #[tokio::test]
    async fn test_stream_range_errors() {
        let catalog = create_test_catalog();
        add_recording(&catalog, &record("RoomA-id1-a.mp4", "RoomA", "id1", 1), b"0123456789").await;

        assert!(matches!(
            catalog.stream_range("RoomA-id1-a.mp4", Some("bytes=10-")).await,
            Err(CatalogError::RangeNotSatisfiable { size: 10 })
        ));
        assert!(matches!(
            catalog.stream_range("missing.mp4", None).await,
            Err(CatalogError::NotFound(_))
        ));
        assert!(matches!(
            catalog.stream_range("../secret", None).await,
            Err(CatalogError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn test_stream_empty_recording() {
        let catalog = create_test_catalog();
        add_recording(&catalog, &record("empty.mp4", "RoomA", "id1", 1), b"").await;

        let stream = catalog.stream_range("empty.mp4", None).await.unwrap();
        assert_eq!(stream.size, 0);
        assert_eq!(stream.range, None);
        assert!(collect(stream.body).await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_both_objects() {
        let catalog = create_test_catalog();
        let rec = record("RoomA-id1-a.mp4", "RoomA", "id1", 1);
        add_recording(&catalog, &rec, b"media").await;

        let deleted = catalog.delete(&rec.name).await.unwrap();
        assert_eq!(deleted, Some(rec.clone()));

        assert!(!catalog.exists(&rec.name).await.unwrap());
        assert!(!catalog
            .store()
            .exists(&catalog.layout().sidecar_key(&rec.name))
            .await
            .unwrap());
        assert!(catalog.list(&RecordFilter::default()).await.unwrap().is_empty());

        assert!(matches!(
            catalog.delete(&rec.name).await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_without_sidecar() {
        let catalog = create_test_catalog();
        catalog
            .store()
            .put_json("recordings/orphan.mp4", Bytes::from_static(b"media"))
            .await
            .unwrap();

        assert_eq!(catalog.delete("orphan.mp4").await.unwrap(), None);
        assert!(!catalog.exists("orphan.mp4").await.unwrap());
    }

    /// Catalog over a [`FailingStore`], seeded with one recording
    async fn failing_catalog(
        store: FailingStore,
        rec: &RecordingRecord,
    ) -> (RecordingCatalog, Arc<FailingStore>) {
        let seed = RecordingCatalog::new(Arc::new(store.inner().clone()), KeyLayout::default());
        add_recording(&seed, rec, b"media").await;

        let store = Arc::new(store);
        (RecordingCatalog::new(store.clone(), KeyLayout::default()), store)
    }

    #[tokio::test]
    async fn test_delete_attempts_both_objects_and_reports_first_failure() {
        let rec = record("RoomA-id1-a.mp4", "RoomA", "id1", 1);
        let media_key = "recordings/RoomA-id1-a.mp4";
        let sidecar_key = "recordings/.metadata/RoomA-id1-a.json";
        let store = FailingStore::new()
            .fail_delete_of(media_key)
            .fail_delete_of(sidecar_key);
        let (catalog, store) = failing_catalog(store, &rec).await;

        match catalog.delete(&rec.name).await {
            Err(CatalogError::Storage(StorageError::Unavailable(e))) => {
                assert!(e.to_string().contains(media_key))
            }
            other => panic!("expected the media deletion failure, got {:?}", other),
        }

        let mut attempted = store.attempted_deletes();
        attempted.sort();
        assert_eq!(attempted, vec![sidecar_key, media_key]);
    }

    #[tokio::test]
    async fn test_delete_reports_sidecar_failure_after_removing_media() {
        let rec = record("RoomA-id1-a.mp4", "RoomA", "id1", 1);
        let sidecar_key = "recordings/.metadata/RoomA-id1-a.json";
        let store = FailingStore::new().fail_delete_of(sidecar_key);
        let (catalog, store) = failing_catalog(store, &rec).await;

        assert!(matches!(
            catalog.delete(&rec.name).await,
            Err(CatalogError::Storage(StorageError::Unavailable(_)))
        ));
        assert_eq!(store.attempted_deletes().len(), 2);
        assert!(!catalog.exists(&rec.name).await.unwrap());
        assert!(store.inner().exists(sidecar_key).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_propagates_storage_failure() {
        let rec = record("RoomA-id1-a.mp4", "RoomA", "id1", 1);
        let (catalog, _) = failing_catalog(FailingStore::new().fail_lists(), &rec).await;

        assert!(matches!(
            catalog.list(&RecordFilter::default()).await,
            Err(CatalogError::Storage(StorageError::Unavailable(_)))
        ));
    }
}
