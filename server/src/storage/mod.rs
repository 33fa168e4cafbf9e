//! Object storage abstraction for recordings and their sidecars.
//!
//! The catalog only talks to [`ObjectStore`]; concrete backends (S3, Azure
//! Blob, local filesystem, memory) are provided by [`operator::OperatorStore`].

pub mod operator;
pub mod sas;

pub use operator::{OperatorStore, StorageConfig, create_operator};

use bytes::Bytes;
use futures::stream::BoxStream;
use std::time::Duration;
use thiserror::Error;

/// Error type for object storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("Operation not supported by the {0} backend")]
    Unsupported(&'static str),
}

/// Body of an object read, chunk by chunk
pub type ObjectStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Inclusive byte window within an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of bytes covered by the window
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// Trait for reading and writing recording objects
///
/// Keys are full object paths relative to the backend root
/// (e.g. `recordings/.metadata/RoomA-RM_1-2024.json`).
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Check whether an object exists
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Size of an object in bytes
    ///
    /// Returns `StorageError::NotFound` if the object does not exist.
    async fn head_object_size(&self, key: &str) -> Result<u64, StorageError>;

    /// Stream an object, or the given inclusive byte window of it
    async fn get_object(
        &self,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<ObjectStream, StorageError>;

    /// Read a small object fully into memory
    async fn get_bytes(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Store a JSON document, replacing any existing object
    async fn put_json(&self, key: &str, body: Bytes) -> Result<(), StorageError>;

    /// List the keys of every object under `prefix`
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Delete an object; deleting a missing object is not an error
    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;

    /// Time-limited URL that reads the object directly from the backend
    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError>;

    /// Whether [`ObjectStore::signed_url`] can succeed on this backend
    fn supports_signed_urls(&self) -> bool;

    /// Short backend name for logs ("s3", "azblob", "fs", "memory")
    fn backend_name(&self) -> &'static str;
}
