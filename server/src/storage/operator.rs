use super::sas::BlobSas;
use super::{ByteRange, ObjectStore, ObjectStream, StorageError};
use anyhow::Context;
use bytes::Bytes;
use futures::StreamExt;
use opendal::{ErrorKind, Operator, services};
use std::time::Duration;
use tracing::{debug, info};

/// Backend selection and credentials for [`create_operator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    S3 {
        bucket: String,
        region: String,
        endpoint: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
    },
    Azblob {
        container: String,
        endpoint: String,
        account_name: String,
        account_key: String,
    },
    Fs {
        root: String,
    },
    Memory,
}

impl StorageConfig {
    pub fn backend_name(&self) -> &'static str {
        match self {
            StorageConfig::S3 { .. } => "s3",
            StorageConfig::Azblob { .. } => "azblob",
            StorageConfig::Fs { .. } => "fs",
            StorageConfig::Memory => "memory",
        }
    }
}

/// Create an opendal operator for the configured backend
pub fn create_operator(config: &StorageConfig) -> anyhow::Result<Operator> {
    match config {
        StorageConfig::S3 {
            bucket,
            region,
            endpoint,
            access_key_id,
            secret_access_key,
        } => {
            info!("Configuring S3 storage with bucket: {}, region: {}", bucket, region);

            let mut builder = services::S3::default().bucket(bucket).region(region);

            if let Some(endpoint) = endpoint {
                builder = builder.endpoint(endpoint);
                debug!("S3 endpoint set to: {}", endpoint);
            }

            if let Some(access_key_id) = access_key_id {
                builder = builder.access_key_id(access_key_id);
                debug!("S3 access key configured");
            }

            if let Some(secret_access_key) = secret_access_key {
                builder = builder.secret_access_key(secret_access_key);
                debug!("S3 secret key configured");
            }

            Ok(Operator::new(builder)?.finish())
        }
        StorageConfig::Azblob {
            container,
            endpoint,
            account_name,
            account_key,
        } => {
            info!(
                "Configuring Azure Blob storage with container: {}, account: {}",
                container, account_name
            );

            let builder = services::Azblob::default()
                .container(container)
                .endpoint(endpoint)
                .account_name(account_name)
                .account_key(account_key);

            Ok(Operator::new(builder)?.finish())
        }
        StorageConfig::Fs { root } => {
            info!("Configuring filesystem storage with root: {}", root);
            let builder = services::Fs::default().root(root);
            Ok(Operator::new(builder)?.finish())
        }
        StorageConfig::Memory => {
            info!("Configuring in-memory storage");
            Ok(Operator::new(services::Memory::default())?.finish())
        }
    }
}

/// [`ObjectStore`] over any opendal operator
#[derive(Clone)]
pub struct OperatorStore {
    op: Operator,
    backend: &'static str,
    /// Azure read URLs; other backends presign through opendal
    sas: Option<BlobSas>,
}

impl std::fmt::Debug for OperatorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorStore")
            .field("backend", &self.backend)
            .field("sas", &self.sas)
            .finish()
    }
}

impl OperatorStore {
    pub fn new(op: Operator, backend: &'static str) -> Self {
        Self {
            op,
            backend,
            sas: None,
        }
    }

    pub fn from_config(config: &StorageConfig) -> anyhow::Result<Self> {
        let mut store = Self::new(create_operator(config)?, config.backend_name());

        if let StorageConfig::Azblob {
            container,
            endpoint,
            account_name,
            account_key,
        } = config
        {
            let sas = BlobSas::new(account_name, account_key, container, endpoint)
                .context("cannot sign Azure Blob URLs")?;
            store.sas = Some(sas);
        }

        Ok(store)
    }

    /// In-memory store, used by tests and the `memory` backend
    pub fn memory() -> anyhow::Result<Self> {
        Self::from_config(&StorageConfig::Memory)
    }
}

fn map_err(key: &str, err: opendal::Error) -> StorageError {
    match err.kind() {
        ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
        _ => StorageError::Unavailable(Box::new(err)),
    }
}

#[async_trait::async_trait]
impl ObjectStore for OperatorStore {
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        self.op.exists(key).await.map_err(|e| map_err(key, e))
    }

    async fn head_object_size(&self, key: &str) -> Result<u64, StorageError> {
        let meta = self.op.stat(key).await.map_err(|e| map_err(key, e))?;
        Ok(meta.content_length())
    }

    async fn get_object(
        &self,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<ObjectStream, StorageError> {
        debug!("Reading {} from {} (range: {:?})", key, self.backend, range);

        let reader = self.op.reader(key).await.map_err(|e| map_err(key, e))?;
        let stream = match range {
            Some(range) => reader.into_bytes_stream(range.start..=range.end).await,
            None => reader.into_bytes_stream(..).await,
        }
        .map_err(|e| map_err(key, e))?;

        Ok(stream.boxed())
    }

    async fn get_bytes(&self, key: &str) -> Result<Bytes, StorageError> {
        let buffer = self.op.read(key).await.map_err(|e| map_err(key, e))?;
        Ok(buffer.to_bytes())
    }

    async fn put_json(&self, key: &str, body: Bytes) -> Result<(), StorageError> {
        debug!("Writing {} bytes to {} on {}", body.len(), key, self.backend);
        self.op
            .write_with(key, body)
            .content_type("application/json")
            .await
            .map_err(|e| map_err(key, e))?;
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let entries = match self.op.list_with(prefix).recursive(true).await {
            Ok(entries) => entries,
            // Nothing has been written under the prefix yet
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(map_err(prefix, e)),
        };

        let keys: Vec<String> = entries
            .into_iter()
            .filter(|entry| entry.metadata().is_file())
            .map(|entry| entry.path().to_string())
            .collect();

        debug!("Listed {} keys under {} on {}", keys.len(), prefix, self.backend);
        Ok(keys)
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        debug!("Deleting {} from {}", key, self.backend);
        self.op.delete(key).await.map_err(|e| map_err(key, e))
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        if let Some(sas) = &self.sas {
            return sas
                .read_url(key, ttl)
                .map_err(|e| StorageError::Unavailable(Box::new(e)));
        }
        if !self.supports_signed_urls() {
            return Err(StorageError::Unsupported(self.backend));
        }

        let request = self
            .op
            .presign_read(key, ttl)
            .await
            .map_err(|e| map_err(key, e))?;
        Ok(request.uri().to_string())
    }

    fn supports_signed_urls(&self) -> bool {
        self.sas.is_some() || self.op.info().full_capability().presign_read
    }

    fn backend_name(&self) -> &'static str {
        self.backend
    }
}
