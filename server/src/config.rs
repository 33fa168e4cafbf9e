//! Process configuration.
//!
//! Every setting is a CLI flag backed by an environment variable (`.env`
//! is loaded first by `main`), parsed with clap and then resolved into an
//! [`AppConfig`].

use crate::catalog::{DEFAULT_CHUNK_SIZE, DEFAULT_LIST_CONCURRENCY};
use crate::playback::{DEFAULT_URL_TTL, PlaybackStrategy};
use crate::storage::StorageConfig;
use clap::{Parser, ValueEnum};
use recording_catalog_proto::sidecar::DEFAULT_RECORDINGS_PREFIX;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required variable {0}")]
    Missing(&'static str),
}

/// LiveKit recording catalog
#[derive(Parser, Debug, Clone)]
#[command(name = "recording-catalog")]
#[command(about = "Lists, streams, records and deletes LiveKit room recordings")]
pub struct Args {
    /// Port the HTTP server listens on
    #[arg(long, env = "SERVER_PORT", default_value = "6080")]
    pub server_port: u16,

    /// `createdBy` value marking rooms managed by this service
    #[arg(long, env = "APP_NAME", default_value = "recording-catalog")]
    pub app_name: String,

    #[command(flatten)]
    pub livekit: LiveKitArgs,

    #[command(flatten)]
    pub storage: StorageArgs,

    /// Key prefix of recordings in the bucket; empty stores them at the root
    #[arg(long, env = "RECORDINGS_PATH", default_value = DEFAULT_RECORDINGS_PREFIX)]
    pub recordings_path: String,

    /// PROXY streams through this service; S3, AZURE or DIRECT hand out signed URLs
    #[arg(long, env = "RECORDING_PLAYBACK_STRATEGY", default_value = "S3")]
    pub playback_strategy: PlaybackStrategy,

    /// Lifetime of signed playback URLs in seconds
    #[arg(long, env = "RECORDING_URL_TTL_SECS", default_value_t = DEFAULT_URL_TTL.as_secs())]
    pub url_ttl_secs: u64,

    /// Bytes served for open-ended range requests
    #[arg(
        long,
        env = "RECORDING_FILE_PORTION_SIZE",
        default_value_t = DEFAULT_CHUNK_SIZE,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub file_portion_size: u64,

    /// Sidecars fetched concurrently while listing
    #[arg(
        long,
        env = "RECORDING_LIST_CONCURRENCY",
        default_value_t = DEFAULT_LIST_CONCURRENCY,
        value_parser = positive
    )]
    pub list_concurrency: usize,
}

/// LiveKit server API access
#[derive(Parser, Debug, Clone)]
pub struct LiveKitArgs {
    /// LiveKit server URL (ws, wss, http or https)
    #[arg(long, env = "LIVEKIT_URL", default_value = "http://localhost:7880")]
    pub livekit_url: String,

    #[arg(long, env = "LIVEKIT_API_KEY", default_value = "devkey")]
    pub livekit_api_key: String,

    #[arg(
        long,
        env = "LIVEKIT_API_SECRET",
        default_value = "secret",
        hide_env_values = true
    )]
    pub livekit_api_secret: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    S3,
    #[value(alias = "azblob")]
    Azure,
    Fs,
    Memory,
}

/// Object storage backend and credentials
#[derive(Parser, Debug, Clone)]
pub struct StorageArgs {
    #[arg(
        long = "storage-backend",
        env = "STORAGE_BACKEND",
        value_enum,
        ignore_case = true,
        default_value = "s3"
    )]
    pub backend: Backend,

    #[arg(long, env = "S3_BUCKET", default_value = "openvidu")]
    pub s3_bucket: String,

    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    pub aws_region: String,

    #[arg(long, env = "S3_ENDPOINT", default_value = "http://localhost:9000")]
    pub s3_endpoint: String,

    #[arg(long, env = "S3_ACCESS_KEY", default_value = "minioadmin")]
    pub s3_access_key: String,

    #[arg(
        long,
        env = "S3_SECRET_KEY",
        default_value = "minioadmin",
        hide_env_values = true
    )]
    pub s3_secret_key: String,

    #[arg(long, env = "AZURE_ACCOUNT_NAME")]
    pub azure_account_name: Option<String>,

    #[arg(long, env = "AZURE_ACCOUNT_KEY", hide_env_values = true)]
    pub azure_account_key: Option<String>,

    #[arg(long, env = "AZURE_CONTAINER_NAME", default_value = "openvidu-appdata")]
    pub azure_container_name: String,

    /// Defaults to `https://<account>.blob.core.windows.net`
    #[arg(long, env = "AZURE_ENDPOINT")]
    pub azure_endpoint: Option<String>,

    /// Root directory of the `fs` backend
    #[arg(long, env = "STORAGE_DIR", default_value = "./recordings-storage")]
    pub storage_dir: String,
}

fn positive(value: &str) -> Result<usize, String> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err("must be positive".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Treats empty values like unset ones
fn required(value: &Option<String>, var: &'static str) -> Result<String, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::Missing(var))
}

impl StorageArgs {
    pub fn resolve(&self) -> Result<StorageConfig, ConfigError> {
        Ok(match self.backend {
            Backend::S3 => StorageConfig::S3 {
                bucket: self.s3_bucket.clone(),
                region: self.aws_region.clone(),
                endpoint: Some(self.s3_endpoint.clone()),
                access_key_id: Some(self.s3_access_key.clone()),
                secret_access_key: Some(self.s3_secret_key.clone()),
            },
            Backend::Azure => {
                let account_name = required(&self.azure_account_name, "AZURE_ACCOUNT_NAME")?;
                let account_key = required(&self.azure_account_key, "AZURE_ACCOUNT_KEY")?;
                let endpoint = self
                    .azure_endpoint
                    .clone()
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| format!("https://{}.blob.core.windows.net", account_name));
                StorageConfig::Azblob {
                    container: self.azure_container_name.clone(),
                    endpoint,
                    account_name,
                    account_key,
                }
            }
            Backend::Fs => StorageConfig::Fs {
                root: self.storage_dir.clone(),
            },
            Backend::Memory => StorageConfig::Memory,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub server_port: u16,
    pub app_name: String,
    pub livekit_url: String,
    pub livekit_api_key: String,
    pub livekit_api_secret: String,
    pub storage: StorageConfig,
    pub recordings_prefix: String,
    pub playback: PlaybackStrategy,
    pub chunk_size: u64,
    pub list_concurrency: usize,
}

impl AppConfig {
    /// Parse flags and environment; exits with usage on invalid values
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        Ok(Self {
            storage: args.storage.resolve()?,
            server_port: args.server_port,
            app_name: args.app_name,
            livekit_url: args.livekit.livekit_url,
            livekit_api_key: args.livekit.livekit_api_key,
            livekit_api_secret: args.livekit.livekit_api_secret,
            recordings_prefix: args.recordings_path,
            playback: args
                .playback_strategy
                .with_ttl(Duration::from_secs(args.url_ttl_secs)),
            chunk_size: args.file_portion_size,
            list_concurrency: args.list_concurrency,
        })
    }
}
