//! Playback URL selection: proxy through this service or read directly from
//! the storage backend with a signed URL.

use crate::catalog::{CatalogError, RecordingCatalog};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default lifetime of signed playback URLs (24 hours)
pub const DEFAULT_URL_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStrategy {
    /// Stream through `GET /recordings/{name}`
    Proxy,
    /// Hand out a signed backend URL
    Direct { ttl: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown playback strategy {0:?} (expected PROXY, S3, AZURE or DIRECT)")]
pub struct UnknownStrategy(pub String);

impl FromStr for PlaybackStrategy {
    type Err = UnknownStrategy;

    /// `PROXY` selects proxying; `S3`, `AZURE` and `DIRECT` all select
    /// direct playback with the default TTL. Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PROXY" => Ok(PlaybackStrategy::Proxy),
            "S3" | "AZURE" | "DIRECT" => Ok(PlaybackStrategy::Direct {
                ttl: DEFAULT_URL_TTL,
            }),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for PlaybackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackStrategy::Proxy => f.write_str("PROXY"),
            PlaybackStrategy::Direct { ttl } => write!(f, "DIRECT (ttl {}s)", ttl.as_secs()),
        }
    }
}

impl PlaybackStrategy {
    pub fn with_ttl(self, ttl: Duration) -> Self {
        match self {
            PlaybackStrategy::Direct { .. } => PlaybackStrategy::Direct { ttl },
            proxy => proxy,
        }
    }

    pub fn requires_signed_urls(&self) -> bool {
        matches!(self, PlaybackStrategy::Direct { .. })
    }

    /// URL a client should use to play `name`.
    ///
    /// The caller is expected to have checked that the recording exists.
    pub async fn playback_url(
        &self,
        catalog: &RecordingCatalog,
        name: &str,
    ) -> Result<String, CatalogError> {
        match self {
            PlaybackStrategy::Proxy => {
                crate::catalog::validate_name(name)?;
                Ok(format!("/recordings/{}", name))
            }
            PlaybackStrategy::Direct { ttl } => catalog.signed_url(name, *ttl).await,
        }
    }
}
