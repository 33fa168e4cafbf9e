pub mod catalog;
pub mod config;
pub mod error;
pub mod livekit;
pub mod playback;
pub mod server;
pub mod storage;
pub mod webhook;

// Re-export commonly used types
pub use catalog::RecordingCatalog;
pub use config::AppConfig;
pub use error::AppError;
pub use livekit::{EgressController, RoomDirectory};
pub use playback::PlaybackStrategy;
pub use storage::{ObjectStore, OperatorStore};
pub use webhook::EgressWebhookBridge;

use anyhow::Context;
use livekit::WebhookReceiver;
use livekit::room::LiveKitRooms;
use livekit_api::services::egress::EgressClient;
use livekit_api::services::room::RoomClient;
use recording_catalog_proto::KeyLayout;
use std::sync::Arc;
use tracing::info;

pub type AppState = Arc<CatalogState>;

pub struct CatalogState {
    /// Value of `createdBy` in the metadata of rooms this service manages
    pub app_name: String,
    pub catalog: RecordingCatalog,
    pub playback: PlaybackStrategy,
    pub rooms: Arc<dyn RoomDirectory>,
    pub egress: Arc<dyn EgressController>,
    pub webhooks: WebhookReceiver,
    pub bridge: EgressWebhookBridge,
}

impl std::fmt::Debug for CatalogState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogState")
            .field("app_name", &self.app_name)
            .field("catalog", &self.catalog)
            .field("playback", &self.playback)
            .field("rooms", &"<dyn RoomDirectory>")
            .field("egress", &"<dyn EgressController>")
            .field("webhooks", &self.webhooks)
            .finish()
    }
}

impl CatalogState {
    pub fn new(
        app_name: impl Into<String>,
        catalog: RecordingCatalog,
        playback: PlaybackStrategy,
        rooms: Arc<dyn RoomDirectory>,
        egress: Arc<dyn EgressController>,
        webhooks: WebhookReceiver,
    ) -> Self {
        let app_name = app_name.into();
        let bridge = EgressWebhookBridge::new(app_name.clone(), rooms.clone(), catalog.clone());
        Self {
            app_name,
            catalog,
            playback,
            rooms,
            egress,
            webhooks,
            bridge,
        }
    }

    /// Build every dependency from configuration.
    ///
    /// Fails when the playback strategy needs signed URLs the configured
    /// backend cannot produce.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let store = OperatorStore::from_config(&config.storage)
            .context("failed to configure object storage")?;

        if config.playback.requires_signed_urls() && !store.supports_signed_urls() {
            anyhow::bail!(
                "playback strategy {} needs signed URLs, which the {} backend cannot produce; \
                 set RECORDING_PLAYBACK_STRATEGY=PROXY",
                config.playback,
                store.backend_name()
            );
        }

        let layout = KeyLayout::new(&config.recordings_prefix);
        info!(
            "Recordings under {:?} on {} (playback: {})",
            layout.recordings_prefix(),
            store.backend_name(),
            config.playback
        );

        let catalog = RecordingCatalog::new(Arc::new(store), layout)
            .with_chunk_size(config.chunk_size)
            .with_list_concurrency(config.list_concurrency);

        let host = livekit::http_base_url(&config.livekit_url)
            .with_context(|| format!("invalid LIVEKIT_URL {:?}", config.livekit_url))?;
        let (key, secret) = (&config.livekit_api_key, &config.livekit_api_secret);
        info!("LiveKit server API at {}", host);

        Ok(Self::new(
            config.app_name.clone(),
            catalog,
            config.playback,
            Arc::new(LiveKitRooms::new(RoomClient::with_api_key(&host, key, secret))),
            Arc::new(EgressClient::with_api_key(&host, key, secret)),
            WebhookReceiver::new(key, secret),
        ))
    }
}

#[cfg(test)]
pub(crate) mod testing;
