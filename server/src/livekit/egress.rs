use super::ServiceResult;
use livekit_api::services::egress::{
    EgressClient, EgressListFilter, EgressListOptions, EgressOutput, RoomCompositeOptions,
};
use recording_catalog_proto::proto;
use tracing::info;

/// Egress operations used to start and stop room recordings
#[async_trait::async_trait]
pub trait EgressController: Send + Sync {
    /// Record every participant of `room_name` into a single MP4 at
    /// `filepath` (a LiveKit filename template)
    async fn start_room_composite(
        &self,
        room_name: &str,
        filepath: &str,
    ) -> ServiceResult<proto::EgressInfo>;

    async fn stop_egress(&self, egress_id: &str) -> ServiceResult<proto::EgressInfo>;

    /// Egresses of the room that have not ended yet
    async fn list_active(&self, room_name: &str) -> ServiceResult<Vec<proto::EgressInfo>>;
}

/// MP4 file output without a manifest
fn mp4_output(filepath: &str) -> EgressOutput {
    EgressOutput::File(proto::EncodedFileOutput {
        file_type: proto::EncodedFileType::Mp4 as i32,
        filepath: filepath.to_string(),
        disable_manifest: true,
        ..Default::default()
    })
}

#[async_trait::async_trait]
impl EgressController for EgressClient {
    async fn start_room_composite(
        &self,
        room_name: &str,
        filepath: &str,
    ) -> ServiceResult<proto::EgressInfo> {
        let egress = self
            .start_room_composite_egress(
                room_name,
                vec![mp4_output(filepath)],
                RoomCompositeOptions::default(),
            )
            .await?;
        info!("🎬 Started egress {} for room {}", egress.egress_id, room_name);
        Ok(egress)
    }

    async fn stop_egress(&self, egress_id: &str) -> ServiceResult<proto::EgressInfo> {
        let egress = EgressClient::stop_egress(self, egress_id).await?;
        info!("⏹️ Stopping egress {} ({})", egress_id, egress.status().as_str_name());
        Ok(egress)
    }

    async fn list_active(&self, room_name: &str) -> ServiceResult<Vec<proto::EgressInfo>> {
        self.list_egress(EgressListOptions {
            filter: EgressListFilter::Room(room_name.to_string()),
            active: true,
        })
        .await
    }
}
