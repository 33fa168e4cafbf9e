use serde::{Deserialize, Serialize};

/// Catalog entry for a finished recording, persisted as the JSON sidecar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingRecord {
    /// Egress identifier
    #[serde(default)]
    pub id: String,
    /// Media file name, relative to the recordings prefix
    pub name: String,
    #[serde(default)]
    pub room_name: String,
    #[serde(default)]
    pub room_id: String,
    /// Epoch milliseconds
    #[serde(deserialize_with = "crate::wire::lenient_i64")]
    pub started_at: i64,
    /// Seconds, present once the recording is complete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Bytes, present once the recording is complete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl RecordingRecord {
    pub fn is_complete(&self) -> bool {
        self.duration.is_some() && self.size.is_some()
    }
}
