//! Metadata this application keeps on the LiveKit rooms it owns.

use crate::proto::EgressStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Recording state published to clients through the room metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordingStatus {
    Starting,
    Started,
    Stopping,
    #[default]
    Stopped,
    Failed,
}

impl RecordingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "STARTING",
            Self::Started => "STARTED",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Failed => "FAILED",
        }
    }

    /// Map the raw `EgressInfo::status` value; values this build does not
    /// know count as failures.
    pub fn from_egress_status(status: i32) -> Self {
        EgressStatus::try_from(status)
            .map(Self::from)
            .unwrap_or(Self::Failed)
    }
}

impl From<EgressStatus> for RecordingStatus {
    fn from(status: EgressStatus) -> Self {
        match status {
            EgressStatus::EgressStarting => Self::Starting,
            EgressStatus::EgressActive => Self::Started,
            EgressStatus::EgressEnding => Self::Stopping,
            EgressStatus::EgressComplete => Self::Stopped,
            EgressStatus::EgressFailed
            | EgressStatus::EgressAborted
            | EgressStatus::EgressLimitReached => Self::Failed,
        }
    }
}

impl fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON document stored in `Room::metadata` for rooms this application created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMetadata {
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub recording_status: RecordingStatus,
}

impl RoomMetadata {
    pub fn new(created_by: impl Into<String>, recording_status: RecordingStatus) -> Self {
        Self {
            created_by: created_by.into(),
            recording_status,
        }
    }

    /// Parse room metadata; empty or foreign (non-JSON) metadata yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            return None;
        }
        serde_json::from_str(raw).ok()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn is_owned_by(&self, app_name: &str) -> bool {
        self.created_by == app_name
    }
}
