//! Metadata sidecar codec and storage key layout.
//!
//! Every finished recording is stored as two objects:
//!
//! - media:   `<recordings-prefix><name>`
//! - sidecar: `<recordings-prefix><metadata-prefix><name-without-extension>.json`
//!
//! The sidecar carries the [`RecordingRecord`] fields that the media
//! container does not.

use crate::proto::{EgressInfo, EgressStatus, FileInfo, egress_info};
use crate::record::RecordingRecord;
use thiserror::Error;

pub const DEFAULT_RECORDINGS_PREFIX: &str = "recordings/";
pub const DEFAULT_METADATA_PREFIX: &str = ".metadata/";
pub const SIDECAR_EXTENSION: &str = ".json";

const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("egress {0} has no file result")]
    MissingFileResult(String),

    #[error("invalid sidecar JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Build the catalog record for a finished egress.
///
/// Uses the first file result; start time is converted from nanoseconds to
/// milliseconds and duration from nanoseconds to seconds.
pub fn to_record(info: &EgressInfo) -> Result<RecordingRecord, SidecarError> {
    let file = primary_file(info)
        .ok_or_else(|| SidecarError::MissingFileResult(info.egress_id.clone()))?;

    Ok(RecordingRecord {
        id: info.egress_id.clone(),
        name: file_name(&file.filename).to_string(),
        room_name: info.room_name.clone(),
        room_id: info.room_id.clone(),
        started_at: info.started_at / NANOS_PER_MILLI,
        duration: Some(file.duration as f64 / NANOS_PER_SECOND),
        size: Some(u64::try_from(file.size).unwrap_or(0)),
    })
}

/// Lenient variant of [`to_record`] for egresses that may still be running.
///
/// Completion fields are only filled in once the egress reports COMPLETE.
pub fn summarize(info: &EgressInfo) -> RecordingRecord {
    let file = primary_file(info);
    let complete = info.status == EgressStatus::EgressComplete as i32;

    RecordingRecord {
        id: info.egress_id.clone(),
        name: file.map(|f| file_name(&f.filename).to_string()).unwrap_or_default(),
        room_name: info.room_name.clone(),
        room_id: info.room_id.clone(),
        started_at: info.started_at / NANOS_PER_MILLI,
        duration: file
            .filter(|_| complete)
            .map(|f| f.duration as f64 / NANOS_PER_SECOND),
        size: file
            .filter(|_| complete)
            .map(|f| u64::try_from(f.size).unwrap_or(0)),
    }
}

/// The file output the catalog tracks: the first file result, or the
/// single-file result reported by older servers.
pub fn primary_file(info: &EgressInfo) -> Option<&FileInfo> {
    info.file_results.first().or(match &info.result {
        Some(egress_info::Result::File(file)) => Some(file),
        _ => None,
    })
}

pub fn encode(record: &RecordingRecord) -> Result<Vec<u8>, SidecarError> {
    Ok(serde_json::to_vec(record)?)
}

pub fn decode(data: &[u8]) -> Result<RecordingRecord, SidecarError> {
    Ok(serde_json::from_slice(data)?)
}

/// Last path segment of an egress filename
fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// File name without its final extension (`a.b.mp4` -> `a.b`)
fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    }
}

/// Deterministic mapping between recording names and storage keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    recordings_prefix: String,
    metadata_prefix: String,
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self::new(DEFAULT_RECORDINGS_PREFIX)
    }
}

impl KeyLayout {
    pub fn new(recordings_prefix: &str) -> Self {
        Self {
            recordings_prefix: normalize_prefix(recordings_prefix),
            metadata_prefix: DEFAULT_METADATA_PREFIX.to_string(),
        }
    }

    pub fn with_metadata_prefix(mut self, metadata_prefix: &str) -> Self {
        self.metadata_prefix = normalize_prefix(metadata_prefix);
        self
    }

    pub fn recordings_prefix(&self) -> &str {
        &self.recordings_prefix
    }

    pub fn media_key(&self, name: &str) -> String {
        format!("{}{}", self.recordings_prefix, name)
    }

    pub fn sidecar_key(&self, name: &str) -> String {
        format!(
            "{}{}{}",
            self.metadata_dir(),
            strip_extension(name),
            SIDECAR_EXTENSION
        )
    }

    /// Directory holding every sidecar
    pub fn metadata_dir(&self) -> String {
        format!("{}{}", self.recordings_prefix, self.metadata_prefix)
    }

    /// Egress file path template that produces names the filter understands:
    /// `<room_name>-<room_id>-<time>`.
    pub fn egress_filepath(&self) -> String {
        format!("{}{{room_name}}-{{room_id}}-{{time}}", self.recordings_prefix)
    }

    /// Whether `key` is a sidecar the filter could match, judged on the key
    /// alone.
    pub fn matches_sidecar(&self, key: &str, filter: &RecordFilter) -> bool {
        let dir = self.metadata_dir();
        let Some(file) = key.strip_prefix(dir.as_str()) else {
            return false;
        };
        if file.contains('/') || !file.ends_with(SIDECAR_EXTENSION) {
            return false;
        }
        filter.matches_file_name(file)
    }
}

/// Optional room filters for listing.
///
/// Matching is prefix based on the key (`<roomName>-<roomId>...`) followed
/// by an exact comparison on the decoded record, so room names are never
/// interpreted as patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub room_name: Option<String>,
    pub room_id: Option<String>,
}

impl RecordFilter {
    /// Empty strings count as "no filter"
    pub fn new(room_name: Option<String>, room_id: Option<String>) -> Self {
        Self {
            room_name: room_name.filter(|s| !s.is_empty()),
            room_id: room_id.filter(|s| !s.is_empty()),
        }
    }

    pub fn by_room(room_name: &str) -> Self {
        Self::new(Some(room_name.to_string()), None)
    }

    fn matches_file_name(&self, file: &str) -> bool {
        match (&self.room_name, &self.room_id) {
            (Some(name), Some(id)) => file.starts_with(&format!("{}-{}", name, id)),
            (Some(name), None) => file.starts_with(&format!("{}-", name)),
            // A room id alone is not a key prefix; decide on the record
            _ => true,
        }
    }

    pub fn accepts(&self, record: &RecordingRecord) -> bool {
        self.room_name.as_ref().is_none_or(|name| *name == record.room_name)
            && self.room_id.as_ref().is_none_or(|id| *id == record.room_id)
    }
}
