pub mod record;
pub mod room;
pub mod sidecar;
pub mod webhook;

pub use livekit_protocol as proto;

pub use record::RecordingRecord;
pub use room::*;
pub use sidecar::{KeyLayout, RecordFilter, SidecarError};
pub use webhook::EventKind;
