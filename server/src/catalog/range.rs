//! `Range` header handling for recording playback.
//!
//! Only single `bytes=` ranges are understood. Anything else is ignored and
//! the default window is served, which keeps seeking clients working without
//! ever streaming a whole recording in one response.

use crate::storage::ByteRange;

/// A single parsed `bytes=` range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// `bytes=start-end`
    Bounded { start: u64, end: u64 },
    /// `bytes=start-`
    From { start: u64 },
    /// `bytes=-length`
    Suffix { length: u64 },
}

/// The requested range starts at or past the end of the object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unsatisfiable {
    pub size: u64,
}

/// Parse a `Range` header value. Multi-range and malformed values yield `None`.
pub fn parse_range_header(value: &str) -> Option<RangeSpec> {
    let spec = value.trim().strip_prefix("bytes=")?.trim();
    if spec.contains(',') {
        return None;
    }

    let (start, end) = spec.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());

    match (start.is_empty(), end.is_empty()) {
        (true, true) => None,
        (true, false) => Some(RangeSpec::Suffix {
            length: end.parse().ok()?,
        }),
        (false, true) => Some(RangeSpec::From {
            start: start.parse().ok()?,
        }),
        (false, false) => {
            let start: u64 = start.parse().ok()?;
            let end: u64 = end.parse().ok()?;
            (end >= start).then_some(RangeSpec::Bounded { start, end })
        }
    }
}

/// Resolve the window to serve for an object of `size` bytes.
///
/// Open-ended, suffix and absent ranges are capped at `chunk` bytes. Returns
/// `Ok(None)` for empty objects, which have nothing to window.
pub fn resolve_window(
    spec: Option<RangeSpec>,
    size: u64,
    chunk: u64,
) -> Result<Option<ByteRange>, Unsatisfiable> {
    if size == 0 {
        return Ok(None);
    }

    let last = size - 1;
    let chunk = chunk.max(1);

    let window = match spec {
        None => ByteRange::new(0, last.min(chunk - 1)),
        Some(RangeSpec::Bounded { start, end }) => {
            if start > last {
                return Err(Unsatisfiable { size });
            }
            ByteRange::new(start, end.min(last))
        }
        Some(RangeSpec::From { start }) => {
            if start > last {
                return Err(Unsatisfiable { size });
            }
            ByteRange::new(start, start.saturating_add(chunk - 1).min(last))
        }
        Some(RangeSpec::Suffix { length }) => {
            if length == 0 {
                return Err(Unsatisfiable { size });
            }
            let start = size.saturating_sub(length);
            ByteRange::new(start, start.saturating_add(chunk - 1).min(last))
        }
    };

    Ok(Some(window))
}
