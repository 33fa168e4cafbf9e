//! Seams over the LiveKit server API.
//!
//! The Twirp clients and webhook verification come from `livekit-api`; the
//! traits here narrow them to the calls the catalog makes so handlers can be
//! exercised against in-process fakes.

pub mod auth;
pub mod egress;
pub mod room;

pub use auth::{AuthError, WebhookReceiver};
pub use egress::EgressController;
pub use livekit_api::services::{ServiceError, ServiceResult, TwirpError, TwirpErrorCode};
pub use room::RoomDirectory;

/// Normalize a LiveKit URL for HTTP calls (`ws://` -> `http://`,
/// `wss://` -> `https://`, no trailing slash).
pub fn http_base_url(host: &str) -> Result<String, url::ParseError> {
    let mut url = url::Url::parse(host)?;
    let scheme = match url.scheme() {
        "ws" => Some("http"),
        "wss" => Some("https"),
        _ => None,
    };
    if let Some(scheme) = scheme {
        // ws/wss/http/https are all special schemes, so this cannot fail
        let _ = url.set_scheme(scheme);
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}
