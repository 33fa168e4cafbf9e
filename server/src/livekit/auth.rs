//! Webhook verification.
//!
//! LiveKit signs each delivery with a JWT whose `sha256` claim is the
//! base64 digest of the body; `livekit_api::webhooks` checks both.

use livekit_api::access_token::TokenVerifier;
use livekit_api::webhooks::{self, WebhookError};
use recording_catalog_proto::proto;
use std::str::Utf8Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingAuthorization,

    #[error("Webhook body is not UTF-8: {0}")]
    InvalidBody(#[from] Utf8Error),

    #[error("{0}")]
    Webhook(#[from] WebhookError),
}

/// Authenticates webhook deliveries from the LiveKit server
#[derive(Debug, Clone)]
pub struct WebhookReceiver {
    inner: webhooks::WebhookReceiver,
}

impl WebhookReceiver {
    pub fn new(api_key: &str, api_secret: &str) -> Self {
        Self {
            inner: webhooks::WebhookReceiver::new(TokenVerifier::with_api_key(api_key, api_secret)),
        }
    }

    /// Verify `authorization` against `body` and decode the event.
    ///
    /// Accepts the token bare or with a `Bearer ` prefix.
    pub fn receive(
        &self,
        body: &[u8],
        authorization: Option<&str>,
    ) -> Result<proto::WebhookEvent, AuthError> {
        let header = authorization
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(AuthError::MissingAuthorization)?;
        let token = header.strip_prefix("Bearer ").unwrap_or(header);

        let body = std::str::from_utf8(body)?;
        Ok(self.inner.receive(body, token)?)
    }
}

/// Sign `body` the way the LiveKit server does for webhook deliveries
#[cfg(test)]
pub(crate) fn sign_webhook(api_key: &str, api_secret: &str, body: &[u8]) -> String {
    use base64::Engine as _;
    use sha2::{Digest, Sha256};

    let digest = base64::engine::general_purpose::STANDARD.encode(Sha256::digest(body));
    livekit_api::access_token::AccessToken::with_api_key(api_key, api_secret)
        .with_sha256(&digest)
        .to_jwt()
        .unwrap()
}
