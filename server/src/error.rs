use crate::catalog::CatalogError;
use crate::livekit::ServiceError;
use crate::storage::StorageError;
use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors returned by HTTP handlers
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Requested range not satisfiable")]
    RangeNotSatisfiable { size: u64 },

    #[error("{0}")]
    Unauthorized(String),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("LiveKit request failed: {0}")]
    Upstream(#[from] ServiceError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation<T: ToString>(t: T) -> Self {
        AppError::Validation(t.to_string())
    }

    pub fn not_found<T: ToString>(t: T) -> Self {
        AppError::NotFound(t.to_string())
    }

    pub fn conflict<T: ToString>(t: T) -> Self {
        AppError::Conflict(t.to_string())
    }

    pub fn internal<T: ToString>(t: T) -> Self {
        AppError::Internal(t.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Storage(_) | AppError::Upstream(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message sent to the client; server-side failures stay generic
    fn client_message(&self) -> String {
        match self {
            AppError::Storage(_) => "Storage backend error".to_string(),
            AppError::Upstream(_) => "LiveKit request failed".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => AppError::not_found("Recording not found"),
            other => AppError::Storage(other),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::InvalidName(name) => {
                AppError::Validation(format!("Invalid recording name: {}", name))
            }
            CatalogError::NotFound(_) => AppError::not_found("Recording not found"),
            CatalogError::RangeNotSatisfiable { size } => AppError::RangeNotSatisfiable { size },
            CatalogError::Storage(e) => e.into(),
            CatalogError::Sidecar(e) => AppError::internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("❌ {}", self);
        }

        let body = Json(json!({ "errorMessage": self.client_message() }));
        match self {
            AppError::RangeNotSatisfiable { size } => (
                status,
                [(header::CONTENT_RANGE, format!("bytes */{}", size))],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}
