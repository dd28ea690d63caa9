use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use parley_crypto::CipherError;
use parley_db::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Request-level failure taxonomy. Every variant carries a stable `kind`
/// identifier on the wire; internal detail is logged, never returned.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Rejected before any I/O: empty content, missing required field.
    #[error("{0}")]
    Validation(String),

    /// Caller is not a member of the group they tried to read or write.
    #[error("not authorized for this group")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    /// A stored payload failed tag verification: corruption or tampering,
    /// never downgraded to empty content.
    #[error("message failed authentication")]
    AuthenticationFailure,

    /// Transient storage failure. Retryable by the client; never retried
    /// silently within a request.
    #[error("storage temporarily unavailable")]
    StorageUnavailable,

    #[error("internal error")]
    Internal,
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Unauthorized => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::AuthenticationFailure => "authentication_failure",
            Self::StorageUnavailable => "storage_unavailable",
            Self::Internal => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AuthenticationFailure | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": { "kind": self.kind(), "message": self.to_string() }
        }));
        (self.status(), body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("resource"),
            StoreError::Unavailable => ApiError::StorageUnavailable,
            StoreError::Sqlite(e) => {
                error!("database error: {e}");
                ApiError::Internal
            }
        }
    }
}

impl From<CipherError> for ApiError {
    fn from(err: CipherError) -> Self {
        match err {
            CipherError::Authentication | CipherError::Malformed => {
                error!("sealed payload failed to open: {err}");
                ApiError::AuthenticationFailure
            }
            CipherError::InvalidKey | CipherError::Encrypt => {
                error!("cipher failure: {err}");
                ApiError::Internal
            }
        }
    }
}

pub(crate) fn join_error(err: tokio::task::JoinError) -> ApiError {
    error!("blocking task join error: {err}");
    ApiError::Internal
}
