//! Unified error types for the Mango API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mango_session::StoreError;
use mango_upstream::UpstreamError;
use serde_json::json;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// Startup and serving code returns this single type; the `#[from]`
/// attribute on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum MangoError {
    /// A session store failure (read, write, persist).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An upstream identity provider failure.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Missing or malformed configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Binding or serving the listener failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors a request handler can answer with.
///
/// Every variant renders as `{"message": ...}` with its own status code.
/// Details of upstream and store failures are logged, not sent.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing authorization code")]
    MissingCode,

    #[error("upstream request failed: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("session store failed: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingCode => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            Self::MissingCode => "Missing authorization code",
            Self::Upstream(_) => "Upstream request failed",
            Self::Store(_) => "Internal server error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(error = %self, status = status.as_u16(), "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(json!({ "message": self.public_message() }))).into_response()
    }
}
