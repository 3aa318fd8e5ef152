//! Error types for upstream calls.

/// Errors returned by an [`IdentityClient`](crate::IdentityClient) or
/// [`GuildDirectory`](crate::GuildDirectory).
///
/// Every variant is transient from the caller's point of view: the
/// reconciliation loop logs it and tries again on its next run.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The request never produced a response (DNS, connect, timeout, TLS).
    #[cfg(feature = "discord")]
    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream answered with a non-success status.
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body didn't match the expected shape.
    #[error("could not decode upstream response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl UpstreamError {
    /// `true` if the upstream rejected the credential itself (401/403).
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}
