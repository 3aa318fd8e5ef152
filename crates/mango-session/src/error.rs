//! Error types for the session layer.

/// Errors that can occur while reading or writing stored sessions.
///
/// A missing session is *not* an error: lookups return `Ok(None)` so the
/// access guard can treat "no session" and "anonymous session" the same way.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing file could not be read, written, or renamed.
    #[error("session store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A session could not be serialized for persistence.
    #[error("failed to serialize sessions: {0}")]
    Serialize(serde_json::Error),

    /// The persisted data exists but does not decode into sessions.
    #[error("session store is corrupt: {0}")]
    Corrupt(serde_json::Error),
}
