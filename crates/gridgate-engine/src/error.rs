//! Error types and utilities for the storage engine.

/// Result type for all engine operations.
///
/// This is a convenience type alias that defaults to using [`Error`] as the error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Unified error type for engine operations.
///
/// `Clone` so the same failure can ride on an event and on the operation's
/// return value without re-deriving it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Engine construction rejected its configuration
    #[error("invalid engine configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The per-file info provider failed; only that upload is affected
    #[error("file info provider failed: {reason}")]
    FileInfo { reason: String },

    /// Connection or storage failure from the client layer
    #[error(transparent)]
    Client(#[from] gridgate_client::Error),
}

impl Error {
    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a file info provider error
    pub fn file_info(reason: impl Into<String>) -> Self {
        Self::FileInfo {
            reason: reason.into(),
        }
    }

    /// Whether this error came from the connection layer, i.e. it affects
    /// every upload sharing the connection rather than a single file.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Client(client) if client.is_connection())
    }
}
