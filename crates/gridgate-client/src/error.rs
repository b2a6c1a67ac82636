//! Error types and utilities for connection and storage operations.

/// Result type for all operations in this crate.
///
/// This is a convenience type alias that defaults to using [`Error`] as the error type.
/// Most functions in this crate return this type for consistent error handling.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Unified error type for connection and storage operations.
///
/// The type is `Clone` on purpose: a connection failure is captured once on
/// its cache entry and then replayed to every waiter and every later upload
/// attempt, so the same error value must be deliverable more than once.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Connection string could not be parsed into a storage target
    #[error("invalid connection string '{input}': {reason}")]
    InvalidTarget { input: String, reason: String },

    /// Establishing the backend connection failed
    #[error("connection failed: {reason}")]
    Connection { reason: String },

    /// The task producing the connection went away before resolving
    #[error("connection attempt aborted before it resolved")]
    ConnectionAborted,

    /// resolve/reject called on an entry that already reached a terminal state
    #[error("connection entry is already {state}, cannot transition again")]
    EntryAlreadyResolved { state: &'static str },

    /// Object missing from the backend
    #[error("object '{id}' not found in bucket '{bucket}'")]
    ObjectNotFound { bucket: String, id: String },

    /// Generic storage operation error with context
    #[error("storage operation failed: {operation} - {details}")]
    Operation { operation: String, details: String },
}

impl Error {
    /// Create an invalid target error
    pub fn invalid_target(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a connection error
    pub fn connection(reason: impl Into<String>) -> Self {
        Self::Connection {
            reason: reason.into(),
        }
    }

    /// Create an object not found error
    pub fn object_not_found(bucket: impl Into<String>, id: impl ToString) -> Self {
        Self::ObjectNotFound {
            bucket: bucket.into(),
            id: id.to_string(),
        }
    }

    /// Create an operation error with context
    pub fn operation(op: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Operation {
            operation: op.into(),
            details: details.into(),
        }
    }

    /// Whether this error came from the connection layer rather than a
    /// per-object operation.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Error::Connection { .. } | Error::ConnectionAborted | Error::InvalidTarget { .. }
        )
    }
}
