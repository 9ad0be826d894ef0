//! Remote Store Error Types
//!
//! Transport-level failures of the REST surface. Service-layer code wraps
//! these in [`crate::services::SyncError`] with the operation that failed.

use thiserror::Error;

/// Remote store operation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// 401/403 from the server; the credential is missing, expired or insufficient
    #[error("Request rejected as unauthorized (HTTP {status})")]
    Unauthorized { status: u16 },

    /// 404 from the server
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Any other non-success status
    #[error("Remote store returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection, TLS or timeout failure before a response arrived
    #[error("Request failed: {0}")]
    Transport(String),

    /// Response body did not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Failure injected into the in-memory store
    #[error("Injected failure for {operation}")]
    Injected { operation: String },
}

impl StoreError {
    /// Create a not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a status error
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Whether this is a 401-class rejection
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Result type for remote store operations
pub type StoreResult<T> = Result<T, StoreError>;
