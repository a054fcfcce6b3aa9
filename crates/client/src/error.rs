//! Error taxonomy for the client-state layer.
//!
//! Gateway errors are folded into the uniform [`Envelope`] at the gateway
//! edge - no raw transport error ever reaches a store caller. The
//! [`FailureClass`] is what the stores inspect to decide between surfacing
//! an error and degraded-mode local fallback.
//!
//! [`Envelope`]: crate::gateway::Envelope

use thiserror::Error;

/// Errors produced while talking to the storefront backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network-level failure: the backend is unreachable.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend rejected the credentials (HTTP 401).
    #[error("Unauthorized")]
    Unauthorized,

    /// The endpoint does not exist - the backend is missing this
    /// feature (HTTP 404).
    #[error("Not implemented by backend: {0}")]
    NotImplemented(String),

    /// The backend rejected the request payload (other 4xx).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backend failed (5xx).
    #[error("Server error ({0}): {1}")]
    Server(u16, String),

    /// The response body did not match the expected shape.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GatewayError {
    /// HTTP status associated with this error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::NotImplemented(_) => Some(404),
            Self::Validation(_) => Some(400),
            Self::Server(status, _) => Some(*status),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }

    /// Classify this error for store-level fallback decisions.
    #[must_use]
    pub const fn class(&self) -> FailureClass {
        match self {
            Self::Unauthorized => FailureClass::Unauthorized,
            Self::NotImplemented(_) => FailureClass::Missing,
            Self::Transport(_) => FailureClass::Unreachable,
            Self::Validation(_) | Self::Server(_, _) | Self::Decode(_) => FailureClass::Other,
        }
    }
}

/// Coarse failure classification used by the resource stores.
///
/// The gateway only records the class; the store layer decides behavior
/// per class (cart degrades, products and auth surface the failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// HTTP 401 - credentials missing or rejected.
    Unauthorized,
    /// HTTP 404 - endpoint not implemented by this backend.
    Missing,
    /// Network unreachable; no HTTP exchange happened.
    Unreachable,
    /// Any other failure (validation, server error, malformed response).
    Other,
}

impl FailureClass {
    /// Whether this failure means the backend is degraded rather than
    /// actively rejecting the operation: the endpoint is missing, the
    /// session is unauthenticated, or the host is unreachable.
    #[must_use]
    pub const fn is_degraded_backend(self) -> bool {
        matches!(self, Self::Unauthorized | Self::Missing | Self::Unreachable)
    }
}

/// Errors produced by the snapshot persistence boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot blob could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A concurrent writer panicked while holding the store lock.
    #[error("Snapshot store lock poisoned")]
    LockPoisoned,

    /// Blob names are restricted to a filesystem-safe alphabet.
    #[error("Invalid snapshot name: {0}")]
    InvalidName(String),
}
