//! Unified error types and result handling.

use thiserror::Error;

/// Every failure the ledger can surface to a caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration, or rejected input that is not an amount.
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// A budget or expense amount that cannot be stored.
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The offending value
        amount: f64,
    },

    /// A professor identifier outside the fixed roster.
    #[error("Unknown professor: {id}")]
    UnknownProfessor {
        /// The identifier as given
        id: String,
    },

    /// The remote service answered with a non-success status.
    #[error("Remote store error ({status}): {message}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Response body or description
        message: String,
    },

    /// A store-level failure that is not tied to a transport error.
    #[error("Store error: {message}")]
    Store {
        /// What went wrong
        message: String,
    },

    /// I/O error from the local fallback store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport failure talking to the remote store.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Inline attachment data that is not valid base64.
    #[error("Attachment decode error: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
