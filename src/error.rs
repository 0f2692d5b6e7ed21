//! Error types for Drivebox.

use thiserror::Error;

/// Common error type for Drivebox.
#[derive(Error, Debug)]
pub enum DriveError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found (or owned by another user).
    #[error("{0} not found")]
    NotFound(String),

    /// Request is well-formed but cannot be carried out as asked.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Upload would push the user over their storage quota.
    #[error("storage quota exceeded: {required} bytes required, {used} of {quota} used")]
    QuotaExceeded {
        /// User's storage quota in bytes.
        quota: i64,
        /// Bytes already used.
        used: i64,
        /// Bytes the rejected upload needed.
        required: i64,
    },

    /// Request payload exceeds a configured limit.
    #[error("too large: {0}")]
    TooLarge(String),

    /// File type rejected by the upload allow-list.
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for DriveError {
    fn from(e: sqlx::Error) -> Self {
        DriveError::Database(e.to_string())
    }
}

impl DriveError {
    /// Whether this error came from a UNIQUE constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DriveError::Database(msg) if msg.contains("UNIQUE"))
    }
}

/// Result type alias for Drivebox operations.
pub type Result<T> = std::result::Result<T, DriveError>;
