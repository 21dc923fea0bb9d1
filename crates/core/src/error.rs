//! Error types for mlink-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use thiserror::Error;

/// Result type alias for mlink-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for mlink-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The content type of a file could not be determined
    #[error("Cannot classify file: {0}")]
    Classification(String),

    /// Object store API failure
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Network error (retryable)
    #[error("Network error: {0}")]
    Network(String),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Resource not found (missing object, expired signed link)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict error
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A share link that cannot be mapped back to bucket and key
    #[error("Malformed link: {0}")]
    MalformedLink(String),

    /// The shortener refused to shorten a URL
    #[error("Failed to shorten url: {0}")]
    Shorten(String),

    /// The shortener refused to expand a short link
    #[error("Failed to expand url: {0}")]
    Expand(String),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The operation was interrupted before it completed
    #[error("Operation cancelled")]
    Cancelled,

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) | Error::MalformedLink(_) | Error::InvalidUrl(_) => 2, // UsageError
            Error::Network(_) => 3,                                                 // NetworkError
            Error::Auth(_) => 4,                                                    // AuthError
            Error::NotFound(_) => 5,                                                // NotFound
            Error::Conflict(_) => 6,                                                // Conflict
            Error::Cancelled => 130,                                                // Interrupted
            _ => 1,                                                                 // GeneralError
        }
    }

    /// Prefix the message with the operation it aborted, keeping the kind
    pub fn context(self, operation: &str) -> Self {
        match self {
            Error::Backend(m) => Error::Backend(format!("{operation}: {m}")),
            Error::Network(m) => Error::Network(format!("{operation}: {m}")),
            Error::Auth(m) => Error::Auth(format!("{operation}: {m}")),
            Error::NotFound(m) => Error::NotFound(format!("{operation}: {m}")),
            Error::Conflict(m) => Error::Conflict(format!("{operation}: {m}")),
            Error::General(m) => Error::General(format!("{operation}: {m}")),
            other => other,
        }
    }

    /// Whether this error means the requested object is gone
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
