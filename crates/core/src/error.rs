//! Error types for tf-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes
//! and that carries the retry classification used by the uploader.

use thiserror::Error;

/// Result type alias for tf-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for tf-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed configuration detected before any network activity
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Alias not found
    #[error("Alias not found: {0}")]
    AliasNotFound(String),

    /// Alias already exists
    #[error("Alias already exists: {0}")]
    AliasExists(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network error (retryable)
    #[error("Network error: {0}")]
    Network(String),

    /// The server rejected the bytes sent for the claimed offset (retryable)
    #[error("Checksum mismatch: {0}")]
    ChecksumMismatch(String),

    /// Conflict error
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Request rejected by the server
    #[error("Rejected by server ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Response did not follow the protocol
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Feature not supported by backend
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// Retry budget spent without a successful attempt
    #[error("Upload failed after {attempts} attempt(s): {last}")]
    AttemptsExhausted {
        attempts: u32,
        #[source]
        last: Box<Error>,
    },

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Whether a failed upload attempt may be retried after re-synchronizing
    ///
    /// Only transport-level failures and checksum disagreements qualify.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_) | Error::ChecksumMismatch(_))
    }

    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) => 2,                        // UsageError
            Error::Config(_) | Error::Validation(_) => 2,      // UsageError
            Error::Network(_) | Error::ChecksumMismatch(_) => 3, // NetworkError
            Error::AttemptsExhausted { .. } => 3,              // NetworkError
            Error::Auth(_) => 4,                               // AuthError
            Error::NotFound(_) | Error::AliasNotFound(_) => 5, // NotFound
            Error::Conflict(_) | Error::AliasExists(_) => 6,   // Conflict
            Error::UnsupportedFeature(_) => 7,                 // UnsupportedFeature
            _ => 1,                                            // GeneralError
        }
    }
}
