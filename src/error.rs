//! # Error Types
//!
//! Custom error types for Geo Tracker using `thiserror`.

use thiserror::Error;

/// Main error type for Geo Tracker
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport-level HTTP failure (connect, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The collector answered with something other than 200
    #[error("Server returned status {0}")]
    UnexpectedStatus(u16),

    /// Position fix could not be turned into a sample
    #[error("Malformed fix: {0}")]
    MalformedFix(String),

    /// Key/value store failures
    #[error("Store error: {0}")]
    Store(String),

    /// Upload endpoint is unusable
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Result type alias for Geo Tracker
pub type Result<T> = std::result::Result<T, TrackerError>;
