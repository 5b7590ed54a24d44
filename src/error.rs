// src/error.rs

//! Unified error handling for the connector.
//!
//! Variants follow the failure classes the orchestrator cares about: whether an
//! error is worth retrying, whether it only fails one hotel, or whether it has
//! to stop the whole batch.

use std::fmt;

use thiserror::Error;

/// Result type alias for connector operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Network failure, timeout, rate limit or 5xx from the source API
    #[error("Transient source error for {context}: {message}")]
    TransientSource { context: String, message: String },

    /// 4xx (other than rate limiting) or an undecodable body from the source API
    #[error("Permanent source error for {context}: {message}")]
    PermanentSource { context: String, message: String },

    /// Object storage write/read failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Network failure or 5xx from the registry
    #[error("Transient registry error: {0}")]
    TransientRegistry(String),

    /// Registry refused our credentials
    #[error("Registry authorization failed: {0}")]
    PermanentRegistry(String),

    /// Registry rejected a request for a single hotel (non-auth 4xx)
    #[error("Registry rejected request ({status}): {message}")]
    RegistryRejected { status: u16, message: String },

    /// Queue send failed after the hotel was committed
    #[error("Notify error: {0}")]
    Notify(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed marker or malformed transform input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Batch wall-clock budget ran out before the stage could start
    #[error("Batch time budget exhausted: {0}")]
    Deadline(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl AppError {
    /// Create a transient source error with context.
    pub fn transient_source(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::TransientSource {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a permanent source error with context.
    pub fn permanent_source(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::PermanentSource {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a storage error.
    pub fn storage(message: impl fmt::Display) -> Self {
        Self::Storage(message.to_string())
    }

    /// Create a notify error.
    pub fn notify(message: impl fmt::Display) -> Self {
        Self::Notify(message.to_string())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether another attempt of the same call may succeed.
    ///
    /// Local I/O failures count as storage failures since the local
    /// artifact store surfaces them directly.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientSource { .. }
                | Self::Storage(_)
                | Self::TransientRegistry(_)
                | Self::Io(_)
        )
    }

    /// Whether this error must abort the whole batch instead of one hotel.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, Self::PermanentRegistry(_) | Self::Config(_))
    }
}
