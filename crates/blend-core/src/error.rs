//! Error types for BLEnd core.
//!
//! The scheduler and aggregator never surface errors to their callers; these
//! types cover configuration loading and the transport seam, where failures
//! are logged and absorbed by the scheduler.

use thiserror::Error;

use crate::transport::RadioState;

/// Core error type for shared operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid parameter {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },

    #[error("Config not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}

/// Radio transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Socket error: {0}")]
    Socket(#[from] std::io::Error),

    #[error("Failed to encode beacon: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Radio unavailable ({0})")]
    Unavailable(RadioState),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
