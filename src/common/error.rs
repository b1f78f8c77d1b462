//! Error types for the application.

use thiserror::Error;

/// Top-level application error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Contact store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness or single-assignment rule would be broken.
    #[error("Constraint violation: {message}")]
    ConstraintViolation { message: String },

    #[error("Contact not found: {remote_id}")]
    ContactNotFound { remote_id: String },

    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            message: message.into(),
        }
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation { .. })
    }
}

/// Errors reported by either transport.
///
/// Timeouts are reported like any other failure.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to send message: {message}")]
    SendFailed { message: String },

    #[error("Transport operation timed out")]
    Timeout,

    #[error("Transport not ready: {message}")]
    NotReady { message: String },

    #[error("Request rejected: {message}")]
    Rejected { message: String },
}

/// A fault raised inside a plugin.
#[derive(Debug, Error)]
#[error("Plugin '{plugin}' failed: {message}")]
pub struct PluginError {
    pub plugin: String,
    pub message: String,
}

impl PluginError {
    pub fn new(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}

/// Errors while preparing operator-facing artifacts.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to encode QR payload: {0}")]
    QrEncode(#[from] qrcode::types::QrError),

    #[error("Failed to render QR image: {0}")]
    Image(#[from] image::ImageError),
}

/// Connection lifecycle errors that end the process.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Maximum reconnection attempts exceeded ({attempts})")]
    MaxReconnectAttempts { attempts: u32 },
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;
