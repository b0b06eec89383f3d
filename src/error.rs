//! Custom error types for dumpvault
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions. Every variant carries enough context
//! (artifact name, database, remote path) to act on the failure.

use thiserror::Error;

/// The main error type for dumpvault operations
#[derive(Error, Debug)]
pub enum VaultError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Archive creation or reading errors
    #[error("Archive error: {0}")]
    Archive(String),

    /// Dump producer or account export errors
    #[error("Dump error: {0}")]
    Dump(String),

    /// Remote store errors (listing, upload, download)
    #[error("Remote error: {0}")]
    Remote(String),

    /// Encryption errors
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Validation errors for user input (patterns, names)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Not enough free space on the backup volume
    #[error("Insufficient disk space: {available} bytes available, {required} required")]
    InsufficientSpace { available: u64, required: u64 },
}

impl VaultError {
    /// Create a "not found" error for artifacts
    pub fn artifact_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Artifact",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<zip::result::ZipError> for VaultError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}

/// Result type alias for dumpvault operations
pub type VaultResult<T> = Result<T, VaultError>;
