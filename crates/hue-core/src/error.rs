//! Error types for Hue.
//!
//! Errors are split by concern so messages carry the context a user needs
//! to act on them (file paths, prompt names, HTTP status codes).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Hue operations.
#[derive(Error, Debug)]
pub enum HueError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Image or provider errors
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Result export errors
    #[error("Export error: {0}")]
    Export(#[from] csv::Error),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised while preparing an image or talking to a provider.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Image could not be read or failed validation
    #[error("Cannot read image {path}: {message}")]
    ImageRead { path: PathBuf, message: String },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Prompt name is not in the configured prompt set
    #[error("Unknown prompt: {0}")]
    UnknownPrompt(String),

    /// Provider call failed. `status_code` is set for HTTP-level failures.
    #[error("{message}")]
    Provider {
        message: String,
        status_code: Option<u16>,
    },

    /// Provider answered 2xx but without any usable text
    #[error("Empty response from {provider}: {message}")]
    EmptyResponse { provider: String, message: String },

    /// Operation timed out
    #[error("Timeout for {path} after {timeout_ms}ms")]
    Timeout { path: PathBuf, timeout_ms: u64 },
}

impl AnalysisError {
    /// HTTP status attached to the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AnalysisError::Provider { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

/// Convenience type alias for Hue results.
pub type Result<T> = std::result::Result<T, HueError>;
