//! services/annotator/src/error.rs
//!
//! Defines the primary error type for the annotator client.

use crate::config::ConfigError;
use annotation_core::PortError;

/// The primary error type for the `annotator` service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from the annotation core.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Building the HTTP client failed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
