//! services/annotator/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use annotation_core::Session;
use tracing::Level;

const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Prefix for every `/<Entity>/<action>` path, without a trailing slash.
    pub base_url: String,
    pub log_level: Level,
    /// Stored login, if any. Commands that write need it.
    pub session: Option<Session>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup("ANNOTATOR_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(
                "ANNOTATOR_API_BASE_URL".to_string(),
                format!("'{}' is not an http(s) URL", base_url),
            ));
        }
        let base_url = base_url.trim_end_matches('/').to_string();

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // A token is useless without the user it belongs to, and vice versa.
        let session = match (lookup("ANNOTATOR_SESSION"), lookup("ANNOTATOR_USER")) {
            (Some(token), Some(user)) => Some(Session::new(token, user)),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::MissingVar("ANNOTATOR_USER".to_string())),
            (None, Some(_)) => return Err(ConfigError::MissingVar("ANNOTATOR_SESSION".to_string())),
        };

        Ok(Self {
            base_url,
            log_level,
            session,
        })
    }
}
