//! Error types for configuration loading.

use thiserror::Error;

/// Errors raised while resolving startup configuration.
///
/// Every variant is fatal: the daemon refuses to bind a listener when
/// configuration cannot be resolved.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `VECTOR_DB` named something other than a supported backend
    #[error("Invalid VECTOR_DB environment variable. Must be 'pinecone' or 'chroma'. Got '{0}'")]
    InvalidBackend(String),

    /// A source could not be read or deserialized
    #[error("Configuration error: {0}")]
    Load(String),

    /// Values were read but failed validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load(err.to_string())
    }
}
