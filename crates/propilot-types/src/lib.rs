//! # propilot-types
//!
//! Shared configuration types for the ProPilot gateway:
//! - Settings: layered configuration (defaults, file, environment)
//! - VectorBackend: the closed set of vector database backends
//! - ConfigError: fatal startup configuration failures

pub mod backend;
pub mod config;
pub mod error;

pub use backend::VectorBackend;
pub use crate::config::{
    AuthMode, AuthSettings, ChromaSettings, PineconeSettings, Settings, WebSocketSettings,
    WELL_KNOWN_ENV_VARS,
};
pub use error::ConfigError;
