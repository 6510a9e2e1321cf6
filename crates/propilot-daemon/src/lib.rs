//! ProPilot gateway binary library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (start, config)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{resolve_settings, resolve_settings_from, show_config, start_gateway, Overrides};
