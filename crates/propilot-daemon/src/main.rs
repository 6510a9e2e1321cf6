//! ProPilot Gateway
//!
//! Authenticated HTTP status endpoint and WebSocket echo over a selectable
//! vector store (Pinecone or a local persistent store).
//!
//! # Usage
//!
//! ```bash
//! propilot start [--host HOST] [--port PORT]
//! propilot config
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/propilot/config.toml, or --config)
//! 3. Environment variables (PROPILOT_*, then VECTOR_DB, PINECONE_API_KEY,
//!    PINECONE_ENVIRONMENT, AUTH0_DOMAIN, API_IDENTIFIER, AUTH_MODE)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use propilot_daemon::{show_config, start_gateway, Cli, Commands, Overrides};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { host, port } => {
            let overrides = Overrides {
                host,
                port,
                log_level: cli.log_level,
            };
            start_gateway(cli.config.as_deref(), overrides).await?;
        }
        Commands::Config => {
            let overrides = Overrides {
                log_level: cli.log_level,
                ..Default::default()
            };
            show_config(cli.config.as_deref(), overrides)?;
        }
    }

    Ok(())
}
