//! CLI argument parsing for the gateway binary.
//!
//! CLI flags override every other configuration source.

use clap::{Parser, Subcommand};

/// ProPilot vector gateway
///
/// HTTP and WebSocket front end over a Pinecone or local vector store.
#[derive(Parser, Debug)]
#[command(name = "propilot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/propilot/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the gateway in the foreground
    Start {
        /// Override listen host
        #[arg(long)]
        host: Option<String>,

        /// Override HTTP port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the resolved configuration (secrets masked) and exit
    Config,
}
