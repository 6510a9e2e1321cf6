//! Command implementations for the gateway binary.
//!
//! Handles:
//! - start: load config, connect the vector store, serve HTTP/WebSocket
//! - config: print the resolved settings

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};

use propilot_auth::build_verifier;
use propilot_service::{run_server_with_shutdown, AppState};
use propilot_types::Settings;
use propilot_vector::connect;

/// CLI flags that take precedence over every configuration source.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

impl Overrides {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(host) = &self.host {
            settings.http_host = host.clone();
        }
        if let Some(port) = self.port {
            settings.http_port = port;
        }
        if let Some(log_level) = &self.log_level {
            settings.log_level = log_level.clone();
        }
    }
}

/// Load configuration (defaults -> file -> env -> CLI).
pub fn resolve_settings(config_path: Option<&str>, overrides: &Overrides) -> Result<Settings> {
    let env: HashMap<String, String> = std::env::vars().collect();
    resolve_settings_from(config_path, overrides, &env)
}

/// [`resolve_settings`] against an explicit environment map.
pub fn resolve_settings_from(
    config_path: Option<&str>,
    overrides: &Overrides,
    env: &HashMap<String, String>,
) -> Result<Settings> {
    let mut settings =
        Settings::load_from(config_path, env).context("Failed to load configuration")?;
    overrides.apply(&mut settings);
    Ok(settings)
}

fn init_tracing(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

/// Start the gateway in the foreground.
///
/// 1. Load configuration; an unknown backend aborts here
/// 2. Build the token verifier
/// 3. Connect the vector store, creating it if absent
/// 4. Serve until SIGINT/SIGTERM, then close the store
pub async fn start_gateway(config_path: Option<&str>, overrides: Overrides) -> Result<()> {
    let settings = resolve_settings(config_path, &overrides)?;
    init_tracing(&settings.log_level)?;

    info!("ProPilot gateway starting...");
    info!("Configuration:");
    info!("  Vector DB: {}", settings.vector_db);
    info!("  HTTP address: {}", settings.http_addr());
    info!("  Auth mode: {:?}", settings.auth.mode);
    info!("  Log level: {}", settings.log_level);

    let addr: SocketAddr = settings
        .http_addr()
        .parse()
        .context("Invalid HTTP address")?;

    let verifier = build_verifier(&settings.auth).context("Failed to build token verifier")?;

    let store = connect(&settings)
        .await
        .with_context(|| format!("Failed to initialize {} vector store", settings.vector_db))?;

    let state = AppState::new(Arc::new(store), verifier).with_websocket(settings.websocket.clone());

    run_server_with_shutdown(addr, state, shutdown_signal())
        .await
        .context("Server error")
}

/// Print the resolved settings as JSON with secrets masked.
pub fn show_config(config_path: Option<&str>, overrides: Overrides) -> Result<()> {
    let settings = resolve_settings(config_path, &overrides)?;
    let redacted = settings
        .redacted()
        .context("Failed to serialize configuration")?;
    let rendered =
        serde_json::to_string_pretty(&redacted).context("Failed to render configuration")?;
    println!("{}", rendered);
    Ok(())
}
