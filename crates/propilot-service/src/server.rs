//! HTTP server setup and graceful shutdown.

use std::future::Future;
use std::net::SocketAddr;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::health::health;
use crate::root::root;
use crate::state::AppState;
use crate::ws::ws_handler;

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until `shutdown_signal` resolves.
pub async fn run_server_with_shutdown<F>(
    addr: SocketAddr,
    state: AppState,
    shutdown_signal: F,
) -> Result<(), ServiceError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.map_err(|source| ServiceError::Bind {
        addr: addr.to_string(),
        source,
    })?;
    serve_with_shutdown(listener, state, shutdown_signal).await
}

/// Serve on an already bound listener until `shutdown_signal` resolves.
///
/// After in-flight requests drain, the vector store handle's shutdown hook
/// runs exactly once.
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    state: AppState,
    shutdown_signal: F,
) -> Result<(), ServiceError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let store = state.store.clone();
    let addr = listener.local_addr()?;
    info!(
        %addr,
        vector_db = %store.backend(),
        verifier = state.verifier.name(),
        "HTTP server ready"
    );

    let served = axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal)
        .await;

    info!("HTTP server stopped, closing vector store");
    if let Err(e) = store.shutdown().await {
        warn!(error = %e, "Vector store shutdown failed");
        served?;
        return Err(e.into());
    }

    served?;
    info!("Shutdown complete");
    Ok(())
}
