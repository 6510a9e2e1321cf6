//! End-to-end test infrastructure for the ProPilot gateway.
//!
//! Provides a `TestHarness` that runs the real server on an ephemeral port
//! over a temporary local store, plus WebSocket helpers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use propilot_auth::{BypassVerifier, TokenVerifier};
use propilot_service::{serve_with_shutdown, AppState, ServiceError};
use propilot_types::{Settings, WebSocketSettings};
use propilot_vector::{connect, VectorStoreHandle};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long helpers wait for the server before failing the test
pub const WAIT: Duration = Duration::from_secs(5);

/// Running gateway bound to 127.0.0.1 on an ephemeral port.
pub struct TestHarness {
    /// Keeps the store directory alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    pub addr: SocketAddr,
    pub store: Arc<VectorStoreHandle>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server_handle: Option<JoinHandle<Result<(), ServiceError>>>,
}

impl TestHarness {
    /// Gateway with the bypass verifier and default session limits.
    pub async fn start() -> Self {
        Self::start_with(Arc::new(BypassVerifier::default()), WebSocketSettings::default()).await
    }

    pub async fn start_with(verifier: Arc<dyn TokenVerifier>, websocket: WebSocketSettings) -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let settings = chroma_settings(&temp_dir);
        let store = Arc::new(connect(&settings).await.expect("Failed to open test store"));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let state = AppState::new(store.clone(), verifier).with_websocket(websocket);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let server_handle = tokio::spawn(serve_with_shutdown(listener, state, async {
            shutdown_rx.await.ok();
        }));

        Self {
            _temp_dir: temp_dir,
            addr,
            store,
            shutdown_tx: Some(shutdown_tx),
            server_handle: Some(server_handle),
        }
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub async fn ws_connect(&self) -> WsClient {
        let (client, _response) = connect_async(self.ws_url())
            .await
            .expect("WebSocket handshake failed");
        client
    }

    /// Signal shutdown and wait for the server task to finish.
    pub async fn shutdown(mut self) -> Result<(), ServiceError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        match self.server_handle.take() {
            Some(handle) => timeout(WAIT, handle)
                .await
                .expect("Server did not shut down")
                .expect("Server task panicked"),
            None => Ok(()),
        }
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Settings selecting the local store under `dir`.
pub fn chroma_settings(dir: &tempfile::TempDir) -> Settings {
    let mut settings = Settings::default();
    settings.chroma.path = dir.path().join("chroma_db").to_string_lossy().to_string();
    settings
}

/// Next text frame, skipping control frames.
pub async fn recv_text(client: &mut WsClient) -> String {
    loop {
        let message = timeout(WAIT, client.next())
            .await
            .expect("Timed out waiting for a frame")
            .expect("Connection closed before a frame arrived")
            .expect("WebSocket error");
        match message {
            Message::Text(text) => return text.as_str().to_string(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("Expected a text frame, got {:?}", other),
        }
    }
}

/// Wait until the server ends the session. Panics if a text frame arrives.
pub async fn expect_closed(client: &mut WsClient) {
    loop {
        let next = timeout(WAIT, client.next())
            .await
            .expect("Timed out waiting for the server to close");
        match next {
            None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            Some(Ok(other)) => panic!("Expected close, got {:?}", other),
        }
    }
}
