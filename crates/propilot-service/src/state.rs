//! Shared application state.

use std::sync::Arc;

use propilot_auth::TokenVerifier;
use propilot_types::WebSocketSettings;
use propilot_vector::VectorStoreHandle;

/// State injected into every handler.
///
/// Built once at startup; the store handle and verifier are shared, never
/// replaced.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<VectorStoreHandle>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub websocket: WebSocketSettings,
}

impl AppState {
    pub fn new(store: Arc<VectorStoreHandle>, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            store,
            verifier,
            websocket: WebSocketSettings::default(),
        }
    }

    pub fn with_websocket(mut self, websocket: WebSocketSettings) -> Self {
        self.websocket = websocket;
        self
    }
}
