//! `GET /`

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use propilot_auth::Claims;

use crate::identity::Identity;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
    pub user: Claims,
}

/// Status message naming the active backend, plus the caller's claims.
pub async fn root(State(state): State<AppState>, Identity(claims): Identity) -> Json<RootResponse> {
    Json(RootResponse {
        message: format!("Hello from FastAPI! Using vector DB: {}", state.store.backend()),
        user: claims,
    })
}
