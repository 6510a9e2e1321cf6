//! HTTP and WebSocket surface for the ProPilot gateway.
//!
//! Routes:
//! - `GET /`: authenticated status message with the caller's claims
//! - `GET /health`: backend and store summary
//! - `GET /ws`: text echo sessions

pub mod error;
pub mod health;
pub mod identity;
pub mod root;
pub mod server;
pub mod state;
pub mod ws;

pub use error::{ApiError, ServiceError};
pub use identity::Identity;
pub use server::{create_router, run_server_with_shutdown, serve_with_shutdown};
pub use state::AppState;
pub use ws::{echo_text, SessionLimits, ECHO_PREFIX};
