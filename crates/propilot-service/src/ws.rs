//! `GET /ws` echo sessions.

use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use tokio::time::{timeout, Instant};
use tracing::{debug, info};

use propilot_types::WebSocketSettings;

use crate::state::AppState;

/// Prefix prepended to every echoed text frame
pub const ECHO_PREFIX: &str = "Message text was: ";

/// Per-session limits. `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
    pub max_message_bytes: Option<usize>,
}

impl From<&WebSocketSettings> for SessionLimits {
    fn from(settings: &WebSocketSettings) -> Self {
        let secs = |s: u64| (s > 0).then(|| Duration::from_secs(s));
        Self {
            idle_timeout: secs(settings.idle_timeout_secs),
            max_lifetime: secs(settings.max_lifetime_secs),
            max_message_bytes: (settings.max_message_bytes > 0).then_some(settings.max_message_bytes),
        }
    }
}

pub fn echo_text(text: &str) -> String {
    format!("{}{}", ECHO_PREFIX, text)
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let limits = SessionLimits::from(&state.websocket);
    let ws = match limits.max_message_bytes {
        Some(max) => ws.max_message_size(max).max_frame_size(max),
        None => ws,
    };
    ws.on_upgrade(move |socket| run_session(socket, limits))
}

/// Why the session deadline fired.
#[derive(Debug, Clone, Copy)]
enum Deadline {
    Idle,
    Lifetime,
}

/// Shortest of the idle window and the remaining lifetime.
fn next_deadline(limits: &SessionLimits, expires_at: Option<Instant>) -> Option<(Duration, Deadline)> {
    let remaining = expires_at.map(|at| at.saturating_duration_since(Instant::now()));
    match (limits.idle_timeout, remaining) {
        (Some(idle), Some(left)) if left <= idle => Some((left, Deadline::Lifetime)),
        (Some(idle), _) => Some((idle, Deadline::Idle)),
        (None, Some(left)) => Some((left, Deadline::Lifetime)),
        (None, None) => None,
    }
}

async fn run_session(mut socket: WebSocket, limits: SessionLimits) {
    let expires_at = limits.max_lifetime.map(|d| Instant::now() + d);
    let mut echoed = 0u64;
    debug!(?limits, "WebSocket session open");

    loop {
        let frame = match next_deadline(&limits, expires_at) {
            Some((wait, reason)) => match timeout(wait, socket.recv()).await {
                Ok(frame) => frame,
                Err(_) => {
                    info!(?reason, echoed, "Closing WebSocket session");
                    let _ = socket
                        .send(Message::Close(Some(CloseFrame {
                            code: close_code::NORMAL,
                            reason: "session limit reached".into(),
                        })))
                        .await;
                    break;
                }
            },
            None => socket.recv().await,
        };

        match frame {
            Some(Ok(Message::Text(text))) => {
                if let Err(e) = socket.send(Message::Text(echo_text(text.as_str()).into())).await {
                    debug!(error = %e, "WebSocket send failed");
                    break;
                }
                echoed += 1;
            }
            Some(Ok(Message::Close(_))) | None => break,
            // Binary frames are ignored; ping/pong are answered by the transport.
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                debug!(error = %e, "WebSocket receive failed");
                break;
            }
        }
    }

    debug!(echoed, "WebSocket session closed");
}
