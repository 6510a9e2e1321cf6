//! WebSocket echo sessions over a real listener.

use std::sync::Arc;

use futures::SinkExt;
use pretty_assertions::assert_eq;
use tokio_tungstenite::tungstenite::Message;

use e2e_tests::{expect_closed, recv_text, TestHarness};
use propilot_auth::BypassVerifier;
use propilot_types::WebSocketSettings;

#[tokio::test]
async fn test_ping_is_echoed_once() {
    let harness = TestHarness::start().await;
    let mut client = harness.ws_connect().await;

    client.send(Message::Text("ping".into())).await.unwrap();
    assert_eq!(recv_text(&mut client).await, "Message text was: ping");

    client.close(None).await.unwrap();
    expect_closed(&mut client).await;
}

#[tokio::test]
async fn test_replies_preserve_order() {
    let harness = TestHarness::start().await;
    let mut client = harness.ws_connect().await;

    client.send(Message::Text("a".into())).await.unwrap();
    client.send(Message::Text("b".into())).await.unwrap();

    assert_eq!(recv_text(&mut client).await, "Message text was: a");
    assert_eq!(recv_text(&mut client).await, "Message text was: b");
}

#[tokio::test]
async fn test_no_authentication_required() {
    let harness = TestHarness::start().await;
    // The handshake carries no Authorization header.
    let mut client = harness.ws_connect().await;
    client.send(Message::Text("hello".into())).await.unwrap();
    assert_eq!(recv_text(&mut client).await, "Message text was: hello");
}

#[tokio::test]
async fn test_binary_frames_are_ignored() {
    let harness = TestHarness::start().await;
    let mut client = harness.ws_connect().await;

    client.send(Message::Binary(vec![1u8, 2, 3].into())).await.unwrap();
    client.send(Message::Text("after".into())).await.unwrap();

    assert_eq!(recv_text(&mut client).await, "Message text was: after");
}

#[tokio::test]
async fn test_peer_close_does_not_affect_other_sessions() {
    let harness = TestHarness::start().await;
    let mut first = harness.ws_connect().await;
    let mut second = harness.ws_connect().await;

    first.send(Message::Text("one".into())).await.unwrap();
    assert_eq!(recv_text(&mut first).await, "Message text was: one");
    first.close(None).await.unwrap();
    expect_closed(&mut first).await;

    second.send(Message::Text("two".into())).await.unwrap();
    assert_eq!(recv_text(&mut second).await, "Message text was: two");

    // Dropping without a close handshake is a transport error on the server side.
    drop(second);
    let mut third = harness.ws_connect().await;
    third.send(Message::Text("three".into())).await.unwrap();
    assert_eq!(recv_text(&mut third).await, "Message text was: three");
}

#[tokio::test]
async fn test_idle_session_is_closed() {
    let websocket = WebSocketSettings {
        idle_timeout_secs: 1,
        ..Default::default()
    };
    let harness = TestHarness::start_with(Arc::new(BypassVerifier::default()), websocket).await;
    let mut client = harness.ws_connect().await;

    client.send(Message::Text("still here".into())).await.unwrap();
    assert_eq!(recv_text(&mut client).await, "Message text was: still here");

    expect_closed(&mut client).await;
}

#[tokio::test]
async fn test_oversized_message_ends_session() {
    let websocket = WebSocketSettings {
        max_message_bytes: 16,
        ..Default::default()
    };
    let harness = TestHarness::start_with(Arc::new(BypassVerifier::default()), websocket).await;
    let mut client = harness.ws_connect().await;

    client.send(Message::Text("short".into())).await.unwrap();
    assert_eq!(recv_text(&mut client).await, "Message text was: short");

    let big = "x".repeat(64);
    // The server may reset the connection before the send completes.
    let _ = client.send(Message::Text(big.into())).await;
    expect_closed(&mut client).await;
}
