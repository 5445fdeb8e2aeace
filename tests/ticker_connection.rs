//! Ticker Connection Integration Tests
//!
//! Exercises the connection controller against a real in-process WebSocket
//! server: connect, tick delivery, heartbeats, subscription requests, close
//! classification, reconnection with resubscription, and shutdown.
//!
//! Malformed-frame policy under test: malformed binary frames and
//! unrecognized text frames are dropped (logged, no event), and the
//! connection stays up.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;

use kite_ticker::{
    ConnectionState, Credentials, Mode, ReconnectConfig, TickerClient, TickerClientError,
    TickerConfig, TickerEvent,
};

type ServerSocket = WebSocketStream<TcpStream>;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

async fn bind_listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("ws://{}", listener.local_addr().unwrap());
    (listener, endpoint)
}

async fn accept_socket(listener: &TcpListener) -> ServerSocket {
    let (stream, _) = timeout(EVENT_TIMEOUT, listener.accept())
        .await
        .expect("timed out waiting for a connection")
        .unwrap();
    timeout(EVENT_TIMEOUT, tokio_tungstenite::accept_async(stream))
        .await
        .expect("timed out during WebSocket handshake")
        .unwrap()
}

fn test_config(endpoint: &str) -> TickerConfig {
    let mut config = TickerConfig::new(Credentials::new("test_key", "test_token"));
    config.endpoint = endpoint.to_string();
    config
}

fn fast_reconnect() -> ReconnectConfig {
    ReconnectConfig::new(
        Duration::from_millis(50),
        Duration::from_millis(200),
        2.0,
        5,
    )
}

type RunHandle = tokio::task::JoinHandle<Result<(), TickerClientError>>;

fn spawn_client(
    config: TickerConfig,
) -> (Arc<TickerClient>, mpsc::Receiver<TickerEvent>, RunHandle) {
    let (event_tx, event_rx) = mpsc::channel(64);
    let client = Arc::new(TickerClient::new(
        config,
        event_tx,
        CancellationToken::new(),
    ));
    let handle = tokio::spawn(Arc::clone(&client).run());
    (client, event_rx, handle)
}

async fn next_event(rx: &mut mpsc::Receiver<TickerEvent>) -> TickerEvent {
    timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

/// Read the next JSON text frame from the server side, skipping pings.
async fn next_text_frame(socket: &mut ServerSocket) -> serde_json::Value {
    loop {
        let message = timeout(EVENT_TIMEOUT, socket.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed")
            .unwrap();
        match message {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Ping(payload) => {
                let _ = socket.send(Message::Pong(payload)).await;
            }
            _ => {}
        }
    }
}

/// Close the server side with the given code and drain the handshake.
async fn close_server(mut socket: ServerSocket, code: u16, reason: &str) {
    socket
        .send(Message::Close(Some(CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        })))
        .await
        .unwrap();
    let _ = timeout(EVENT_TIMEOUT, async {
        while let Some(message) = socket.next().await {
            if message.is_err() {
                break;
            }
        }
    })
    .await;
}

fn ltp_frame(token: i32, raw_price: i32) -> Vec<u8> {
    let mut frame = Vec::new();
    frame.extend_from_slice(&1i16.to_be_bytes());
    frame.extend_from_slice(&8i16.to_be_bytes());
    frame.extend_from_slice(&token.to_be_bytes());
    frame.extend_from_slice(&raw_price.to_be_bytes());
    frame
}

// =============================================================================
// Connect and Stream
// =============================================================================

#[tokio::test]
async fn connect_emits_connected_then_streams_ticks() {
    let (listener, endpoint) = bind_listener().await;
    let (client, mut events, handle) = spawn_client(test_config(&endpoint));

    let mut server = accept_socket(&listener).await;
    assert!(matches!(next_event(&mut events).await, TickerEvent::Connected));
    assert!(client.is_connected());
    assert_eq!(client.state(), ConnectionState::Connected);

    server
        .send(Message::Binary(ltp_frame(1234, 10_000).into()))
        .await
        .unwrap();

    match next_event(&mut events).await {
        TickerEvent::Ticks(ticks) => {
            assert_eq!(ticks.len(), 1);
            assert_eq!(ticks[0].instrument_token, 1234);
            assert_eq!(ticks[0].last_price, 100.0);
            assert_eq!(ticks[0].mode, Some(Mode::Ltp));
        }
        other => panic!("expected ticks, got {other:?}"),
    }

    client.stop();
    timeout(EVENT_TIMEOUT, handle).await.unwrap().unwrap().unwrap();
    assert!(!client.is_connected());
    assert_eq!(client.state(), ConnectionState::Idle);
}

#[tokio::test]
async fn heartbeat_advances_beat_clock_without_events() {
    let (listener, endpoint) = bind_listener().await;
    let (client, mut events, handle) = spawn_client(test_config(&endpoint));

    let mut server = accept_socket(&listener).await;
    assert!(matches!(next_event(&mut events).await, TickerEvent::Connected));

    let before = client.last_beat_time();
    tokio::time::sleep(Duration::from_millis(10)).await;

    // single-byte binary frame is a heartbeat, then a real tick frame
    server.send(Message::Binary(vec![0u8].into())).await.unwrap();
    server
        .send(Message::Binary(ltp_frame(1234, 10_000).into()))
        .await
        .unwrap();

    // the very next event is the tick batch: the heartbeat emitted nothing
    assert!(matches!(next_event(&mut events).await, TickerEvent::Ticks(_)));
    assert!(client.last_beat_time() > before);

    client.stop();
    timeout(EVENT_TIMEOUT, handle).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn malformed_binary_frame_is_dropped_silently() {
    let (listener, endpoint) = bind_listener().await;
    let (client, mut events, handle) = spawn_client(test_config(&endpoint));

    let mut server = accept_socket(&listener).await;
    assert!(matches!(next_event(&mut events).await, TickerEvent::Connected));

    // declares an 8-byte packet but carries one byte
    server
        .send(Message::Binary(vec![0x00, 0x01, 0x00, 0x08, 0xAA].into()))
        .await
        .unwrap();
    server
        .send(Message::Binary(ltp_frame(5633, 5_000).into()))
        .await
        .unwrap();

    match next_event(&mut events).await {
        TickerEvent::Ticks(ticks) => assert_eq!(ticks[0].instrument_token, 5633),
        other => panic!("expected ticks after dropped frame, got {other:?}"),
    }

    client.stop();
    timeout(EVENT_TIMEOUT, handle).await.unwrap().unwrap().unwrap();
}

// =============================================================================
// Subscriptions
// =============================================================================

#[tokio::test]
async fn subscription_calls_hit_the_wire_and_ledger() {
    let (listener, endpoint) = bind_listener().await;
    let (client, mut events, handle) = spawn_client(test_config(&endpoint));

    let mut server = accept_socket(&listener).await;
    assert!(matches!(next_event(&mut events).await, TickerEvent::Connected));

    client.subscribe(&[408_065, 5633]).unwrap();
    let frame = next_text_frame(&mut server).await;
    assert_eq!(frame["a"], "subscribe");
    assert_eq!(frame["v"], serde_json::json!([408_065, 5633]));

    client.set_mode(Mode::Full, &[408_065]).unwrap();
    let frame = next_text_frame(&mut server).await;
    assert_eq!(frame["a"], "mode");
    assert_eq!(frame["v"], serde_json::json!(["full", [408_065]]));

    client.unsubscribe(&[5633]).unwrap();
    let frame = next_text_frame(&mut server).await;
    assert_eq!(frame["a"], "unsubscribe");
    assert_eq!(frame["v"], serde_json::json!([5633]));

    let ledger = client.subscriptions();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.mode_of(408_065), Some(Some(Mode::Full)));
    assert!(!ledger.contains(5633));

    client.stop();
    timeout(EVENT_TIMEOUT, handle).await.unwrap().unwrap().unwrap();
}

// =============================================================================
// Text Routing
// =============================================================================

#[tokio::test]
async fn text_frames_route_to_events() {
    let (listener, endpoint) = bind_listener().await;
    let (client, mut events, handle) = spawn_client(test_config(&endpoint));

    let mut server = accept_socket(&listener).await;
    assert!(matches!(next_event(&mut events).await, TickerEvent::Connected));

    let order = r#"{"type":"order","data":{"order_id":"151220000000000","status":"COMPLETE","tradingsymbol":"SBIN","filled_quantity":5}}"#;
    server.send(Message::Text(order.into())).await.unwrap();
    match next_event(&mut events).await {
        TickerEvent::OrderUpdate(postback) => {
            assert_eq!(postback.order_id, "151220000000000");
            assert_eq!(postback.trading_symbol, "SBIN");
            assert_eq!(postback.filled_quantity, 5);
        }
        other => panic!("expected order update, got {other:?}"),
    }

    let notice = r#"{"type":"message","data":"exchange going down for maintenance"}"#;
    server.send(Message::Text(notice.into())).await.unwrap();
    match next_event(&mut events).await {
        TickerEvent::Message(raw) => assert_eq!(raw, notice),
        other => panic!("expected notice, got {other:?}"),
    }

    let error = r#"{"type":"error","data":"invalid access token"}"#;
    server.send(Message::Text(error.into())).await.unwrap();
    match next_event(&mut events).await {
        TickerEvent::Error { code, message } => {
            assert_eq!(code, 0);
            assert_eq!(message, "invalid access token");
        }
        other => panic!("expected error event, got {other:?}"),
    }

    // unknown types are dropped without an event
    let unknown = r#"{"type":"promo","data":"upgrade now"}"#;
    server.send(Message::Text(unknown.into())).await.unwrap();
    server.send(Message::Text(notice.into())).await.unwrap();
    assert!(matches!(next_event(&mut events).await, TickerEvent::Message(_)));

    client.stop();
    timeout(EVENT_TIMEOUT, handle).await.unwrap().unwrap().unwrap();
}

// =============================================================================
// Close Classification and Reconnection
// =============================================================================

#[tokio::test]
async fn abnormal_close_reconnects_and_resubscribes() {
    let (listener, endpoint) = bind_listener().await;
    let mut config = test_config(&endpoint);
    config.enable_reconnect = true;
    config.reconnect = fast_reconnect();
    let (client, mut events, handle) = spawn_client(config);

    let mut server = accept_socket(&listener).await;
    assert!(matches!(next_event(&mut events).await, TickerEvent::Connected));

    client.set_mode(Mode::Ltp, &[100]).unwrap();
    client.set_mode(Mode::Quote, &[200]).unwrap();
    client.subscribe(&[300]).unwrap();
    client.set_mode(Mode::Full, &[400]).unwrap();
    for _ in 0..4 {
        let _ = next_text_frame(&mut server).await;
    }

    close_server(server, 1011, "server restart").await;

    match next_event(&mut events).await {
        TickerEvent::Error { code, .. } => assert_eq!(code, 1011),
        other => panic!("expected error before close, got {other:?}"),
    }
    match next_event(&mut events).await {
        TickerEvent::Closed { code, .. } => assert_eq!(code, 1011),
        other => panic!("expected close event, got {other:?}"),
    }
    match next_event(&mut events).await {
        TickerEvent::TryReconnect { attempt } => assert_eq!(attempt, 1),
        other => panic!("expected reconnect attempt, got {other:?}"),
    }

    // the client reconnects and replays the ledger as one request per mode
    let mut server = accept_socket(&listener).await;

    let frame = next_text_frame(&mut server).await;
    assert_eq!(frame["a"], "mode");
    assert_eq!(frame["v"], serde_json::json!(["ltp", [100]]));

    let frame = next_text_frame(&mut server).await;
    assert_eq!(frame["v"][0], "quote");
    let mut quote_tokens: Vec<i64> = frame["v"][1]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect();
    quote_tokens.sort_unstable();
    assert_eq!(quote_tokens, vec![200, 300]); // mode-less entry promoted to quote

    let frame = next_text_frame(&mut server).await;
    assert_eq!(frame["v"], serde_json::json!(["full", [400]]));

    assert!(matches!(next_event(&mut events).await, TickerEvent::Connected));
    assert_eq!(client.subscriptions().len(), 4);
    assert!(!client.is_reconnecting());

    client.stop();
    timeout(EVENT_TIMEOUT, handle).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn clean_close_never_reconnects() {
    let (listener, endpoint) = bind_listener().await;
    let mut config = test_config(&endpoint);
    config.enable_reconnect = true;
    config.reconnect = fast_reconnect();
    let (client, mut events, handle) = spawn_client(config);

    let server = accept_socket(&listener).await;
    assert!(matches!(next_event(&mut events).await, TickerEvent::Connected));

    close_server(server, 1000, "bye").await;

    // clean close: close event only, no error, no reconnect
    match next_event(&mut events).await {
        TickerEvent::Closed { code, reason } => {
            assert_eq!(code, 1000);
            assert_eq!(reason, "bye");
        }
        other => panic!("expected close event, got {other:?}"),
    }

    timeout(EVENT_TIMEOUT, handle).await.unwrap().unwrap().unwrap();
    assert_eq!(client.state(), ConnectionState::Idle);

    // no further connection attempt arrives
    assert!(
        timeout(Duration::from_millis(300), listener.accept())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn abnormal_close_without_reconnect_fails() {
    let (listener, endpoint) = bind_listener().await;
    let (client, mut events, handle) = spawn_client(test_config(&endpoint));

    let server = accept_socket(&listener).await;
    assert!(matches!(next_event(&mut events).await, TickerEvent::Connected));

    close_server(server, 1011, "going away").await;

    match next_event(&mut events).await {
        TickerEvent::Error { code, .. } => assert_eq!(code, 1011),
        other => panic!("expected error event, got {other:?}"),
    }
    assert!(matches!(next_event(&mut events).await, TickerEvent::Closed { .. }));

    let result = timeout(EVENT_TIMEOUT, handle).await.unwrap().unwrap();
    assert!(matches!(result, Err(TickerClientError::ConnectionClosed)));
    assert_eq!(client.state(), ConnectionState::Failed);
}

#[tokio::test]
async fn reconnect_exhaustion_gives_up_after_max_tries() {
    // bind then drop so every connect is refused
    let (listener, endpoint) = bind_listener().await;
    drop(listener);

    let mut config = test_config(&endpoint);
    config.enable_reconnect = true;
    config.reconnect = ReconnectConfig::new(
        Duration::from_millis(10),
        Duration::from_millis(40),
        2.0,
        2,
    );
    let (client, mut events, handle) = spawn_client(config);

    assert!(matches!(
        next_event(&mut events).await,
        TickerEvent::ConnectError { .. }
    ));
    match next_event(&mut events).await {
        TickerEvent::TryReconnect { attempt } => assert_eq!(attempt, 1),
        other => panic!("expected first retry, got {other:?}"),
    }
    assert!(matches!(
        next_event(&mut events).await,
        TickerEvent::ConnectError { .. }
    ));
    match next_event(&mut events).await {
        TickerEvent::TryReconnect { attempt } => assert_eq!(attempt, 2),
        other => panic!("expected second retry, got {other:?}"),
    }
    assert!(matches!(
        next_event(&mut events).await,
        TickerEvent::ConnectError { .. }
    ));
    assert!(matches!(next_event(&mut events).await, TickerEvent::ReconnectFail));

    let result = timeout(EVENT_TIMEOUT, handle).await.unwrap().unwrap();
    assert!(matches!(result, Err(TickerClientError::ReconnectExhausted)));
    assert_eq!(client.state(), ConnectionState::Failed);
    assert!(!client.is_reconnecting());
}

#[tokio::test]
async fn stop_cancels_a_sleeping_backoff() {
    let (listener, endpoint) = bind_listener().await;
    drop(listener);

    let mut config = test_config(&endpoint);
    config.enable_reconnect = true;
    config.reconnect = ReconnectConfig::new(
        Duration::from_secs(60),
        Duration::from_secs(60),
        2.0,
        5,
    );
    let (client, mut events, handle) = spawn_client(config);

    assert!(matches!(
        next_event(&mut events).await,
        TickerEvent::ConnectError { .. }
    ));

    // the client is now asleep in backoff; stop must not wait it out
    client.stop();
    let result = timeout(Duration::from_secs(2), handle)
        .await
        .expect("stop should cancel the pending backoff")
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(client.state(), ConnectionState::Idle);
}
