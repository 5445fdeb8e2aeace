//! Ticker WebSocket Client
//!
//! Connects to the quote server's WebSocket feed for real-time market data
//! and order postbacks.
//!
//! # Connect URL
//!
//! `wss://ws.kite.trade/?api_key={api_key}&access_token={access_token}`
//!
//! # Protocol
//!
//! Binary frames carry batched tick packets (single-byte frames are server
//! heartbeats); text frames carry JSON control messages. Outbound requests
//! are JSON text frames.
//!
//! The client owns the connection lifecycle: connect, keep-alive pings,
//! close classification, exponential-backoff reconnection, and restoring
//! held subscriptions at their prior modes after a reconnect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::domain::subscription::{ResubscriptionBatches, SubscriptionLedger};
use crate::domain::tick::{Mode, Tick};
use crate::infrastructure::config::{Credentials, TickerConfig};

use super::binary::decode_ticks;
use super::codec::{CodecError, TextCodec};
use super::heartbeat::{HeartbeatState, KEEPALIVE_INTERVAL};
use super::messages::{Postback, TextMessage, TickerRequest};
use super::reconnect::ReconnectPolicy;

/// Close code for a clean, host-requested or server-requested shutdown.
const CLEAN_CLOSE_CODE: u16 = 1000;

/// Close code reported for transport-level failures without a close frame.
const ABNORMAL_CLOSE_CODE: u16 = 1006;

/// Close code reported when a close frame carried no status.
const NO_STATUS_CLOSE_CODE: u16 = 1005;

// =============================================================================
// Error Type
// =============================================================================

/// Errors that can occur in the ticker client.
#[derive(Debug, thiserror::Error)]
pub enum TickerClientError {
    /// An operation required a live connection.
    #[error("not connected to the quote server")]
    NotConnected,

    /// A connection attempt failed or timed out.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The connection was closed by the server or the network.
    #[error("connection closed")]
    ConnectionClosed,

    /// Maximum reconnection attempts exceeded.
    #[error("maximum reconnection attempts exceeded")]
    ReconnectExhausted,
}

// =============================================================================
// Connection State
// =============================================================================

/// Lifecycle state of the connection controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection and none pending.
    #[default]
    Idle,
    /// First connection attempt in flight.
    Connecting,
    /// Live connection established.
    Connected,
    /// Waiting out a backoff delay or retrying.
    Reconnecting,
    /// Gave up: reconnection disabled or attempts exhausted.
    Failed,
}

// =============================================================================
// Ticker Events
// =============================================================================

/// Events emitted by the ticker client.
///
/// Each variant corresponds to one host callback slot; hosts ignore
/// variants they do not care about.
#[derive(Debug, Clone)]
pub enum TickerEvent {
    /// Connected, with prior subscriptions already replayed on the wire.
    Connected,
    /// A batch of decoded ticks, one per packet, in frame order.
    Ticks(Vec<Tick>),
    /// An order postback.
    OrderUpdate(Box<Postback>),
    /// A human-readable notice, as raw frame text.
    Message(String),
    /// A transport or server error. `code` is the close code, or 0 for
    /// server-sent error frames.
    Error {
        /// Close code or 0.
        code: u16,
        /// Error description.
        message: String,
    },
    /// A connection attempt failed before the socket opened.
    ConnectError {
        /// Failure description.
        message: String,
    },
    /// A reconnection attempt is about to be made.
    TryReconnect {
        /// 1-based attempt number.
        attempt: u32,
    },
    /// Reconnection attempts are exhausted; the client gives up.
    ReconnectFail,
    /// The connection closed.
    Closed {
        /// WebSocket close code.
        code: u16,
        /// Close reason, possibly empty.
        reason: String,
    },
}

// =============================================================================
// Ticker Client
// =============================================================================

/// WebSocket client for the market data feed.
///
/// Manages the connection lifecycle including:
/// - Credentialed connect with timeout
/// - Keep-alive pings and heartbeat tracking
/// - Close classification and automatic reconnection with exponential backoff
/// - Deterministic resubscription from the subscription ledger
pub struct TickerClient {
    config: TickerConfig,
    credentials: RwLock<Credentials>,
    ledger: RwLock<SubscriptionLedger>,
    heartbeat: HeartbeatState,
    codec: TextCodec,
    state: RwLock<ConnectionState>,
    reconnecting: AtomicBool,
    /// Sender into the live connection's write pump. Presence is the ground
    /// truth for [`Self::is_connected`].
    wire: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    event_tx: mpsc::Sender<TickerEvent>,
    cancel: CancellationToken,
}

impl TickerClient {
    /// Create a new ticker client.
    #[must_use]
    pub fn new(
        config: TickerConfig,
        event_tx: mpsc::Sender<TickerEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let credentials = config.credentials.clone();
        Self {
            config,
            credentials: RwLock::new(credentials),
            ledger: RwLock::new(SubscriptionLedger::new()),
            heartbeat: HeartbeatState::new(),
            codec: TextCodec::new(),
            state: RwLock::new(ConnectionState::Idle),
            reconnecting: AtomicBool::new(false),
            wire: Mutex::new(None),
            event_tx,
            cancel,
        }
    }

    /// Replace the API key. Takes effect on the next connect attempt.
    pub fn set_api_key(&self, api_key: impl Into<String>) {
        self.credentials.write().set_api_key(api_key);
    }

    /// Get the current API key.
    #[must_use]
    pub fn api_key(&self) -> String {
        self.credentials.read().api_key().to_string()
    }

    /// Replace the access token. Takes effect on the next connect attempt.
    pub fn set_access_token(&self, access_token: impl Into<String>) {
        self.credentials.write().set_access_token(access_token);
    }

    /// Get the current access token.
    #[must_use]
    pub fn access_token(&self) -> String {
        self.credentials.read().access_token().to_string()
    }

    /// Check whether a connection is currently live.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.wire.lock().is_some()
    }

    /// Check whether a reconnection cycle is in progress.
    #[must_use]
    pub fn is_reconnecting(&self) -> bool {
        self.reconnecting.load(Ordering::SeqCst)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Wall-clock time of the last server heartbeat. Use together with
    /// [`Self::is_connected`] to judge feed health.
    #[must_use]
    pub fn last_beat_time(&self) -> DateTime<Utc> {
        self.heartbeat.last_beat_time()
    }

    /// Snapshot of the subscription ledger.
    #[must_use]
    pub fn subscriptions(&self) -> SubscriptionLedger {
        self.ledger.read().clone()
    }

    /// Request a shutdown: closes the live connection if any and cancels a
    /// pending reconnection backoff.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Subscribe instrument tokens.
    ///
    /// The tokens are recorded in the ledger without an explicit mode; the
    /// server streams them at quote detail until a mode is set.
    ///
    /// # Errors
    ///
    /// Returns [`TickerClientError::NotConnected`] when no connection is
    /// live; the ledger is left untouched in that case.
    pub fn subscribe(&self, instrument_tokens: &[i32]) -> Result<(), TickerClientError> {
        self.send_request(&TickerRequest::subscribe(instrument_tokens.to_vec()))?;
        self.ledger.write().subscribe(instrument_tokens);
        Ok(())
    }

    /// Unsubscribe instrument tokens.
    ///
    /// # Errors
    ///
    /// Returns [`TickerClientError::NotConnected`] when no connection is
    /// live; the ledger is left untouched in that case.
    pub fn unsubscribe(&self, instrument_tokens: &[i32]) -> Result<(), TickerClientError> {
        self.send_request(&TickerRequest::unsubscribe(instrument_tokens.to_vec()))?;
        self.ledger.write().unsubscribe(instrument_tokens);
        Ok(())
    }

    /// Set the streaming mode of instrument tokens.
    ///
    /// # Errors
    ///
    /// Returns [`TickerClientError::NotConnected`] when no connection is
    /// live; the ledger is left untouched in that case.
    pub fn set_mode(
        &self,
        mode: Mode,
        instrument_tokens: &[i32],
    ) -> Result<(), TickerClientError> {
        self.send_request(&TickerRequest::set_mode(mode, instrument_tokens.to_vec()))?;
        self.ledger.write().set_mode(mode, instrument_tokens);
        Ok(())
    }

    /// Run the client: connect and process the feed until stopped, cleanly
    /// closed, or failed.
    ///
    /// Frames are processed strictly in receive order and events never
    /// interleave: each event is delivered before the next frame is handled.
    ///
    /// # Errors
    ///
    /// Returns an error when the connection fails with reconnection
    /// disabled, or after exhausting reconnection attempts.
    pub async fn run(self: Arc<Self>) -> Result<(), TickerClientError> {
        let mut policy = ReconnectPolicy::new(self.config.reconnect.clone());
        *self.state.write() = ConnectionState::Connecting;

        loop {
            if self.cancel.is_cancelled() {
                *self.state.write() = ConnectionState::Idle;
                return Ok(());
            }

            match self.connect_and_run(&mut policy).await {
                Ok(()) => {
                    tracing::info!("ticker connection closed");
                    *self.state.write() = ConnectionState::Idle;
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(error = %e, "ticker connection error");

                    if !self.config.enable_reconnect {
                        *self.state.write() = ConnectionState::Failed;
                        return Err(e);
                    }

                    if let Some(delay) = policy.next_delay() {
                        self.reconnecting.store(true, Ordering::SeqCst);
                        *self.state.write() = ConnectionState::Reconnecting;

                        let attempt = policy.attempt_count();
                        tracing::info!(
                            attempt,
                            delay_ms = delay.as_millis(),
                            "reconnecting to ticker endpoint"
                        );

                        tokio::select! {
                            () = self.cancel.cancelled() => {
                                *self.state.write() = ConnectionState::Idle;
                                return Ok(());
                            }
                            () = tokio::time::sleep(delay) => {}
                        }

                        self.emit(TickerEvent::TryReconnect { attempt }).await;
                    } else {
                        self.emit(TickerEvent::ReconnectFail).await;
                        self.reconnecting.store(false, Ordering::SeqCst);
                        *self.state.write() = ConnectionState::Failed;
                        return Err(TickerClientError::ReconnectExhausted);
                    }
                }
            }
        }
    }

    /// Connect and process frames until close, error, or cancellation.
    ///
    /// Returns `Ok(())` only for a clean close (code 1000) or cancellation;
    /// every other outcome is an error so the caller can decide on
    /// reconnection.
    async fn connect_and_run(
        &self,
        policy: &mut ReconnectPolicy,
    ) -> Result<(), TickerClientError> {
        let url = {
            let credentials = self.credentials.read();
            self.config.connect_url(&credentials)
        };
        tracing::info!(endpoint = %self.config.endpoint, "connecting to ticker endpoint");

        let connect = tokio_tungstenite::connect_async(url);
        let (ws_stream, _response) =
            match tokio::time::timeout(self.config.connect_timeout, connect).await {
                Ok(Ok(connected)) => connected,
                Ok(Err(e)) => {
                    self.emit(TickerEvent::ConnectError {
                        message: e.to_string(),
                    })
                    .await;
                    return Err(e.into());
                }
                Err(_) => {
                    let message = format!(
                        "connect timed out after {:?}",
                        self.config.connect_timeout
                    );
                    self.emit(TickerEvent::ConnectError {
                        message: message.clone(),
                    })
                    .await;
                    return Err(TickerClientError::ConnectionFailed(message));
                }
            };

        let (mut write, mut read) = ws_stream.split();
        let (wire_tx, mut wire_rx) = mpsc::unbounded_channel::<Message>();

        // The open path: expose the wire, reset backoff state, replay the
        // ledger, and only then tell the host it is connected.
        *self.wire.lock() = Some(wire_tx);
        policy.reset();
        self.reconnecting.store(false, Ordering::SeqCst);
        *self.state.write() = ConnectionState::Connected;
        self.heartbeat.reset();

        let replay = {
            let ledger = self.ledger.read();
            if ledger.is_empty() {
                None
            } else {
                Some(ledger.resubscription_batches())
            }
        };
        if let Some(batches) = replay {
            if let Err(e) = self.replay_subscriptions(&batches) {
                *self.wire.lock() = None;
                return Err(e);
            }
        }
        self.emit(TickerEvent::Connected).await;

        let mut keepalive = tokio::time::interval(KEEPALIVE_INTERVAL);
        keepalive.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let result = loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    let _ = write
                        .send(Message::Close(Some(CloseFrame {
                            code: CloseCode::Normal,
                            reason: "client stopped".into(),
                        })))
                        .await;
                    self.emit(TickerEvent::Closed {
                        code: CLEAN_CLOSE_CODE,
                        reason: "client stopped".to_string(),
                    })
                    .await;
                    break Ok(());
                }
                _ = keepalive.tick() => {
                    if let Err(e) = write.send(Message::Ping(Vec::new().into())).await {
                        break Err(e.into());
                    }
                }
                outbound = wire_rx.recv() => {
                    match outbound {
                        Some(message) => {
                            if let Err(e) = write.send(message).await {
                                break Err(e.into());
                            }
                        }
                        None => break Err(TickerClientError::ConnectionClosed),
                    }
                }
                inbound = read.next() => {
                    match inbound {
                        Some(Ok(Message::Binary(data))) => {
                            self.handle_binary_frame(&data).await;
                        }
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text_frame(&text).await;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            self.heartbeat.record_pong();
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            let _ = write.send(Message::Pong(payload)).await;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            break self.classify_close(frame).await;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            let message = e.to_string();
                            self.emit(TickerEvent::Error {
                                code: ABNORMAL_CLOSE_CODE,
                                message: message.clone(),
                            })
                            .await;
                            self.emit(TickerEvent::Closed {
                                code: ABNORMAL_CLOSE_CODE,
                                reason: message,
                            })
                            .await;
                            break Err(e.into());
                        }
                        None => {
                            self.emit(TickerEvent::Error {
                                code: ABNORMAL_CLOSE_CODE,
                                message: "connection reset".to_string(),
                            })
                            .await;
                            self.emit(TickerEvent::Closed {
                                code: ABNORMAL_CLOSE_CODE,
                                reason: "connection reset".to_string(),
                            })
                            .await;
                            break Err(TickerClientError::ConnectionClosed);
                        }
                    }
                }
            }
        };

        *self.wire.lock() = None;
        result
    }

    /// Classify a close frame: code 1000 is clean, everything else is an
    /// error that may trigger reconnection.
    async fn classify_close(
        &self,
        frame: Option<CloseFrame>,
    ) -> Result<(), TickerClientError> {
        let (code, reason) = frame.map_or_else(
            || (NO_STATUS_CLOSE_CODE, String::new()),
            |f| (u16::from(f.code), f.reason.to_string()),
        );

        if code == CLEAN_CLOSE_CODE {
            tracing::info!("server closed the connection cleanly");
            self.emit(TickerEvent::Closed { code, reason }).await;
            Ok(())
        } else {
            tracing::warn!(code, reason = %reason, "server closed the connection");
            self.emit(TickerEvent::Error {
                code,
                message: reason.clone(),
            })
            .await;
            self.emit(TickerEvent::Closed { code, reason }).await;
            Err(TickerClientError::ConnectionClosed)
        }
    }

    /// Handle an inbound binary frame: heartbeat or tick batch.
    async fn handle_binary_frame(&self, data: &[u8]) {
        if data.len() == 1 {
            self.heartbeat.record_beat();
            return;
        }

        match decode_ticks(data) {
            Ok(ticks) => {
                self.emit(TickerEvent::Ticks(ticks)).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, len = data.len(), "dropping malformed binary frame");
            }
        }
    }

    /// Handle an inbound text frame: order postback, notice, or error.
    async fn handle_text_frame(&self, text: &str) {
        match self.codec.decode(text) {
            Ok(TextMessage::Order(postback)) => {
                self.emit(TickerEvent::OrderUpdate(postback)).await;
            }
            Ok(TextMessage::Notice(raw)) => {
                self.emit(TickerEvent::Message(raw)).await;
            }
            Ok(TextMessage::Error(message)) => {
                self.emit(TickerEvent::Error { code: 0, message }).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "dropping unrecognized text frame");
            }
        }
    }

    /// Replay the ledger's per-mode batches as mode requests.
    fn replay_subscriptions(
        &self,
        batches: &ResubscriptionBatches,
    ) -> Result<(), TickerClientError> {
        tracing::info!(
            ltp = batches.ltp.len(),
            quote = batches.quote.len(),
            full = batches.full.len(),
            "restoring subscriptions"
        );

        if !batches.ltp.is_empty() {
            self.send_request(&TickerRequest::set_mode(Mode::Ltp, batches.ltp.clone()))?;
        }
        if !batches.quote.is_empty() {
            self.send_request(&TickerRequest::set_mode(Mode::Quote, batches.quote.clone()))?;
        }
        if !batches.full.is_empty() {
            self.send_request(&TickerRequest::set_mode(Mode::Full, batches.full.clone()))?;
        }
        Ok(())
    }

    /// Queue a request on the live connection's write pump.
    fn send_request(&self, request: &TickerRequest) -> Result<(), TickerClientError> {
        let json = request.to_json().map_err(CodecError::Json)?;

        let wire = self.wire.lock();
        let Some(tx) = wire.as_ref() else {
            return Err(TickerClientError::NotConnected);
        };
        tx.send(Message::Text(json.into()))
            .map_err(|_| TickerClientError::NotConnected)
    }

    /// Deliver an event to the host; absent receivers are skipped silently.
    async fn emit(&self, event: TickerEvent) {
        let _ = self.event_tx.send(event).await;
    }
}
