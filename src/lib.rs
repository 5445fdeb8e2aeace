#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines
    )
)]

//! Kite Ticker - Market Data Streaming Client
//!
//! An async WebSocket client for the Kite Connect quote feed. Maintains a
//! persistent connection to the quote server, subscribes sets of instruments
//! at selectable detail levels, decodes the compact binary tick format into
//! structured records, and delivers them to the host as events.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: transport-free market data types
//!   - `tick`: tick records, modes, segments
//!   - `subscription`: the subscription ledger driving resubscription
//!
//! - **Infrastructure**: adapters and external integrations
//!   - `kite`: binary/text codecs and the WebSocket client
//!   - `config`: configuration and environment loading
//!   - `telemetry`: tracing initialization
//!
//! # Data Flow
//!
//! ```text
//! quote server WS ──binary──▶ splitter ──▶ tick decoder ──▶ Ticks event
//!                 ──text────▶ text codec ─▶ order/notice/error events
//!                 ◀──JSON──── subscribe / unsubscribe / mode requests
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use kite_ticker::{Credentials, TickerClient, TickerConfig, TickerEvent};
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let mut config = TickerConfig::new(Credentials::new("api_key", "access_token"));
//! config.enable_reconnect = true;
//!
//! let (event_tx, mut event_rx) = mpsc::channel(1024);
//! let client = Arc::new(TickerClient::new(config, event_tx, CancellationToken::new()));
//!
//! tokio::spawn(Arc::clone(&client).run());
//!
//! while let Some(event) = event_rx.recv().await {
//!     match event {
//!         TickerEvent::Connected => client.subscribe(&[408_065]).unwrap(),
//!         TickerEvent::Ticks(ticks) => println!("{} ticks", ticks.len()),
//!         _ => {}
//!     }
//! }
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - core market data types with no transport dependencies.
pub mod domain;

/// Infrastructure layer - adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::subscription::{ResubscriptionBatches, SubscriptionLedger};
pub use domain::tick::{segment_code, DepthEntry, MarketDepth, Mode, Ohlc, Segment, Tick};

// Infrastructure config
pub use infrastructure::config::{ConfigError, Credentials, TickerConfig};

// Feed adapters
pub use infrastructure::kite::{
    decode_packet, decode_ticks, split_packets, CodecError, ConnectionState, HeartbeatState,
    Postback, ReconnectConfig, ReconnectPolicy, TextCodec, TextMessage, TickerClient,
    TickerClientError, TickerEvent, TickerRequest, WireError,
};
