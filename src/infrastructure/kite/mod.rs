//! Kite WebSocket Adapters
//!
//! Implements the client for the quote server's WebSocket feed:
//!
//! - **wire / binary**: big-endian frame splitting and tick decoding
//! - **codec / messages**: JSON text frames (postbacks, notices, errors,
//!   outbound requests)
//! - **client**: connection lifecycle, heartbeats, reconnection,
//!   resubscription

pub mod binary;
pub mod client;
pub mod codec;
pub mod heartbeat;
pub mod messages;
pub mod reconnect;
pub mod wire;

pub use binary::{decode_packet, decode_ticks};
pub use client::{ConnectionState, TickerClient, TickerClientError, TickerEvent};
pub use codec::{CodecError, TextCodec};
pub use heartbeat::{HeartbeatState, KEEPALIVE_INTERVAL};
pub use messages::{Postback, TextMessage, TickerRequest};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use wire::{split_packets, WireError};
