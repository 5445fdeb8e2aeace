//! Ticker Wire Message Types
//!
//! Text-frame types for the feed's JSON side: the order postback pushed on
//! order-state changes, the routed inbound text message, and the outbound
//! subscribe/unsubscribe/mode requests.
//!
//! # Inbound wire format
//!
//! ```json
//! { "type": "order" | "message" | "error", "data": <any> }
//! ```
//!
//! # Outbound wire format
//!
//! ```json
//! { "a": "subscribe",   "v": [408065, 5633] }
//! { "a": "unsubscribe", "v": [408065] }
//! { "a": "mode",        "v": ["full", [408065, 5633]] }
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::tick::Mode;

// =============================================================================
// Order Postback
// =============================================================================

/// Server-pushed notification describing an order-state change.
///
/// Every field is optional on the wire; absent fields deserialize to their
/// type's default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Postback {
    /// Broker order ID.
    pub order_id: String,

    /// Exchange-assigned order ID.
    pub exchange_order_id: String,

    /// User who placed the order.
    pub placed_by: String,

    /// Current order status (e.g. "COMPLETE", "REJECTED").
    pub status: String,

    /// Human-readable status detail.
    pub status_message: String,

    /// Instrument symbol the order is for.
    #[serde(rename = "tradingsymbol")]
    pub trading_symbol: String,

    /// Exchange the order was routed to.
    pub exchange: String,

    /// Order type (e.g. "LIMIT", "MARKET").
    pub order_type: String,

    /// "BUY" or "SELL".
    pub transaction_type: String,

    /// Order validity (e.g. "DAY", "IOC").
    pub validity: String,

    /// Margin product the order was placed under.
    pub product: String,

    /// Average fill price.
    pub average_price: f64,

    /// Order price.
    pub price: f64,

    /// Ordered quantity.
    pub quantity: i32,

    /// Quantity filled so far.
    pub filled_quantity: i32,

    /// Quantity still open.
    pub unfilled_quantity: i32,

    /// Trigger price for stop orders.
    pub trigger_price: f64,

    /// Account the order belongs to.
    pub user_id: String,

    /// Broker-side order timestamp.
    pub order_timestamp: String,

    /// Exchange-side update timestamp.
    pub exchange_timestamp: String,

    /// Postback integrity checksum.
    pub checksum: String,
}

// =============================================================================
// Routed Inbound Text Message
// =============================================================================

/// A demultiplexed inbound text frame.
///
/// `Postback` is boxed to keep the enum small; order updates are rare next
/// to notices and errors.
#[derive(Debug, Clone, PartialEq)]
pub enum TextMessage {
    /// An order postback (`type == "order"`).
    Order(Box<Postback>),
    /// A human-readable notice; carries the raw frame text
    /// (`type == "message"`).
    Notice(String),
    /// A server-sent error description (`type == "error"`).
    Error(String),
}

// =============================================================================
// Outbound Requests
// =============================================================================

/// An outbound control request for the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickerRequest {
    /// Subscribe the given instrument tokens.
    Subscribe(Vec<i32>),
    /// Unsubscribe the given instrument tokens.
    Unsubscribe(Vec<i32>),
    /// Set the streaming mode for the given instrument tokens.
    SetMode(Mode, Vec<i32>),
}

impl TickerRequest {
    /// Build a subscribe request.
    #[must_use]
    pub fn subscribe(instrument_tokens: Vec<i32>) -> Self {
        Self::Subscribe(instrument_tokens)
    }

    /// Build an unsubscribe request.
    #[must_use]
    pub fn unsubscribe(instrument_tokens: Vec<i32>) -> Self {
        Self::Unsubscribe(instrument_tokens)
    }

    /// Build a mode request.
    #[must_use]
    pub fn set_mode(mode: Mode, instrument_tokens: Vec<i32>) -> Self {
        Self::SetMode(mode, instrument_tokens)
    }

    /// Serialize the request to its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails (which cannot happen for
    /// well-formed token lists).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let value = match self {
            Self::Subscribe(tokens) => serde_json::json!({ "a": "subscribe", "v": tokens }),
            Self::Unsubscribe(tokens) => serde_json::json!({ "a": "unsubscribe", "v": tokens }),
            Self::SetMode(mode, tokens) => {
                serde_json::json!({ "a": "mode", "v": [mode.as_str(), tokens] })
            }
        };
        serde_json::to_string(&value)
    }
}
