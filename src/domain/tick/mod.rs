//! Market Data Tick Types
//!
//! Domain types for decoded market data observations. A [`Tick`] is one
//! structured observation for a single instrument at a single instant,
//! produced from the exchange's compact binary packet format.
//!
//! # Instrument tokens and segments
//!
//! Instrument tokens are 32-bit exchange identifiers whose low 8 bits encode
//! the market [`Segment`]. The segment determines the price divisor applied
//! to raw integer prices (currency derivatives quote at a finer resolution)
//! and whether the instrument is tradable (index pseudo-instruments are not).

use serde::{Deserialize, Serialize};

// =============================================================================
// Subscription Mode
// =============================================================================

/// Subscription detail level for an instrument.
///
/// Determines which packet shape the server streams for the instrument:
///
/// - [`Mode::Ltp`]: last traded price only
/// - [`Mode::Quote`]: OHLC plus traded-volume summary
/// - [`Mode::Full`]: quote plus market depth, open interest, and timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Last traded price only.
    Ltp,
    /// OHLC and summary fields.
    Quote,
    /// Quote plus depth, open interest, and timestamps.
    Full,
}

impl Mode {
    /// Wire name of the mode, as sent in mode requests.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ltp => "ltp",
            Self::Quote => "quote",
            Self::Full => "full",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Market Segment
// =============================================================================

/// Exchange/market subdivision encoded in the low 8 bits of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Segment {
    /// National Stock Exchange equities.
    Nse = 1,
    /// NSE futures and options.
    Nfo = 2,
    /// Currency derivatives.
    Cds = 3,
    /// Bombay Stock Exchange equities.
    Bse = 4,
    /// BSE futures and options.
    Bfo = 5,
    /// BSE currency derivatives.
    BseCds = 6,
    /// Multi Commodity Exchange.
    Mcx = 7,
    /// MCX stock exchange.
    McxSx = 8,
    /// Index pseudo-instruments (not tradable).
    Indices = 9,
}

impl Segment {
    /// Numeric segment code carried on the wire.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Look up a segment by its numeric code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Nse),
            2 => Some(Self::Nfo),
            3 => Some(Self::Cds),
            4 => Some(Self::Bse),
            5 => Some(Self::Bfo),
            6 => Some(Self::BseCds),
            7 => Some(Self::Mcx),
            8 => Some(Self::McxSx),
            9 => Some(Self::Indices),
            _ => None,
        }
    }

    /// Segment name as used in instrument listings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nse => "nse",
            Self::Nfo => "nfo",
            Self::Cds => "cds",
            Self::Bse => "bse",
            Self::Bfo => "bfo",
            Self::BseCds => "bsecds",
            Self::Mcx => "mcx",
            Self::McxSx => "mcxsx",
            Self::Indices => "indices",
        }
    }
}

/// Extract the segment code from an instrument token.
///
/// The code is the low 8 bits of the token. Codes outside the known
/// [`Segment`] table are valid on the wire and decode with default pricing.
#[must_use]
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub const fn segment_code(instrument_token: i32) -> u8 {
    (instrument_token & 0xff) as u8
}

// =============================================================================
// Tick Record
// =============================================================================

/// Open/high/low/close price summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Ohlc {
    /// Opening price.
    pub open: f64,
    /// Day-high price.
    pub high: f64,
    /// Day-low price.
    pub low: f64,
    /// Previous close price.
    pub close: f64,
}

/// One level of the order book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DepthEntry {
    /// Quantity available at this level.
    pub quantity: i32,
    /// Price at this level.
    pub price: f64,
    /// Number of resting orders at this level.
    pub orders: i16,
}

/// Order-book snapshot: five bid levels and five ask levels.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarketDepth {
    /// Bid levels, best first.
    pub buy: Vec<DepthEntry>,
    /// Ask levels, best first.
    pub sell: Vec<DepthEntry>,
}

/// A decoded market data observation for one instrument.
///
/// Fields not defined by the packet's mode are left at their type's zero
/// value; `mode` itself is `None` for packets of unrecognized length, which
/// carry only the token and tradability.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Tick {
    /// Detail level the packet was encoded at.
    pub mode: Option<Mode>,
    /// 32-bit instrument identifier.
    pub instrument_token: i32,
    /// Whether the instrument is tradable (false for indices).
    pub tradable: bool,
    /// Last traded price.
    pub last_price: f64,
    /// Open/high/low/close summary.
    pub ohlc: Ohlc,
    /// Change versus previous close, in percent.
    pub net_change: f64,
    /// Quantity of the last trade.
    pub last_traded_quantity: i32,
    /// Volume-weighted average trade price.
    pub average_trade_price: f64,
    /// Total volume traded today.
    pub volume_traded: i32,
    /// Total pending buy quantity.
    pub total_buy_quantity: i32,
    /// Total pending sell quantity.
    pub total_sell_quantity: i32,
    /// Epoch seconds of the last trade.
    pub last_trade_time: i32,
    /// Open interest.
    pub oi: i32,
    /// Day-high open interest.
    pub oi_day_high: i32,
    /// Day-low open interest.
    pub oi_day_low: i32,
    /// Exchange timestamp, epoch seconds.
    pub timestamp: i32,
    /// Order-book depth (FULL mode only).
    pub depth: MarketDepth,
}
