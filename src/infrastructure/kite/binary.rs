//! Binary Tick Decoder
//!
//! Decodes the feed's compact binary packets into [`Tick`] records. Packet
//! shape is selected by packet length; every multi-byte field is big-endian.
//!
//! # Packet shapes
//!
//! | Length | Shape |
//! |--------|-------|
//! | 8      | LTP: token, last price |
//! | 28     | index quote: last, high, low, open, close, net change |
//! | 32     | index full: index quote plus exchange timestamp |
//! | 44     | quote: last, traded-volume summary, OHLC |
//! | 184    | full: quote plus trade time, OI, timestamp, 10 depth levels |
//!
//! Packets of any other length decode to a default tick carrying only the
//! token and tradability, so a new server-side shape never poisons the rest
//! of the frame.
//!
//! Raw prices are `i32` values scaled by a segment-dependent divisor:
//! currency derivatives (cds) quote in 1/10^7 units, everything else in
//! paise (1/100).

use crate::domain::tick::{segment_code, DepthEntry, Mode, Segment, Tick};

use super::wire::{read_i16, read_i32, split_packets, WireError};

/// Price divisor for currency-derivative instruments.
const CDS_PRICE_DIVISOR: f64 = 10_000_000.0;

/// Price divisor for every other segment.
const DEFAULT_PRICE_DIVISOR: f64 = 100.0;

/// LTP packet length.
const LTP_LEN: usize = 8;
/// Index quote packet length.
const INDEX_QUOTE_LEN: usize = 28;
/// Index full packet length.
const INDEX_FULL_LEN: usize = 32;
/// Quote packet length.
const QUOTE_LEN: usize = 44;
/// Full packet length.
const FULL_LEN: usize = 184;

/// Offset of the first depth entry in a full packet.
const DEPTH_START: usize = 64;
/// Bytes per depth entry (4 quantity + 4 price + 2 orders + 2 padding).
const DEPTH_ENTRY_LEN: usize = 12;
/// Depth entries per packet; the first half are bids, the rest asks.
const DEPTH_ENTRIES: usize = 10;

/// Decode a complete binary frame into ticks, one per packet.
///
/// # Errors
///
/// Returns [`WireError`] when the frame header is malformed or a packet is
/// too short for the shape its length selects.
pub fn decode_ticks(frame: &[u8]) -> Result<Vec<Tick>, WireError> {
    split_packets(frame)?
        .into_iter()
        .map(decode_packet)
        .collect()
}

/// Decode a single tick packet.
///
/// # Errors
///
/// Returns [`WireError`] when the packet cannot hold the fields its length
/// implies (which only happens for packets shorter than the 4-byte token).
pub fn decode_packet(packet: &[u8]) -> Result<Tick, WireError> {
    let instrument_token = read_i32(packet, 0)?;
    let segment = segment_code(instrument_token);
    let divisor = if segment == Segment::Cds.code() {
        CDS_PRICE_DIVISOR
    } else {
        DEFAULT_PRICE_DIVISOR
    };
    let tradable = segment != Segment::Indices.code();

    let mut tick = Tick {
        instrument_token,
        tradable,
        ..Tick::default()
    };

    match packet.len() {
        LTP_LEN => {
            tick.mode = Some(Mode::Ltp);
            tick.last_price = price(packet, 4, divisor)?;
        }
        INDEX_QUOTE_LEN | INDEX_FULL_LEN => {
            tick.mode = Some(if packet.len() == INDEX_QUOTE_LEN {
                Mode::Quote
            } else {
                Mode::Full
            });
            tick.last_price = price(packet, 4, divisor)?;
            tick.ohlc.high = price(packet, 8, divisor)?;
            tick.ohlc.low = price(packet, 12, divisor)?;
            tick.ohlc.open = price(packet, 16, divisor)?;
            tick.ohlc.close = price(packet, 20, divisor)?;
            tick.net_change = price(packet, 24, divisor)?;
            if packet.len() == INDEX_FULL_LEN {
                tick.timestamp = read_i32(packet, 28)?;
            }
        }
        QUOTE_LEN | FULL_LEN => {
            tick.mode = Some(if packet.len() == QUOTE_LEN {
                Mode::Quote
            } else {
                Mode::Full
            });
            tick.last_price = price(packet, 4, divisor)?;
            tick.last_traded_quantity = read_i32(packet, 8)?;
            tick.average_trade_price = price(packet, 12, divisor)?;
            tick.volume_traded = read_i32(packet, 16)?;
            tick.total_buy_quantity = read_i32(packet, 20)?;
            tick.total_sell_quantity = read_i32(packet, 24)?;
            tick.ohlc.open = price(packet, 28, divisor)?;
            tick.ohlc.high = price(packet, 32, divisor)?;
            tick.ohlc.low = price(packet, 36, divisor)?;
            tick.ohlc.close = price(packet, 40, divisor)?;
            tick.net_change =
                (tick.last_price - tick.ohlc.close) * 100.0 / tick.ohlc.close;

            if packet.len() == FULL_LEN {
                tick.last_trade_time = read_i32(packet, 44)?;
                tick.oi = read_i32(packet, 48)?;
                tick.oi_day_high = read_i32(packet, 52)?;
                tick.oi_day_low = read_i32(packet, 56)?;
                tick.timestamp = read_i32(packet, 60)?;

                for index in 0..DEPTH_ENTRIES {
                    let offset = DEPTH_START + index * DEPTH_ENTRY_LEN;
                    let entry = DepthEntry {
                        quantity: read_i32(packet, offset)?,
                        price: price(packet, offset + 4, divisor)?,
                        orders: read_i16(packet, offset + 8)?,
                    };
                    if index < DEPTH_ENTRIES / 2 {
                        tick.depth.buy.push(entry);
                    } else {
                        tick.depth.sell.push(entry);
                    }
                }
            }
        }
        _ => {
            // Unrecognized shape: keep token and tradability only.
        }
    }

    Ok(tick)
}

/// Read a raw `i32` price field and apply the segment divisor.
fn price(packet: &[u8], offset: usize, divisor: f64) -> Result<f64, WireError> {
    Ok(f64::from(read_i32(packet, offset)?) / divisor)
}
