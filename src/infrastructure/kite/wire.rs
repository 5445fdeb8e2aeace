//! Binary Wire Primitives
//!
//! Fixed-width big-endian integer reads and the frame-to-packet splitter.
//! The feed is big-endian regardless of host endianness, so every multi-byte
//! field goes through an explicit big-endian read rather than a cast.
//!
//! # Frame layout
//!
//! ```text
//! [i16 packet count] ([i16 length] [length bytes of packet]) * count
//! ```
//!
//! Single-byte frames are heartbeats and are handled by the connection
//! controller before the splitter ever sees them.

use thiserror::Error;

/// Errors produced while reading binary frames.
#[derive(Debug, Error)]
pub enum WireError {
    /// A fixed-width read extended past the end of the buffer.
    #[error("read of {width} bytes at offset {offset} exceeds buffer length {len}")]
    OutOfBounds {
        /// Absolute offset the read started at.
        offset: usize,
        /// Width of the attempted read.
        width: usize,
        /// Total buffer length.
        len: usize,
    },

    /// The frame header did not match the frame's actual size.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
}

/// Take `N` bytes at `offset`, checking bounds.
fn read_fixed<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N], WireError> {
    let end = offset.checked_add(N).ok_or(WireError::OutOfBounds {
        offset,
        width: N,
        len: buf.len(),
    })?;
    let bytes = buf.get(offset..end).ok_or(WireError::OutOfBounds {
        offset,
        width: N,
        len: buf.len(),
    })?;
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}

/// Read an unsigned byte at `offset`.
///
/// # Errors
///
/// Returns [`WireError::OutOfBounds`] if `offset` is past the buffer end.
pub fn read_u8(buf: &[u8], offset: usize) -> Result<u8, WireError> {
    read_fixed::<1>(buf, offset).map(|b| b[0])
}

/// Read a big-endian `i16` at `offset`.
///
/// # Errors
///
/// Returns [`WireError::OutOfBounds`] if the read extends past the buffer.
pub fn read_i16(buf: &[u8], offset: usize) -> Result<i16, WireError> {
    read_fixed::<2>(buf, offset).map(i16::from_be_bytes)
}

/// Read a big-endian `u16` at `offset`.
///
/// # Errors
///
/// Returns [`WireError::OutOfBounds`] if the read extends past the buffer.
pub fn read_u16(buf: &[u8], offset: usize) -> Result<u16, WireError> {
    read_fixed::<2>(buf, offset).map(u16::from_be_bytes)
}

/// Read a big-endian `i32` at `offset`.
///
/// # Errors
///
/// Returns [`WireError::OutOfBounds`] if the read extends past the buffer.
pub fn read_i32(buf: &[u8], offset: usize) -> Result<i32, WireError> {
    read_fixed::<4>(buf, offset).map(i32::from_be_bytes)
}

/// Read a big-endian `u32` at `offset`.
///
/// # Errors
///
/// Returns [`WireError::OutOfBounds`] if the read extends past the buffer.
pub fn read_u32(buf: &[u8], offset: usize) -> Result<u32, WireError> {
    read_fixed::<4>(buf, offset).map(u32::from_be_bytes)
}

/// Slice a binary frame into its constituent tick packets, in order.
///
/// # Errors
///
/// Returns [`WireError::MalformedFrame`] when the declared packet count or
/// lengths do not fit inside the frame.
pub fn split_packets(frame: &[u8]) -> Result<Vec<&[u8]>, WireError> {
    let count = read_i16(frame, 0)
        .map_err(|_| WireError::MalformedFrame("frame too short for packet count".to_string()))?;
    let count = usize::try_from(count)
        .map_err(|_| WireError::MalformedFrame(format!("negative packet count {count}")))?;

    let mut packets = Vec::with_capacity(count);
    let mut offset = 2usize;

    for index in 0..count {
        let length = read_i16(frame, offset).map_err(|_| {
            WireError::MalformedFrame(format!("frame too short for length of packet {index}"))
        })?;
        let length = usize::try_from(length).map_err(|_| {
            WireError::MalformedFrame(format!("negative length for packet {index}"))
        })?;
        offset += 2;

        let end = offset + length;
        if end > frame.len() {
            return Err(WireError::MalformedFrame(format!(
                "packet {index} declares {length} bytes but only {} remain",
                frame.len() - offset
            )));
        }
        packets.push(&frame[offset..end]);
        offset = end;
    }

    Ok(packets)
}
