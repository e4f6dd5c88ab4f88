//! EMS frame encoder/decoder.
//!
//! The EMS bus carries binary frames on a half-duplex line. Frames are not
//! delimited by a byte value but by a line break that the receiver sees as
//! a `0x00` with a framing error. This module handles the pure byte-level
//! encoding of requests and the validation of received frames.
//!
//! # Frame format
//!
//! ```text
//! <src> <dst> <type> <offset> [<data>...] <crc> <break>
//! ```
//!
//! - `src`: sender bus address (`0x0B` for a PC)
//! - `dst`: receiver bus address; bit 7 set marks a read request
//! - `type`: message type id
//! - `offset`: byte offset into the message payload
//! - `data`: for read requests, one byte holding the requested length;
//!   for write requests, the byte to store; for responses, the payload
//! - `crc`: CRC8 over everything before it
//! - `break`: end-of-frame marker

use bytes::{BufMut, BytesMut};
use emsbus_core::crc::{crc_matches, crc8};
use emsbus_core::{Error, Result};

/// Bit set on the destination address of read requests.
pub const READ_FLAG: u8 = 0x80;

/// Mask applied to a poll byte to recover the polled address.
pub const POLL_ADDRESS_MASK: u8 = 0x7F;

/// Acknowledge byte returned by a device that accepted a write.
pub const ACK: u8 = 0x01;

/// Bytes in front of the payload: source, destination, type, offset.
pub const HEADER_LEN: usize = 4;

/// Header plus CRC plus break byte.
pub const FRAME_OVERHEAD: usize = HEADER_LEN + 2;

/// Length of a request frame on the wire, CRC included.
pub const REQUEST_LEN: usize = HEADER_LEN + 2;

/// Longest frame we are willing to receive in one go.
pub const MAX_READ_FRAME: usize = 32;

/// Largest payload a single read request may ask for.
pub const MAX_CHUNK: usize = MAX_READ_FRAME - FRAME_OVERHEAD;

/// Shortest frame that can carry a header and a CRC.
pub const MIN_RESPONSE_LEN: usize = 5;

/// Length of a poll frame: address byte plus break.
pub const POLL_LEN: usize = 2;

/// A validated response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Bus address of the answering device.
    pub src: u8,
    /// Bus address the response is for.
    pub dst: u8,
    /// Message type id.
    pub msg_type: u8,
    /// Offset of the first payload byte within the message payload.
    pub offset: u8,
    /// Payload bytes (CRC and break stripped).
    pub payload: Vec<u8>,
}

fn encode_request(src: u8, dst: u8, msg_type: u8, offset: u8, data: u8) -> [u8; REQUEST_LEN] {
    let mut buf = BytesMut::with_capacity(REQUEST_LEN);
    buf.put_u8(src);
    buf.put_u8(dst);
    buf.put_u8(msg_type);
    buf.put_u8(offset);
    buf.put_u8(data);
    buf.put_u8(crc8(&buf));

    let mut out = [0u8; REQUEST_LEN];
    out.copy_from_slice(&buf);
    out
}

/// Encode a read request for `len` payload bytes starting at `offset`.
///
/// # Example
///
/// ```
/// use emsbus_protocol::frame::encode_read_request;
///
/// // PC asks the boiler (0x08) for all of UBAMonitorFast (0x18).
/// let frame = encode_read_request(0x0B, 0x08, 0x18, 0x00, 0x1A);
/// assert_eq!(frame, [0x0B, 0x88, 0x18, 0x00, 0x1A, 0xEE]);
/// ```
pub fn encode_read_request(
    src: u8,
    dst: u8,
    msg_type: u8,
    offset: u8,
    len: u8,
) -> [u8; REQUEST_LEN] {
    encode_request(src, dst | READ_FLAG, msg_type, offset, len)
}

/// Encode a write request storing `value` at `offset`.
///
/// # Example
///
/// ```
/// use emsbus_protocol::frame::encode_write_request;
///
/// // Set the day temperature of heating circuit 1 to 6.0 °C (raw 12).
/// let frame = encode_write_request(0x0B, 0x10, 0x3D, 0x02, 0x0C);
/// assert_eq!(frame, [0x0B, 0x10, 0x3D, 0x02, 0x0C, 0xCC]);
/// ```
pub fn encode_write_request(
    src: u8,
    dst: u8,
    msg_type: u8,
    offset: u8,
    value: u8,
) -> [u8; REQUEST_LEN] {
    encode_request(src, dst, msg_type, offset, value)
}

/// Validate a received frame and split it into header and payload.
///
/// `raw` is everything read for the frame: header, payload, CRC and the
/// break byte. The frame must be at least [`MIN_RESPONSE_LEN`] bytes, pass
/// its CRC check and carry `expected_type`.
pub fn decode_response(raw: &[u8], expected_type: u8) -> Result<Response> {
    if raw.len() < MIN_RESPONSE_LEN {
        return Err(Error::FrameCorruption(format!(
            "frame too short: {} bytes",
            raw.len()
        )));
    }
    if !crc_matches(raw) {
        return Err(Error::FrameCorruption(format!(
            "CRC mismatch in {raw:02X?}"
        )));
    }
    if raw[2] != expected_type {
        return Err(Error::ProtocolMismatch(format!(
            "expected message type 0x{expected_type:02X}, got 0x{:02X}",
            raw[2]
        )));
    }

    let payload_end = raw.len() - 2;
    Ok(Response {
        src: raw[0],
        dst: raw[1],
        msg_type: raw[2],
        offset: raw[3],
        payload: raw[HEADER_LEN.min(payload_end)..payload_end].to_vec(),
    })
}

/// Whether `raw` is a poll for `address`.
///
/// A poll is exactly one address byte followed by a break.
pub fn is_poll_for(raw: &[u8], terminated: bool, address: u8) -> bool {
    terminated && raw.len() == POLL_LEN && raw[0] & POLL_ADDRESS_MASK == address
}

/// Number of read requests needed to fetch `len` bytes in chunks of `chunk`.
pub fn chunk_count(len: usize, chunk: usize) -> usize {
    len.div_ceil(chunk.max(1))
}
