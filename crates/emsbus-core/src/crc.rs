//! EMS bus frame checksum.
//!
//! Every EMS frame carries a one-byte CRC just before its break
//! terminator. The checksum covers every byte in front of it.

/// Polynomial folded back into the CRC when its high bit shifts out.
pub const CRC_POLY: u8 = 0x0C;

/// Compute the EMS CRC8 over `data`.
///
/// # Example
///
/// ```
/// use emsbus_core::crc::crc8;
///
/// // Read request: PC asks the room controller for one byte at offset 5
/// // of message 0x06.
/// assert_eq!(crc8(&[0x0B, 0x90, 0x06, 0x05, 0x01]), 0x47);
/// ```
pub fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |crc, &byte| {
        let carry = crc >> 7;
        let crc = if carry == 1 { crc ^ CRC_POLY } else { crc };
        ((crc << 1) | carry) ^ byte
    })
}

/// Check the CRC of a received frame.
///
/// `frame` is everything read off the bus for one frame, including the
/// CRC byte and the trailing break byte, so the CRC sits at
/// `frame.len() - 2`.
pub fn crc_matches(frame: &[u8]) -> bool {
    match frame.len().checked_sub(2) {
        Some(crc_pos) => crc8(&frame[..crc_pos]) == frame[crc_pos],
        None => false,
    }
}
