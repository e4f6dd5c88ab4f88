//! Field codec.
//!
//! Pure transforms between message bytes and field values. Offsets are
//! counted from the start of the frame, header included, so a field at
//! offset 4 is the first payload byte.
//!
//! Every function indexes the buffer directly; callers size buffers from
//! the catalog, whose entries are checked to keep every field in bounds.

use emsbus_core::{ACTION_UNDEFINED, EncodeKind, SwitchPoint, Unit, Value};

/// Byte pair stored for an undefined switch point.
pub const UNDEFINED_SWITCH_POINT: [u8; 2] = [0xE7, 0x90];

/// Static description of one field of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name as printed in diagnostics.
    pub name: &'static str,
    pub kind: EncodeKind,
    pub unit: Unit,
    /// Byte offset from the start of the frame.
    pub offset: u8,
}

impl FieldDescriptor {
    pub const fn byte(name: &'static str, unit: Unit, offset: u8) -> Self {
        FieldDescriptor {
            name,
            kind: EncodeKind::Byte,
            unit,
            offset,
        }
    }

    pub const fn bit(name: &'static str, offset: u8, bit: u8) -> Self {
        FieldDescriptor {
            name,
            kind: EncodeKind::Bit { bit },
            unit: Unit::YesNo,
            offset,
        }
    }

    pub const fn ulong(name: &'static str, unit: Unit, offset: u8) -> Self {
        FieldDescriptor {
            name,
            kind: EncodeKind::UnsignedLong24,
            unit,
            offset,
        }
    }

    pub const fn scaled(name: &'static str, unit: Unit, offset: u8, width: u8, scale: u8) -> Self {
        FieldDescriptor {
            name,
            kind: EncodeKind::ScaledFloat { width, scale },
            unit,
            offset,
        }
    }

    pub const fn switch_point(offset: u8) -> Self {
        FieldDescriptor {
            name: "SwitchPoint",
            kind: EncodeKind::SwitchPoint,
            unit: Unit::None,
            offset,
        }
    }

    /// Number of bytes the field occupies.
    pub fn width(&self) -> usize {
        self.kind.width()
    }

    /// Offset of the field within the message payload.
    pub fn payload_offset(&self) -> usize {
        self.offset as usize - crate::frame::HEADER_LEN
    }

    /// Decode this field from a frame buffer.
    pub fn decode(&self, buf: &[u8]) -> Value {
        let off = self.offset as usize;
        match self.kind {
            EncodeKind::Byte => Value::Byte(decode_byte(buf, off)),
            EncodeKind::Bit { bit } => Value::Bit(decode_bit(buf, off, bit)),
            EncodeKind::UnsignedLong24 => Value::ULong(decode_u24(buf, off)),
            EncodeKind::ScaledFloat { width, scale } => {
                Value::Float(decode_scaled(buf, off, width, scale))
            }
            EncodeKind::SwitchPoint => Value::SwitchPoint(decode_switch_point(buf, off)),
        }
    }
}

pub fn decode_byte(buf: &[u8], off: usize) -> u8 {
    buf[off]
}

pub fn decode_bit(buf: &[u8], off: usize, bit: u8) -> bool {
    (buf[off] >> bit) & 0x01 == 0x01
}

/// Three bytes, big-endian.
pub fn decode_u24(buf: &[u8], off: usize) -> u32 {
    u32::from(buf[off]) << 16 | u32::from(buf[off + 1]) << 8 | u32::from(buf[off + 2])
}

/// Fixed-point value divided by `scale`.
///
/// Two-byte values are unsigned big-endian; one-byte values are signed.
///
/// # Example
///
/// ```
/// use emsbus_protocol::codec::decode_scaled;
///
/// assert_eq!(decode_scaled(&[0x01, 0xF4], 0, 2, 10), 50.0);
/// assert_eq!(decode_scaled(&[0xF4], 0, 1, 2), -6.0);
/// ```
pub fn decode_scaled(buf: &[u8], off: usize, width: u8, scale: u8) -> f32 {
    let raw = if width == 2 {
        f32::from(u16::from_be_bytes([buf[off], buf[off + 1]]))
    } else {
        f32::from(buf[off] as i8)
    };
    raw / f32::from(scale)
}

pub fn decode_switch_point(buf: &[u8], off: usize) -> SwitchPoint {
    let (b0, b1) = (buf[off], buf[off + 1]);
    SwitchPoint {
        index: (off / 2) as u8 - 2,
        action: b0 & 0x07,
        day: b0 >> 5,
        hour: b1 / 6,
        minute: (b1 % 6) * 10,
    }
}

/// Encode a switch point as its two wire bytes.
///
/// The undefined action always encodes to [`UNDEFINED_SWITCH_POINT`],
/// whatever the other arguments.
pub fn encode_switch_point(action: u8, day: u8, hour: u8, minute: u8) -> [u8; 2] {
    if action == ACTION_UNDEFINED {
        return UNDEFINED_SWITCH_POINT;
    }
    [(day << 5) | action, hour * 6 + minute / 10]
}

#[cfg(test)]
mod tests {
    use super::*;
    use emsbus_core::{ACTION_OFF, ACTION_ON};

    // ---------------------------------------------------------------
    // Scalar decoders
    // ---------------------------------------------------------------

    #[test]
    fn byte_at_offset() {
        assert_eq!(decode_byte(&[0, 0, 0, 0, 0x37], 4), 0x37);
    }

    #[test]
    fn bits_of_status_byte() {
        // 0b1010_0101: bits 0, 2, 5, 7 set.
        let buf = [0b1010_0101];
        let set: Vec<u8> = (0..8).filter(|&b| decode_bit(&buf, 0, b)).collect();
        assert_eq!(set, vec![0, 2, 5, 7]);
    }

    #[test]
    fn u24_big_endian() {
        assert_eq!(decode_u24(&[0x01, 0x02, 0x03], 0), 0x010203);
        assert_eq!(decode_u24(&[0xFF, 0xFF, 0xFF], 0), 0xFF_FFFF);
    }

    #[test]
    fn scaled_two_bytes_unsigned() {
        assert_eq!(decode_scaled(&[0x01, 0xF4], 0, 2, 10), 50.0);
        // No sign extension for two-byte values.
        assert_eq!(decode_scaled(&[0x80, 0x00], 0, 2, 1), 32768.0);
    }

    #[test]
    fn scaled_one_byte_signed() {
        assert_eq!(decode_scaled(&[0xF4], 0, 1, 2), -6.0);
        assert_eq!(decode_scaled(&[0x2B], 0, 1, 2), 21.5);
        assert_eq!(decode_scaled(&[0x10], 0, 1, 10), 1.6);
    }

    // ---------------------------------------------------------------
    // Switch points
    // ---------------------------------------------------------------

    #[test]
    fn switch_point_index_from_offset() {
        let buf = [0u8; 90];
        assert_eq!(decode_switch_point(&buf, 4).index, 0);
        assert_eq!(decode_switch_point(&buf, 6).index, 1);
        assert_eq!(decode_switch_point(&buf, 86).index, 41);
    }

    #[test]
    fn switch_point_decode_fields() {
        // Wednesday (2), on, 06:30.
        let buf = [0, 0, 0, 0, (2 << 5) | 1, 6 * 6 + 3];
        let sp = decode_switch_point(&buf, 4);
        assert_eq!(
            sp,
            SwitchPoint {
                index: 0,
                action: ACTION_ON,
                day: 2,
                hour: 6,
                minute: 30
            }
        );
    }

    #[test]
    fn switch_point_round_trip() {
        for action in [ACTION_OFF, ACTION_ON] {
            for day in 0..7 {
                for hour in 0..24 {
                    for minute in (0..60).step_by(10) {
                        let bytes = encode_switch_point(action, day, hour, minute);
                        let sp = decode_switch_point(&[0, 0, 0, 0, bytes[0], bytes[1]], 4);
                        assert_eq!(
                            (sp.action, sp.day, sp.hour, sp.minute),
                            (action, day, hour, minute)
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn undefined_switch_point_is_fixed() {
        for (day, hour, minute) in [(0, 0, 0), (6, 23, 50), (3, 12, 20), (255, 255, 255)] {
            assert_eq!(
                encode_switch_point(ACTION_UNDEFINED, day, hour, minute),
                [0xE7, 0x90]
            );
        }
    }

    #[test]
    fn undefined_switch_point_decodes_as_undefined() {
        let sp = decode_switch_point(&[0, 0, 0, 0, 0xE7, 0x90], 4);
        assert!(sp.is_undefined());
    }

    // ---------------------------------------------------------------
    // Descriptor dispatch
    // ---------------------------------------------------------------

    #[test]
    fn descriptor_decode_dispatches_on_kind() {
        let mut buf = [0u8; 12];
        buf[4] = 0x2A;
        buf[5] = 0x01;
        buf[6] = 0xF4;
        buf[7] = 0b0000_1000;
        buf[8] = 0x00;
        buf[9] = 0x01;
        buf[10] = 0x00;

        assert_eq!(
            FieldDescriptor::byte("B", Unit::None, 4).decode(&buf),
            Value::Byte(0x2A)
        );
        assert_eq!(
            FieldDescriptor::scaled("F", Unit::Celsius, 5, 2, 10).decode(&buf),
            Value::Float(50.0)
        );
        assert_eq!(FieldDescriptor::bit("X", 7, 3).decode(&buf), Value::Bit(true));
        assert_eq!(FieldDescriptor::bit("X", 7, 2).decode(&buf), Value::Bit(false));
        assert_eq!(
            FieldDescriptor::ulong("U", Unit::Minutes, 8).decode(&buf),
            Value::ULong(0x000100)
        );
    }

    #[test]
    fn descriptor_widths_and_payload_offsets() {
        let f = FieldDescriptor::ulong("BurnStarts", Unit::Times, 14);
        assert_eq!(f.width(), 3);
        assert_eq!(f.payload_offset(), 10);
        assert_eq!(FieldDescriptor::switch_point(4).payload_offset(), 0);
    }
}
