//! Core types used throughout emsbus.
//!
//! These describe what travels on the bus (device addresses, decoded
//! values, switch points) and how field values are encoded, independent of
//! any particular message layout.

use std::fmt;
use std::str::FromStr;

/// A device on the EMS bus, identified by its bus address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Device {
    /// Universal burner automaton (the boiler itself).
    Uba = 0x08,
    /// BC10 base controller.
    Bc10 = 0x09,
    /// A PC or other host-side initiator. Default own address.
    Pc = 0x0B,
    /// RC35 room controller.
    Rc35 = 0x10,
    /// WM10 switch module.
    Wm10 = 0x11,
    /// RC20 room controller.
    Rc20 = 0x17,
    /// MM10 mixing module.
    Mm10 = 0x21,
}

impl Device {
    /// Bus address of this device.
    pub fn address(self) -> u8 {
        self as u8
    }

    /// Look up a device by bus address.
    pub fn from_address(address: u8) -> Option<Device> {
        match address {
            0x08 => Some(Device::Uba),
            0x09 => Some(Device::Bc10),
            0x0B => Some(Device::Pc),
            0x10 => Some(Device::Rc35),
            0x11 => Some(Device::Wm10),
            0x17 => Some(Device::Rc20),
            0x21 => Some(Device::Mm10),
            _ => None,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Device::Uba => "UBA",
            Device::Bc10 => "BC10",
            Device::Pc => "PC",
            Device::Rc35 => "RC35",
            Device::Wm10 => "WM10",
            Device::Rc20 => "RC20",
            Device::Mm10 => "MM10",
        };
        write!(f, "{s} (0x{:02X})", self.address())
    }
}

/// Unit tag of a field, used only when printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    None,
    Celsius,
    YesNo,
    MilliAmpere,
    Bar,
    Minutes,
    Times,
    Percent,
    Day,
    Seconds,
}

impl Unit {
    /// The text printed after a value in the standard print style.
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::None => "",
            Unit::Celsius => "\u{b0}C",
            Unit::YesNo => "Yes/No",
            Unit::MilliAmpere => "mAmper",
            Unit::Bar => "bar",
            Unit::Minutes => "minutes",
            Unit::Times => "times",
            Unit::Percent => "%",
            Unit::Day => "day",
            Unit::Seconds => "seconds",
        }
    }
}

/// How a field value is laid out in a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodeKind {
    /// One unsigned byte.
    Byte,
    /// A single bit of one byte.
    Bit {
        /// Bit position, 0 = least significant.
        bit: u8,
    },
    /// Three bytes, big-endian, unsigned.
    UnsignedLong24,
    /// Fixed-point value divided by `scale`.
    ///
    /// Two-byte values are unsigned big-endian, one-byte values are signed.
    ScaledFloat {
        /// 1 or 2 bytes.
        width: u8,
        /// Divisor applied to the raw integer.
        scale: u8,
    },
    /// One entry of a weekly switching program (two bytes).
    SwitchPoint,
}

impl EncodeKind {
    /// Number of bytes the value occupies.
    pub fn width(self) -> usize {
        match self {
            EncodeKind::Byte | EncodeKind::Bit { .. } => 1,
            EncodeKind::UnsignedLong24 => 3,
            EncodeKind::ScaledFloat { width, .. } => width as usize,
            EncodeKind::SwitchPoint => 2,
        }
    }
}

/// Switch point action: off / night.
pub const ACTION_OFF: u8 = 0;
/// Switch point action: on / day.
pub const ACTION_ON: u8 = 1;
/// Switch point action: unused slot.
pub const ACTION_UNDEFINED: u8 = 7;

/// One decoded entry of a weekly switching program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwitchPoint {
    /// Position of the entry in its program (0..42).
    pub index: u8,
    /// [`ACTION_OFF`], [`ACTION_ON`] or [`ACTION_UNDEFINED`].
    pub action: u8,
    /// Weekday, 0 = Monday.
    pub day: u8,
    pub hour: u8,
    /// Multiple of ten.
    pub minute: u8,
}

impl SwitchPoint {
    /// Whether the slot holds the "undefined" sentinel.
    pub fn is_undefined(&self) -> bool {
        self.action == ACTION_UNDEFINED
    }
}

impl fmt::Display for SwitchPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.index, self.action, self.day, self.hour, self.minute
        )
    }
}

/// A decoded field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Byte(u8),
    Bit(bool),
    ULong(u32),
    Float(f32),
    SwitchPoint(SwitchPoint),
}

impl Value {
    pub fn as_byte(&self) -> Option<u8> {
        match self {
            Value::Byte(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bit(&self) -> Option<bool> {
        match self {
            Value::Bit(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_ulong(&self) -> Option<u32> {
        match self {
            Value::ULong(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_switch_point(&self) -> Option<SwitchPoint> {
        match self {
            Value::SwitchPoint(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Byte(v) => write!(f, "{v}"),
            Value::Bit(v) => write!(f, "{}", u8::from(*v)),
            Value::ULong(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:.1}"),
            Value::SwitchPoint(sp) => write!(f, "{sp}"),
        }
    }
}

/// One of the four heating circuits a room controller can manage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HeatingCircuit {
    Hc1,
    Hc2,
    Hc3,
    Hc4,
}

impl HeatingCircuit {
    /// All circuits, in order.
    pub const ALL: [HeatingCircuit; 4] = [
        HeatingCircuit::Hc1,
        HeatingCircuit::Hc2,
        HeatingCircuit::Hc3,
        HeatingCircuit::Hc4,
    ];

    /// Circuit from its 1-based number.
    pub fn from_number(n: u8) -> Option<HeatingCircuit> {
        match n {
            1 => Some(HeatingCircuit::Hc1),
            2 => Some(HeatingCircuit::Hc2),
            3 => Some(HeatingCircuit::Hc3),
            4 => Some(HeatingCircuit::Hc4),
            _ => None,
        }
    }

    /// 1-based circuit number.
    pub fn number(self) -> u8 {
        self as u8 + 1
    }

    /// 0-based index, for table lookups.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for HeatingCircuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HC{}", self.number())
    }
}

/// Output style of the debug sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrintFormat {
    /// `Name: value unit`
    #[default]
    Standard,
    /// `<Name>value</Name>`
    Xml,
    /// `Name: value`
    NoUnit,
}

impl fmt::Display for PrintFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrintFormat::Standard => write!(f, "standard"),
            PrintFormat::Xml => write!(f, "xml"),
            PrintFormat::NoUnit => write!(f, "no-unit"),
        }
    }
}

/// Error returned when a string cannot be parsed into a [`PrintFormat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePrintFormatError(String);

impl fmt::Display for ParsePrintFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown print format: '{}'. Expected: standard, xml, no-unit",
            self.0
        )
    }
}

impl std::error::Error for ParsePrintFormatError {}

impl FromStr for PrintFormat {
    type Err = ParsePrintFormatError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(PrintFormat::Standard),
            "xml" => Ok(PrintFormat::Xml),
            "no-unit" | "nounit" => Ok(PrintFormat::NoUnit),
            _ => Err(ParsePrintFormatError(s.to_string())),
        }
    }
}
