//! Formatting helpers and the debug sink.
//!
//! Decoded values can be echoed to a [`DebugSink`] in one of three
//! [`PrintFormat`] styles. These lines are purely for observability; nothing
//! in the library reads them back.

use crate::types::{PrintFormat, Unit};

/// Tag printed in place of values when an operation failed.
pub const ERROR_TAG: &str = "Return";

/// Format one `name = value` line.
///
/// # Example
///
/// ```
/// use emsbus_core::{PrintFormat, Unit, format_field_line};
///
/// assert_eq!(
///     format_field_line("CurImpTemp", "48.5", Unit::Celsius, PrintFormat::Standard),
///     "CurImpTemp: 48.5 °C"
/// );
/// assert_eq!(
///     format_field_line("CurImpTemp", "48.5", Unit::Celsius, PrintFormat::Xml),
///     "<CurImpTemp>48.5</CurImpTemp>"
/// );
/// ```
pub fn format_field_line(name: &str, value: &str, unit: Unit, format: PrintFormat) -> String {
    match format {
        PrintFormat::Standard => format!("{name}: {value} {}", unit.symbol()),
        PrintFormat::Xml => format!("<{name}>{value}</{name}>"),
        PrintFormat::NoUnit => format!("{name}: {value}"),
    }
}

/// Format the line printed before (`header = true`) or after a message.
pub fn format_message_tag(message: &str, header: bool, format: PrintFormat) -> String {
    match format {
        PrintFormat::Standard | PrintFormat::NoUnit => format!("--- {message} ---"),
        PrintFormat::Xml if header => format!("<{message}>"),
        PrintFormat::Xml => format!("</{message}>"),
    }
}

/// Format the line printed in place of values when an operation failed.
pub fn format_error_tag(format: PrintFormat) -> String {
    match format {
        PrintFormat::Standard | PrintFormat::NoUnit => format!("{ERROR_TAG}: 0"),
        PrintFormat::Xml => format!("<{ERROR_TAG}>0</{ERROR_TAG}>"),
    }
}

/// Receiver of formatted diagnostic lines.
pub trait DebugSink: Send + Sync {
    /// Accept one complete line (no trailing newline).
    fn write_line(&self, line: &str);
}

impl<F> DebugSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn write_line(&self, line: &str) {
        self(line)
    }
}

/// A [`DebugSink`] that forwards every line to `tracing` at info level,
/// on target `emsbus::debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DebugSink for TracingSink {
    fn write_line(&self, line: &str) {
        tracing::info!(target: "emsbus::debug", "{line}");
    }
}
