//! emsbus-core: Core traits, types, and error definitions for emsbus.
//!
//! This crate defines the pieces shared by every other emsbus crate: the
//! byte-level [`Transport`] contract, the error type, the frame checksum,
//! and the value types produced by decoding EMS messages.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level channel to the bus, with break detection
//! - [`Value`] / [`SwitchPoint`] -- decoded field values
//! - [`EncodeKind`] / [`Unit`] -- how a field is laid out and labelled
//! - [`DebugSink`] -- receiver for formatted diagnostic lines
//! - [`Error`] / [`Result`] -- error handling

pub mod crc;
pub mod error;
pub mod helpers;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use emsbus_core::*`.
pub use crc::{crc_matches, crc8};
pub use error::{Error, Result};
pub use helpers::{
    DebugSink, TracingSink, format_error_tag, format_field_line, format_message_tag,
};
pub use transport::Transport;
pub use types::*;
