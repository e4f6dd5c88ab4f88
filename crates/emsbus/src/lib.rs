//! # emsbus -- Async EMS Bus Control for Boilers
//!
//! `emsbus` is an asynchronous Rust library for talking to the EMS bus
//! found in Buderus, Nefit and Bosch heating systems. It reads boiler and
//! room controller telemetry, and writes the settings a room controller
//! would write: circuit temperatures, working modes, hot water programs,
//! holidays and weekly switch points.
//!
//! ## Quick Start
//!
//! Add `emsbus` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! emsbus = "0.1"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! Connect through a serial bus adapter and read the flow temperature:
//!
//! ```no_run
//! use emsbus::{EmsBuilder, Field};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = EmsBuilder::new()
//!         .serial_port("/dev/ttyUSB0")
//!         .build()
//!         .await?;
//!
//!     let flow = client.get_float(Field::CurImpTemp).await?;
//!     println!("flow: {flow} °C");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized as a workspace of focused crates:
//!
//! | Crate                  | Purpose                                              |
//! |------------------------|------------------------------------------------------|
//! | `emsbus-core`          | [`Transport`] trait, value types, CRC, [`Error`]     |
//! | `emsbus-transport`     | Serial transport with break framing                  |
//! | `emsbus-protocol`      | Frame codec, catalog, protocol engine, client        |
//! | `emsbus-test-harness`  | Simulated bus for tests                              |
//! | **`emsbus`**           | This facade crate -- re-exports everything           |
//!
//! ## The client
//!
//! [`EmsClient`] is the central type. Every call arbitrates for the bus,
//! sends its request and retries until a per-call deadline of
//! `base_timeout × retry_factor` passes:
//!
//! - **Reads**: [`get_value`](EmsClient::get_value) and the typed
//!   [`get_byte`](EmsClient::get_byte), [`get_bit`](EmsClient::get_bit),
//!   [`get_ulong`](EmsClient::get_ulong), [`get_float`](EmsClient::get_float)
//! - **Whole messages**: [`read_message`](EmsClient::read_message),
//!   [`print_message`](EmsClient::print_message)
//! - **Schedules**: [`get_switch_point`](EmsClient::get_switch_point),
//!   [`set_program_switch_point`](EmsClient::set_program_switch_point)
//! - **Settings**: `set_*` operations, validated locally before any bus
//!   traffic and verified by reading the written byte back
//!
//! ## Diagnostics
//!
//! A [`DebugSink`] receives human-readable lines for every printed message
//! and every set operation, in one of three [`PrintFormat`] styles:
//!
//! ```no_run
//! use std::sync::Arc;
//! use emsbus::{EmsBuilder, MessageId, PrintFormat};
//!
//! # async fn example() -> emsbus::Result<()> {
//! let client = EmsBuilder::new()
//!     .serial_port("/dev/ttyUSB0")
//!     .print_format(PrintFormat::Xml)
//!     .debug_sink(Arc::new(|line: &str| println!("{line}")))
//!     .build()
//!     .await?;
//!
//! client.print_message(MessageId::UbaMonitorFast).await?;
//! # Ok(())
//! # }
//! ```

pub use emsbus_core::*;

pub use emsbus_protocol::{
    Datagram, EmsBuilder, EmsClient, Field, HolidayDate, MessageDescriptor, MessageId,
    ProgramSlot, SwitchProgram,
};

/// Protocol backend: frame codec, catalog, engine and client.
pub mod protocol {
    pub use emsbus_protocol::*;
}

/// Hardware transports.
pub mod transport {
    pub use emsbus_transport::*;
}

/// Every message the library knows how to read, in catalog order.
///
/// # Example
///
/// ```
/// for message in emsbus::supported_messages() {
///     println!("{} 0x{:02X} ({} bytes)", message.name, message.msg_type, message.payload_len);
/// }
/// ```
pub fn supported_messages() -> &'static [MessageDescriptor] {
    emsbus_protocol::catalog::messages()
}
