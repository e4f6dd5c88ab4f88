//! EMS bus protocol backend for emsbus.
//!
//! This crate implements the request/response protocol spoken on the EMS
//! bus of Buderus/Nefit/Bosch boilers. It provides:
//!
//! - **Frame codec** ([`frame`]) -- build read/write request frames, validate
//!   response frames and recognise polls from the bus master.
//! - **Field codec** ([`codec`]) -- decode bytes, bits, counters, scaled
//!   temperatures and switch points out of a datagram buffer.
//! - **Catalog** ([`catalog`]) -- static descriptions of every supported
//!   message and the fields inside it.
//! - **Engine** ([`engine`]) -- bus arbitration, chunked reads, verified
//!   writes and the retry/deadline policy on top of a
//!   [`Transport`](emsbus_core::Transport).
//! - **Commands** ([`commands`]) -- validated set operations that turn user
//!   parameters into field writes.
//! - **EmsClient** ([`client`]) -- the typed read/print/set surface.
//! - **EmsBuilder** ([`builder`]) -- fluent builder for constructing
//!   `EmsClient` instances.
//!
//! # Example
//!
//! ```
//! use emsbus_protocol::frame::{encode_read_request, decode_response};
//!
//! // Ask the boiler (0x08) for one byte of UBAMonitorFast at offset 1.
//! let request = encode_read_request(0x0B, 0x08, 0x18, 0x01, 0x01);
//! assert_eq!(request, [0x0B, 0x88, 0x18, 0x01, 0x01, 0xF7]);
//!
//! // The boiler answers with one payload byte; the last byte is the break.
//! let raw = [0x08, 0x0B, 0x18, 0x01, 0x61, 0xDB, 0x00];
//! let response = decode_response(&raw, 0x18).unwrap();
//! assert_eq!(response.payload, vec![0x61]);
//! ```

pub mod builder;
pub mod catalog;
pub mod client;
pub mod codec;
pub mod commands;
pub mod engine;
pub mod frame;

pub use builder::EmsBuilder;
pub use catalog::{Datagram, Field, MessageDescriptor, MessageId, ProgramSlot, SwitchProgram};
pub use client::EmsClient;
pub use commands::HolidayDate;
