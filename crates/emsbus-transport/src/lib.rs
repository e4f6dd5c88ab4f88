//! Transport implementations for emsbus.
//!
//! This crate provides the concrete implementation of the
//! [`Transport`](emsbus_core::Transport) trait from `emsbus-core` for real
//! hardware:
//!
//! - [`SerialTransport`]: USB serial adapters and UARTs attached to the bus
//!
//! # Example
//!
//! ```no_run
//! use emsbus_transport::SerialTransport;
//! use emsbus_core::transport::Transport;
//!
//! # async fn example() -> emsbus_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 9600).await?;
//! let pending = transport.available().await?;
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod serial;

pub use serial::{SerialConfig, SerialTransport};
