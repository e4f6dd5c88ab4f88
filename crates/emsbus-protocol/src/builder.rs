//! EmsBuilder -- fluent builder for constructing [`EmsClient`] instances.
//!
//! Separates configuration from construction so that callers can set the
//! bus address, timeouts, chunk size and debug output before the transport
//! is opened.
//!
//! # Example
//!
//! ```no_run
//! use emsbus_protocol::builder::EmsBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> emsbus_core::Result<()> {
//! let client = EmsBuilder::new()
//!     .serial_port("/dev/ttyUSB0")
//!     .base_timeout(Duration::from_millis(500))
//!     .retry_factor(6)
//!     .build()
//!     .await?;
//! let seconds = client.probe().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use emsbus_core::error::{Error, Result};
use emsbus_core::transport::Transport;
use emsbus_core::{DebugSink, Device, PrintFormat};

use crate::client::EmsClient;
use crate::engine::{Engine, EngineConfig};
use crate::frame::{MAX_CHUNK, POLL_ADDRESS_MASK};

/// Default serial speed of EMS bus adapters.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Fluent builder for [`EmsClient`].
///
/// Every setting has a default, so the simplest usage is:
///
/// ```ignore
/// let client = EmsBuilder::new()
///     .serial_port("/dev/ttyUSB0")
///     .build()
///     .await?;
/// ```
pub struct EmsBuilder {
    serial_port: Option<String>,
    baud_rate: u32,
    own_address: u8,
    base_timeout: Duration,
    retry_factor: u32,
    max_chunk: usize,
    max_heating_circuits: u8,
    print_format: PrintFormat,
    debug_sink: Option<Arc<dyn DebugSink>>,
}

impl Default for EmsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmsBuilder {
    pub fn new() -> Self {
        let engine = EngineConfig::default();
        EmsBuilder {
            serial_port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            own_address: Device::Pc.address(),
            base_timeout: engine.base_timeout,
            retry_factor: engine.retry_factor,
            max_chunk: engine.max_chunk,
            max_heating_circuits: 2,
            print_format: PrintFormat::Standard,
            debug_sink: None,
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the serial speed (default: 9600).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Bus address this client polls for and sends from (default: `0x0B`).
    pub fn own_address(mut self, address: u8) -> Self {
        self.own_address = address;
        self
    }

    /// Per-attempt response window (default: 1000ms).
    pub fn base_timeout(mut self, timeout: Duration) -> Self {
        self.base_timeout = timeout;
        self
    }

    /// Number of base timeouts an operation may retry for (default: 4).
    pub fn retry_factor(mut self, factor: u32) -> Self {
        self.retry_factor = factor.max(1);
        self
    }

    /// Largest payload requested per read, clamped to 1..=26.
    pub fn max_chunk(mut self, chunk: usize) -> Self {
        self.max_chunk = chunk.clamp(1, MAX_CHUNK);
        self
    }

    /// Number of heating circuits installed, clamped to 1..=4 (default: 2).
    pub fn max_heating_circuits(mut self, circuits: u8) -> Self {
        self.max_heating_circuits = circuits.clamp(1, 4);
        self
    }

    /// Style of debug sink lines (default: standard).
    pub fn print_format(mut self, format: PrintFormat) -> Self {
        self.print_format = format;
        self
    }

    /// Receive a line for every printed message and every set operation.
    pub fn debug_sink(mut self, sink: Arc<dyn DebugSink>) -> Self {
        self.debug_sink = Some(sink);
        self
    }

    /// Build an [`EmsClient`] with a caller-provided transport.
    ///
    /// This is the primary entry point for testing (pass a `MockBus` from
    /// `emsbus-test-harness`) and for callers that manage the transport
    /// themselves.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<EmsClient> {
        if self.own_address & !POLL_ADDRESS_MASK != 0 {
            return Err(Error::Validation(format!(
                "own_address 0x{:02X} must be below 0x80",
                self.own_address
            )));
        }
        if self.base_timeout.is_zero() {
            return Err(Error::Validation("base_timeout must be non-zero".into()));
        }

        let config = EngineConfig {
            own_address: self.own_address,
            base_timeout: self.base_timeout,
            retry_factor: self.retry_factor,
            max_chunk: self.max_chunk,
            ..EngineConfig::default()
        };
        Ok(EmsClient::new(
            Engine::new(transport, config),
            self.max_heating_circuits,
            self.print_format,
            self.debug_sink,
        ))
    }

    /// Build an [`EmsClient`] on a serial port.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    pub async fn build(self) -> Result<EmsClient> {
        let port = self
            .serial_port
            .as_ref()
            .ok_or_else(|| Error::Validation("serial_port is required for build()".into()))?;

        let transport = emsbus_transport::SerialTransport::open(port, self.baud_rate).await?;
        self.build_with_transport(Box::new(transport)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emsbus_core::HeatingCircuit;
    use emsbus_test_harness::MockBus;

    #[tokio::test]
    async fn builder_defaults() {
        let client = EmsBuilder::new()
            .build_with_transport(Box::new(MockBus::default()))
            .await
            .unwrap();

        assert_eq!(client.max_heating_circuits(), 2);
        assert_eq!(client.print_format(), PrintFormat::Standard);
    }

    #[tokio::test]
    async fn builder_serial_port_required_for_build() {
        let result = EmsBuilder::new().build().await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn builder_rejects_read_flagged_address() {
        let result = EmsBuilder::new()
            .own_address(0x8B)
            .build_with_transport(Box::new(MockBus::default()))
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn builder_clamps_ranges() {
        let client = EmsBuilder::new()
            .max_heating_circuits(9)
            .max_chunk(100)
            .build_with_transport(Box::new(MockBus::default()))
            .await
            .unwrap();
        assert_eq!(client.max_heating_circuits(), 4);

        let client = EmsBuilder::new()
            .max_heating_circuits(0)
            .build_with_transport(Box::new(MockBus::default()))
            .await
            .unwrap();
        assert_eq!(client.max_heating_circuits(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn builder_fluent_chain() {
        let bus = MockBus::new(0x0A);
        bus.load_message(0x10, 0x47, &[0u8; 42]);
        let client = EmsBuilder::new()
            .serial_port("/dev/ttyUSB0")
            .baud_rate(9600)
            .own_address(0x0A)
            .base_timeout(Duration::from_millis(200))
            .retry_factor(2)
            .max_chunk(8)
            .max_heating_circuits(3)
            .print_format(PrintFormat::Xml)
            .debug_sink(Arc::new(|_: &str| {}))
            .build_with_transport(Box::new(bus.clone()))
            .await
            .unwrap();

        client.set_work_mode_hc(HeatingCircuit::Hc2, 2).await.unwrap();
        assert_eq!(bus.sent_data()[0][0], 0x0A);
        assert_eq!(bus.message(0x10, 0x47).unwrap()[7], 2);
    }

    #[tokio::test(start_paused = true)]
    async fn builder_chunk_size_reaches_engine() {
        let bus = MockBus::new(0x0B);
        bus.load_message(0x08, 0x18, &[0u8; 27]);
        let client = EmsBuilder::new()
            .max_chunk(10)
            .build_with_transport(Box::new(bus.clone()))
            .await
            .unwrap();

        client
            .read_message(crate::catalog::MessageId::UbaMonitorFast)
            .await
            .unwrap();
        assert_eq!(bus.sent_data().len(), 3);
    }
}
