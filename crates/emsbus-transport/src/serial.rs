//! Serial port transport for EMS bus adapters.
//!
//! This module provides [`SerialTransport`], which implements the
//! [`Transport`] trait for USB serial adapters and plain UART interfaces
//! wired to an EMS bus through a level shifter.
//!
//! The EMS bus runs at 9600 baud, 8N1, and separates frames with a line
//! break. A UART reports a received break as a `0x00` byte. A zero that is
//! followed by more bytes is ordinary data; a zero followed by an idle line
//! is taken as the break. [`SerialTransport`] therefore holds back a
//! trailing `0x00` until either more bytes arrive or the line has been idle
//! for [`SerialConfig::break_gap`].
//!
//! # Example
//!
//! ```no_run
//! use emsbus_transport::SerialTransport;
//! use emsbus_core::transport::Transport;
//!
//! # async fn example() -> emsbus_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 9600).await?;
//!
//! // Wait for the bus master to poll anyone.
//! while transport.available().await? == 0 {
//!     tokio::time::sleep(std::time::Duration::from_millis(1)).await;
//! }
//! let first = transport.read();
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use emsbus_core::error::{Error, Result};
use emsbus_core::transport::Transport;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::Instant;
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};

/// Serial port configuration.
///
/// Framing is fixed at 8 data bits, 1 stop bit, no parity and no flow
/// control.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate (9600 on every EMS adapter seen so far)
    pub baud_rate: u32,
    /// Idle time after a `0x00` that marks it as a break
    pub break_gap: Duration,
    /// How long the line is held in break to end a frame
    pub break_duration: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            break_gap: Duration::from_millis(2),
            break_duration: Duration::from_millis(2),
        }
    }
}

/// Received bytes with their frame-error markers.
///
/// Kept separate from the port so the break detection can be exercised
/// without hardware.
#[derive(Debug)]
struct RxBuffer {
    bytes: VecDeque<(u8, bool)>,
    /// A trailing zero and when it arrived.
    held_zero: Option<Instant>,
    frame_error: bool,
    break_gap: Duration,
}

impl RxBuffer {
    fn new(break_gap: Duration) -> Self {
        RxBuffer {
            bytes: VecDeque::new(),
            held_zero: None,
            frame_error: false,
            break_gap,
        }
    }

    fn ingest(&mut self, data: &[u8], now: Instant) {
        for &byte in data {
            if self.held_zero.take().is_some() {
                self.bytes.push_back((0x00, false));
            }
            if byte == 0x00 {
                self.held_zero = Some(now);
            } else {
                self.bytes.push_back((byte, false));
            }
        }
    }

    /// Promote a held zero to a break once the line has stayed idle.
    fn settle(&mut self, now: Instant) {
        if let Some(at) = self.held_zero {
            if now.duration_since(at) >= self.break_gap {
                self.held_zero = None;
                self.bytes.push_back((0x00, true));
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.front().map(|&(b, _)| b)
    }

    fn pop(&mut self) -> Option<u8> {
        let (byte, error) = self.bytes.pop_front()?;
        self.frame_error = error;
        Some(byte)
    }

    fn take_frame_error(&mut self) -> bool {
        std::mem::take(&mut self.frame_error)
    }

    fn clear(&mut self) {
        self.bytes.clear();
        self.held_zero = None;
        self.frame_error = false;
    }

    fn len(&self) -> usize {
        self.bytes.len()
    }
}

fn io_error(port: &str, e: std::io::Error) -> Error {
    tracing::error!(port = %port, error = %e, "Serial I/O failed");
    if e.kind() == std::io::ErrorKind::BrokenPipe || e.kind() == std::io::ErrorKind::NotConnected {
        Error::ConnectionLost
    } else {
        Error::Io(e)
    }
}

fn port_error(port: &str, what: &str, e: tokio_serial::Error) -> Error {
    tracing::error!(port = %port, error = %e, "{what} failed");
    Error::Transport(format!("{what} on {port}: {e}"))
}

/// Serial port transport for EMS bus adapters.
pub struct SerialTransport {
    /// The underlying serial port stream
    port: Option<SerialStream>,
    /// Port name for logging/debugging
    port_name: String,
    config: SerialConfig,
    rx: RxBuffer,
}

impl SerialTransport {
    /// Open a serial port at `baud_rate` with default break timing.
    ///
    /// # Arguments
    ///
    /// * `port` - Serial port path (e.g., "/dev/ttyUSB0" on Linux, "COM3" on Windows)
    /// * `baud_rate` - Baud rate, normally 9600
    pub async fn open(port: &str, baud_rate: u32) -> Result<Self> {
        let config = SerialConfig {
            baud_rate,
            ..Default::default()
        };
        Self::open_with_config(port, config).await
    }

    /// Open a serial port with full configuration control.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use emsbus_transport::{SerialTransport, SerialConfig};
    /// # use std::time::Duration;
    /// # async fn example() -> emsbus_core::Result<()> {
    /// let config = SerialConfig {
    ///     break_gap: Duration::from_millis(3),
    ///     ..SerialConfig::default()
    /// };
    /// let transport = SerialTransport::open_with_config("/dev/ttyUSB0", config).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn open_with_config(port: &str, config: SerialConfig) -> Result<Self> {
        tracing::debug!(
            port = %port,
            baud_rate = config.baud_rate,
            break_gap = ?config.break_gap,
            break_duration = ?config.break_duration,
            "Opening serial port"
        );

        let mut serial_stream = tokio_serial::new(port, config.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| {
                tracing::error!(port = %port, error = %e, "Failed to open serial port");
                Error::Transport(format!("Failed to open serial port {}: {}", port, e))
            })?;

        // Several EMS adapters draw their bus-side supply through DTR/RTS
        // and hold the transmitter in reset while either is asserted.
        if let Err(e) = serial_stream.write_data_terminal_ready(false) {
            tracing::warn!(port = %port, error = %e, "Failed to de-assert DTR");
        }
        if let Err(e) = serial_stream.write_request_to_send(false) {
            tracing::warn!(port = %port, error = %e, "Failed to de-assert RTS");
        }

        tracing::info!(port = %port, baud_rate = config.baud_rate, "Serial port opened successfully");

        Ok(Self {
            port: Some(serial_stream),
            port_name: port.to_string(),
            rx: RxBuffer::new(config.break_gap),
            config,
        })
    }

    /// Get the name of the serial port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Drain whatever the driver has buffered, without waiting.
    async fn read_pending(&mut self) -> Result<Vec<u8>> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;
        let mut received = Vec::new();
        let mut chunk = [0u8; 64];
        loop {
            match tokio::time::timeout(Duration::ZERO, port.read(&mut chunk)).await {
                Ok(Ok(0)) => return Err(Error::ConnectionLost),
                Ok(Ok(n)) => {
                    received.extend_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        break;
                    }
                }
                Ok(Err(e)) => return Err(io_error(&self.port_name, e)),
                Err(_) => break,
            }
        }
        Ok(received)
    }

    fn discard_input(&mut self) -> Result<()> {
        self.rx.clear();
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;
        port.clear(ClearBuffer::Input)
            .map_err(|e| port_error(&self.port_name, "Clearing input buffer", e))
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn available(&mut self) -> Result<usize> {
        let received = self.read_pending().await?;
        let now = Instant::now();
        if !received.is_empty() {
            tracing::trace!(port = %self.port_name, data = ?received, "Received data");
            self.rx.ingest(&received, now);
        }
        self.rx.settle(now);
        Ok(self.rx.len())
    }

    fn peek(&self) -> Option<u8> {
        self.rx.peek()
    }

    fn read(&mut self) -> Option<u8> {
        self.rx.pop()
    }

    async fn flush(&mut self) -> Result<()> {
        self.discard_input()
    }

    async fn write(&mut self, byte: u8) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(port = %self.port_name, byte = format_args!("0x{byte:02X}"), "Sending byte");

        port.write_all(&[byte])
            .await
            .map_err(|e| io_error(&self.port_name, e))?;
        port.flush().await.map_err(|e| io_error(&self.port_name, e))
    }

    async fn write_end_of_frame(&mut self) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        port.set_break()
            .map_err(|e| port_error(&self.port_name, "Setting break", e))?;
        tokio::time::sleep(self.config.break_duration).await;
        port.clear_break()
            .map_err(|e| port_error(&self.port_name, "Clearing break", e))?;

        tracing::trace!(port = %self.port_name, "Sent break");

        // The receiver sees its own break; it is not bus data.
        self.discard_input()
    }

    fn frame_error(&mut self) -> bool {
        self.rx.take_frame_error()
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            tracing::debug!(port = %self.port_name, "Closing serial port");

            if let Err(e) = port.flush().await {
                tracing::warn!(
                    port = %self.port_name,
                    error = %e,
                    "Failed to flush before closing (continuing anyway)"
                );
            }
            self.rx.clear();

            tracing::info!(port = %self.port_name, "Serial port closed");
        }

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.port.is_some() {
            tracing::debug!(port = %self.port_name, "SerialTransport dropped, closing port");
        }
    }
}
