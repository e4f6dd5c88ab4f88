//! Transport trait for EMS bus communication.
//!
//! The [`Transport`] trait abstracts over the physical link to the bus. The
//! protocol engine in `emsbus-protocol` works purely against this byte-level
//! contract, so the same engine runs on a USB serial adapter
//! (`emsbus-transport`) and on the scripted `MockBus` from
//! `emsbus-test-harness`.
//!
//! The EMS bus delimits frames with a line break rather than a terminator
//! byte. A break arrives as a `0x00` byte flagged with a framing error, so
//! every received byte carries a frame-error marker alongside its value.

use async_trait::async_trait;

use crate::error::Result;

/// Asynchronous byte-level transport to an EMS bus.
///
/// Implementations own the receive buffer. [`available()`](Self::available)
/// pulls whatever the line has delivered into that buffer; [`peek()`] and
/// [`read()`] consume from it without waiting.
///
/// [`peek()`]: Self::peek
/// [`read()`]: Self::read
#[async_trait]
pub trait Transport: Send + Sync {
    /// Number of received bytes ready to be read.
    async fn available(&mut self) -> Result<usize>;

    /// The next received byte, without consuming it.
    fn peek(&self) -> Option<u8>;

    /// Consume the next received byte.
    ///
    /// Also latches that byte's frame-error marker, which
    /// [`frame_error()`](Self::frame_error) then reports.
    fn read(&mut self) -> Option<u8>;

    /// Discard everything received so far.
    async fn flush(&mut self) -> Result<()>;

    /// Transmit a single byte.
    async fn write(&mut self, byte: u8) -> Result<()>;

    /// Transmit the end-of-frame marker (a line break).
    ///
    /// Bytes the receiver picks up while the break is on the line must not
    /// appear as data afterwards.
    async fn write_end_of_frame(&mut self) -> Result<()>;

    /// Whether the last byte returned by [`read()`](Self::read) carried a
    /// frame error. Reading the flag resets it.
    fn frame_error(&mut self) -> bool;

    /// Close the transport connection.
    ///
    /// Afterwards every async method returns
    /// [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
