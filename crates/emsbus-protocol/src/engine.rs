//! Protocol engine.
//!
//! The engine owns the [`Transport`] and runs one transaction at a time on
//! the bus. A transaction is:
//!
//! 1. wait for the bus master to poll our address (arbitration),
//! 2. transmit a 6-byte request followed by a break,
//! 3. read the answer: a response frame for reads, a single ack byte for
//!    writes,
//! 4. for writes, read the value back and compare.
//!
//! Every public call is retried on bus failures until
//! `base_timeout × retry_factor` has elapsed; transport failures end it at
//! once. All waiting polls [`Transport::available`] against a
//! `tokio::time::Instant` deadline, so nothing here can block forever.

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, trace, warn};

use emsbus_core::error::{Error, Result};
use emsbus_core::transport::Transport;

use crate::frame::{
    self, ACK, FRAME_OVERHEAD, HEADER_LEN, MAX_CHUNK, MAX_READ_FRAME, Response,
};

/// Timing and addressing parameters of the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Our own bus address.
    pub own_address: u8,
    /// Per-attempt response window.
    pub base_timeout: Duration,
    /// Number of `base_timeout` windows an operation may take in total.
    pub retry_factor: u32,
    /// Largest payload requested in one read.
    pub max_chunk: usize,
    /// Sleep between polls of an idle transport.
    pub poll_interval: Duration,
    /// Gap after each transmitted byte.
    pub byte_delay: Duration,
    /// Settle time before and after transmitting a frame.
    pub settle: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            own_address: 0x0B,
            base_timeout: Duration::from_millis(1000),
            retry_factor: 4,
            max_chunk: MAX_CHUNK,
            poll_interval: Duration::from_millis(1),
            byte_delay: Duration::from_millis(3),
            settle: Duration::from_millis(2),
        }
    }
}

impl EngineConfig {
    /// Upper bound on the duration of one public operation.
    pub fn operation_timeout(&self) -> Duration {
        self.base_timeout * self.retry_factor
    }

    fn chunk_size(&self) -> usize {
        self.max_chunk.clamp(1, MAX_CHUNK)
    }
}

/// Runs EMS transactions over a transport.
pub struct Engine {
    transport: Box<dyn Transport>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(transport: Box<dyn Transport>, config: EngineConfig) -> Self {
        Engine { transport, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Close the underlying transport.
    pub async fn close(&mut self) -> Result<()> {
        self.transport.close().await
    }

    /// Read `len` payload bytes of a message, starting at payload `offset`.
    ///
    /// `buf` is a frame-sized buffer: each chunk's payload lands at
    /// `4 + chunk offset`, so a whole message read into a buffer of
    /// `payload_len + 6` bytes leaves the payload at `buf[4..]`. Reads longer
    /// than the chunk size are split into several requests; any failed
    /// chunk fails the attempt and the whole read is retried.
    pub async fn read(
        &mut self,
        dest: u8,
        msg_type: u8,
        offset: u8,
        len: usize,
        buf: &mut [u8],
    ) -> Result<()> {
        let deadline = Instant::now() + self.config.operation_timeout();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let err = match self.read_once(dest, msg_type, offset, len, buf, deadline).await {
                Ok(()) => return Ok(()),
                Err(e) if !e.is_bus_failure() => return Err(e),
                Err(e) => e,
            };
            debug!(
                attempt,
                dest = format_args!("0x{dest:02X}"),
                msg_type = format_args!("0x{msg_type:02X}"),
                error = %err,
                "read attempt failed"
            );
            if Instant::now() >= deadline {
                warn!(
                    attempts = attempt,
                    dest = format_args!("0x{dest:02X}"),
                    msg_type = format_args!("0x{msg_type:02X}"),
                    error = %err,
                    "giving up on read"
                );
                return Err(err);
            }
        }
    }

    /// Write one byte at payload `offset` and verify it by reading it back.
    pub async fn write(&mut self, dest: u8, msg_type: u8, offset: u8, value: u8) -> Result<()> {
        let deadline = Instant::now() + self.config.operation_timeout();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let err = match self.write_once(dest, msg_type, offset, value, deadline).await {
                Ok(()) => return Ok(()),
                Err(e) if !e.is_bus_failure() => return Err(e),
                Err(e) => e,
            };
            debug!(
                attempt,
                dest = format_args!("0x{dest:02X}"),
                msg_type = format_args!("0x{msg_type:02X}"),
                offset,
                error = %err,
                "write attempt failed"
            );
            if Instant::now() >= deadline {
                warn!(
                    attempts = attempt,
                    dest = format_args!("0x{dest:02X}"),
                    msg_type = format_args!("0x{msg_type:02X}"),
                    offset,
                    error = %err,
                    "giving up on write"
                );
                return Err(err);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Single attempts
    // -----------------------------------------------------------------------

    async fn read_once(
        &mut self,
        dest: u8,
        msg_type: u8,
        offset: u8,
        len: usize,
        buf: &mut [u8],
        deadline: Instant,
    ) -> Result<()> {
        let chunk = self.config.chunk_size();
        let mut done = 0;
        while done < len {
            let part = chunk.min(len - done);
            let chunk_offset = u8::try_from(offset as usize + done).map_err(|_| {
                Error::Validation(format!("read offset {} out of range", offset as usize + done))
            })?;

            let response = self
                .read_chunk(dest, msg_type, chunk_offset, part as u8, deadline)
                .await?;

            let start = HEADER_LEN + response.offset as usize;
            let end = start + response.payload.len();
            if end > buf.len() {
                return Err(Error::ProtocolMismatch(format!(
                    "chunk at offset {} with {} bytes overflows {}-byte buffer",
                    response.offset,
                    response.payload.len(),
                    buf.len()
                )));
            }
            buf[start..end].copy_from_slice(&response.payload);
            done += part;
        }
        Ok(())
    }

    async fn read_chunk(
        &mut self,
        dest: u8,
        msg_type: u8,
        offset: u8,
        len: u8,
        deadline: Instant,
    ) -> Result<Response> {
        let request =
            frame::encode_read_request(self.config.own_address, dest, msg_type, offset, len);
        debug!(
            dest = format_args!("0x{dest:02X}"),
            msg_type = format_args!("0x{msg_type:02X}"),
            offset,
            len,
            "read chunk"
        );
        self.send_request(&request, deadline).await?;

        let window = Instant::now() + self.config.base_timeout;
        if !self.wait_available(window).await? {
            return Err(Error::Timeout);
        }

        let mut raw = [0u8; MAX_READ_FRAME];
        let frame_len = (len as usize + FRAME_OVERHEAD).min(MAX_READ_FRAME);
        let (n, _) = self.read_frame(&mut raw[..frame_len], window).await?;
        trace!(frame = ?&raw[..n], "response");
        frame::decode_response(&raw[..n], msg_type)
    }

    async fn write_once(
        &mut self,
        dest: u8,
        msg_type: u8,
        offset: u8,
        value: u8,
        deadline: Instant,
    ) -> Result<()> {
        let request =
            frame::encode_write_request(self.config.own_address, dest, msg_type, offset, value);
        debug!(
            dest = format_args!("0x{dest:02X}"),
            msg_type = format_args!("0x{msg_type:02X}"),
            offset,
            value,
            "write"
        );
        self.send_request(&request, deadline).await?;

        let window = Instant::now() + self.config.base_timeout;
        if !self.wait_available(window).await? {
            return Err(Error::WriteNotAcknowledged { got: None });
        }
        let mut raw = [0u8; 2];
        let (n, _) = self.read_frame(&mut raw, window).await?;
        let got = (n > 0).then_some(raw[0]);
        if got != Some(ACK) {
            return Err(Error::WriteNotAcknowledged { got });
        }

        let response = self.read_chunk(dest, msg_type, offset, 1, deadline).await?;
        let read_back = match (response.offset == offset, response.payload.first()) {
            (true, Some(&b)) => b,
            _ => {
                return Err(Error::ProtocolMismatch(format!(
                    "read-back at offset {} returned {} bytes at offset {}",
                    offset,
                    response.payload.len(),
                    response.offset
                )));
            }
        };
        if read_back != value {
            return Err(Error::WriteVerificationMismatch {
                written: value,
                read_back,
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Bus access
    // -----------------------------------------------------------------------

    /// Wait for our poll, then transmit `request`.
    async fn send_request(&mut self, request: &[u8], deadline: Instant) -> Result<()> {
        let own = self.config.own_address;
        self.transport.flush().await?;

        let arbitration = (Instant::now() + self.config.operation_timeout()).min(deadline);
        let mut raw = [0u8; MAX_READ_FRAME];
        loop {
            let (n, terminated) = self.read_frame(&mut raw, arbitration).await?;
            if frame::is_poll_for(&raw[..n], terminated, own) {
                break;
            }
            if n > 0 {
                trace!(frame = ?&raw[..n], "bus traffic while waiting for poll");
            }
            if Instant::now() >= arbitration {
                return Err(Error::BusArbitrationTimeout { address: own });
            }
        }

        sleep(self.config.settle).await;
        self.send_buffer(request).await
    }

    async fn send_buffer(&mut self, data: &[u8]) -> Result<()> {
        trace!(frame = ?data, "send");
        for &byte in data {
            self.transport.write(byte).await?;
            sleep(self.config.byte_delay).await;
        }
        self.transport.write_end_of_frame().await?;
        sleep(self.config.settle).await;
        // Drop the echo of our own frame.
        self.transport.flush().await
    }

    /// Read one frame into `buf`.
    ///
    /// Returns the number of bytes read, break byte included, and whether
    /// the frame ended on a break. Stops early when `buf` is full or the
    /// deadline passes. Whatever is left in the receive buffer afterwards
    /// is discarded.
    async fn read_frame(&mut self, buf: &mut [u8], deadline: Instant) -> Result<(usize, bool)> {
        while self.transport.available().await? > 0 && self.transport.peek() == Some(0x00) {
            self.transport.read();
        }
        self.transport.frame_error();

        let mut len = 0;
        let mut terminated = false;
        while len < buf.len() {
            if self.transport.available().await? > 0 {
                if let Some(byte) = self.transport.read() {
                    buf[len] = byte;
                    len += 1;
                }
                if self.transport.frame_error() {
                    terminated = true;
                    break;
                }
            } else if Instant::now() >= deadline {
                break;
            } else {
                sleep(self.config.poll_interval).await;
            }
        }

        self.transport.flush().await?;
        Ok((len, terminated))
    }

    async fn wait_available(&mut self, deadline: Instant) -> Result<bool> {
        loop {
            if self.transport.available().await? > 0 {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(self.config.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emsbus_test_harness::{MockBus, build_frame};

    fn engine(bus: &MockBus) -> Engine {
        Engine::new(Box::new(bus.clone()), EngineConfig::default())
    }

    fn with_break(mut frame: Vec<u8>) -> Vec<u8> {
        frame.push(0x00);
        frame
    }

    fn program_payload() -> Vec<u8> {
        (0..99u8).map(|i| i.wrapping_mul(7)).collect()
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn read_single_byte() {
        let bus = MockBus::new(0x0B);
        bus.expect(
            &build_frame([0x0B, 0x90, 0x06, 0x05], &[0x01]),
            &build_frame([0x10, 0x0B, 0x06, 0x05], &[0x2A]),
        );
        let mut eng = engine(&bus);

        let mut buf = [0u8; 14];
        eng.read(0x10, 0x06, 5, 1, &mut buf).await.unwrap();

        assert_eq!(buf[9], 0x2A);
        assert_eq!(bus.remaining_expectations(), 0);
        assert_eq!(bus.sent_data(), vec![vec![0x0B, 0x90, 0x06, 0x05, 0x01, 0x47]]);
    }

    #[tokio::test(start_paused = true)]
    async fn read_just_over_one_chunk() {
        let bus = MockBus::new(0x0B);
        let payload: Vec<u8> = (1..=27).collect();
        bus.load_message(0x08, 0x18, &payload);
        let mut eng = engine(&bus);

        let mut buf = vec![0u8; 33];
        eng.read(0x08, 0x18, 0, 27, &mut buf).await.unwrap();

        assert_eq!(&buf[4..31], payload.as_slice());
        assert_eq!(bus.sent_data().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn segmented_read_matches_unsegmented_payload() {
        let bus = MockBus::new(0x0B);
        let payload = program_payload();
        bus.load_message(0x10, 0x3F, &payload);
        let mut eng = engine(&bus);

        let mut buf = vec![0u8; 105];
        eng.read(0x10, 0x3F, 0, 99, &mut buf).await.unwrap();

        assert_eq!(&buf[4..103], payload.as_slice());
        let sent = bus.sent_data();
        assert_eq!(sent.len(), frame::chunk_count(99, MAX_CHUNK));
        let chunks: Vec<(u8, u8)> = sent.iter().map(|f| (f[3], f[4])).collect();
        assert_eq!(chunks, vec![(0, 26), (26, 26), (52, 26), (78, 21)]);
    }

    #[tokio::test(start_paused = true)]
    async fn smaller_chunk_size_issues_more_requests() {
        let bus = MockBus::new(0x0B);
        let payload = program_payload();
        bus.load_message(0x10, 0x38, &payload);
        let config = EngineConfig {
            max_chunk: 10,
            ..EngineConfig::default()
        };
        let mut eng = Engine::new(Box::new(bus.clone()), config);

        let mut buf = vec![0u8; 105];
        eng.read(0x10, 0x38, 0, 99, &mut buf).await.unwrap();

        assert_eq!(&buf[4..103], payload.as_slice());
        assert_eq!(bus.sent_data().len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn read_zero_bytes_sends_nothing() {
        let bus = MockBus::new(0x0B);
        let mut eng = engine(&bus);
        let mut buf = [0u8; 6];
        eng.read(0x08, 0x18, 0, 0, &mut buf).await.unwrap();
        assert!(bus.sent_data().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn corrupt_response_is_retried() {
        let bus = MockBus::new(0x0B);
        let request = build_frame([0x0B, 0x90, 0x06, 0x05], &[0x01]);
        let mut bad = build_frame([0x10, 0x0B, 0x06, 0x05], &[0x2A]);
        bad[4] ^= 0x01;
        bus.expect(&request, &bad);
        bus.expect(&request, &build_frame([0x10, 0x0B, 0x06, 0x05], &[0x2A]));
        let mut eng = engine(&bus);

        let mut buf = [0u8; 14];
        eng.read(0x10, 0x06, 5, 1, &mut buf).await.unwrap();

        assert_eq!(buf[9], 0x2A);
        assert_eq!(bus.sent_data().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_message_type_is_retried() {
        let bus = MockBus::new(0x0B);
        let request = build_frame([0x0B, 0x90, 0x06, 0x05], &[0x01]);
        bus.expect(&request, &build_frame([0x10, 0x0B, 0x07, 0x05], &[0x2A]));
        bus.expect(&request, &build_frame([0x10, 0x0B, 0x06, 0x05], &[0x2B]));
        let mut eng = engine(&bus);

        let mut buf = [0u8; 14];
        eng.read(0x10, 0x06, 5, 1, &mut buf).await.unwrap();
        assert_eq!(buf[9], 0x2B);
    }

    #[tokio::test(start_paused = true)]
    async fn chunk_overflowing_buffer_is_mismatch() {
        let bus = MockBus::new(0x0B);
        bus.expect(
            &build_frame([0x0B, 0x90, 0x06, 0x05], &[0x01]),
            &build_frame([0x10, 0x0B, 0x06, 0x40], &[0x2A]),
        );
        let mut eng = engine(&bus);

        let mut buf = [0u8; 14];
        let deadline = Instant::now() + Duration::from_secs(4);
        let err = eng
            .read_once(0x10, 0x06, 5, 1, &mut buf, deadline)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ProtocolMismatch(_)));
        assert_eq!(buf, [0u8; 14]);
    }

    // ---------------------------------------------------------------
    // Arbitration
    // ---------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn foreign_traffic_is_skipped() {
        let bus = MockBus::new(0x0B);
        bus.inject_frame(&build_frame([0x08, 0x10, 0x18, 0x00], &[0x01, 0x02]));
        bus.inject_frame(&[0x88]);
        bus.inject_frame(&[0x90]);
        bus.expect(
            &build_frame([0x0B, 0x90, 0x06, 0x05], &[0x01]),
            &build_frame([0x10, 0x0B, 0x06, 0x05], &[0x11]),
        );
        let mut eng = engine(&bus);

        let mut buf = [0u8; 14];
        eng.read(0x10, 0x06, 5, 1, &mut buf).await.unwrap();

        assert_eq!(buf[9], 0x11);
        assert_eq!(bus.sent_data().len(), 1);
        assert_eq!(bus.poll_count(), 1);
    }

    // ---------------------------------------------------------------
    // Deadlines
    // ---------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn silent_bus_fails_after_operation_timeout() {
        let bus = MockBus::silent();
        let mut eng = engine(&bus);

        let start = Instant::now();
        let mut buf = [0u8; 14];
        let err = eng.read(0x10, 0x06, 5, 1, &mut buf).await.unwrap_err();
        let elapsed = start.elapsed();

        assert!(matches!(err, Error::BusArbitrationTimeout { .. }));
        assert!(elapsed >= Duration::from_millis(4000), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(4100), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn silent_bus_write_is_bounded() {
        let bus = MockBus::silent();
        let config = EngineConfig {
            base_timeout: Duration::from_millis(200),
            retry_factor: 3,
            ..EngineConfig::default()
        };
        let mut eng = Engine::new(Box::new(bus.clone()), config);

        let start = Instant::now();
        assert!(eng.write(0x08, 0x33, 2, 0x37).await.is_err());
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(600), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(700), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_read_reports_last_error() {
        let bus = MockBus::new(0x0B);
        // Memory for another message only: requests get no reply and the
        // next frame seen is a poll.
        bus.load_message(0x08, 0x19, &[0u8; 25]);
        let mut eng = engine(&bus);

        let mut buf = [0u8; 33];
        let err = eng.read(0x08, 0x18, 0, 1, &mut buf).await.unwrap_err();
        assert!(err.is_bus_failure());
        assert!(bus.sent_data().len() > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_is_not_retried() {
        let bus = MockBus::new(0x0B);
        bus.set_connected(false);
        let mut eng = engine(&bus);

        let start = Instant::now();
        let mut buf = [0u8; 14];
        let err = eng.read(0x10, 0x06, 5, 1, &mut buf).await.unwrap_err();

        assert!(matches!(err, Error::NotConnected));
        assert_eq!(bus.call_count(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    // ---------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn write_is_acknowledged_and_verified() {
        let bus = MockBus::new(0x0B);
        bus.load_message(0x08, 0x33, &[0u8; 11]);
        let mut eng = engine(&bus);

        eng.write(0x08, 0x33, 2, 0x37).await.unwrap();

        assert_eq!(bus.message(0x08, 0x33).unwrap()[2], 0x37);
        assert_eq!(
            bus.sent_data(),
            vec![
                vec![0x0B, 0x08, 0x33, 0x02, 0x37, 0x0F],
                vec![0x0B, 0x88, 0x33, 0x02, 0x01, 0x5D],
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn scripted_write_with_ack_and_read_back() {
        let bus = MockBus::new(0x0B);
        bus.expect(&build_frame([0x0B, 0x10, 0x3D, 0x02], &[0x0C]), &[ACK]);
        bus.expect(
            &build_frame([0x0B, 0x90, 0x3D, 0x02], &[0x01]),
            &build_frame([0x10, 0x0B, 0x3D, 0x02], &[0x0C]),
        );
        let mut eng = engine(&bus);

        eng.write(0x10, 0x3D, 2, 0x0C).await.unwrap();
        assert_eq!(bus.remaining_expectations(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn acknowledged_write_with_wrong_read_back_fails() {
        let bus = MockBus::new(0x0B);
        let mut memory = [0u8; 11];
        memory[2] = 0x30;
        bus.load_message(0x08, 0x33, &memory);
        bus.drop_writes(true);
        let mut eng = engine(&bus);

        let err = eng.write(0x08, 0x33, 2, 0x37).await.unwrap_err();

        assert!(matches!(
            err,
            Error::WriteVerificationMismatch {
                written: 0x37,
                read_back: 0x30
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_ack_byte_fails() {
        let bus = MockBus::new(0x0B);
        bus.load_message(0x08, 0x33, &[0u8; 11]);
        bus.ack_byte(0x04);
        let mut eng = engine(&bus);

        let err = eng.write(0x08, 0x33, 2, 0x37).await.unwrap_err();
        assert!(matches!(err, Error::WriteNotAcknowledged { got: Some(0x04) }));
    }

    #[tokio::test(start_paused = true)]
    async fn first_failed_write_attempt_is_retried() {
        let bus = MockBus::new(0x0B);
        let write = build_frame([0x0B, 0x10, 0x3D, 0x02], &[0x0C]);
        bus.expect(&write, &[0x00, 0x04]);
        bus.expect(&write, &[ACK]);
        bus.expect(
            &build_frame([0x0B, 0x90, 0x3D, 0x02], &[0x01]),
            &build_frame([0x10, 0x0B, 0x3D, 0x02], &[0x0C]),
        );
        let mut eng = engine(&bus);

        eng.write(0x10, 0x3D, 2, 0x0C).await.unwrap();
        assert_eq!(bus.sent_data().len(), 3);
    }

    // ---------------------------------------------------------------
    // Frame reading
    // ---------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn read_frame_includes_break_byte() {
        let bus = MockBus::new(0x0B);
        let mut eng = engine(&bus);
        let mut raw = [0u8; MAX_READ_FRAME];
        let deadline = Instant::now() + Duration::from_millis(10);

        let (n, terminated) = eng.read_frame(&mut raw, deadline).await.unwrap();

        assert_eq!(&raw[..n], with_break(vec![0x8B]).as_slice());
        assert!(terminated);
    }

    #[tokio::test(start_paused = true)]
    async fn read_frame_stops_when_buffer_full() {
        let bus = MockBus::new(0x0B);
        bus.inject_frame(&[0x08, 0x0B, 0x18, 0x00, 0x01]);
        let mut eng = engine(&bus);
        let mut raw = [0u8; 3];
        let deadline = Instant::now() + Duration::from_millis(10);

        let (n, terminated) = eng.read_frame(&mut raw, deadline).await.unwrap();

        assert_eq!(n, 3);
        assert!(!terminated);
        assert_eq!(raw, [0x08, 0x0B, 0x18]);
    }
}
