//! Mock EMS bus for deterministic testing of the protocol engine.
//!
//! [`MockBus`] implements the [`Transport`] trait and plays the part of the
//! bus master and every addressed device:
//!
//! - whenever nothing else is queued it emits a poll frame for our own
//!   address (`addr | 0x80` followed by a break), so arbitration succeeds
//!   on the first try;
//! - each frame we transmit (the bytes written before the end-of-frame
//!   marker) is recorded and answered either from a scripted
//!   request/response queue or from simulated device memory;
//! - answers are delivered only after the sender flushes away its own
//!   echo, the way a real device answers a few milliseconds later.
//!
//! The handle is cheap to clone. Keep one clone in the test and hand the
//! other to the engine to inspect traffic afterwards.
//!
//! # Example
//!
//! ```
//! use emsbus_test_harness::{MockBus, build_frame};
//!
//! let bus = MockBus::new(0x0B);
//! // When the engine asks RC35 (0x10) for one byte of message 0x06 at
//! // offset 5, answer with 0x2A.
//! bus.expect(
//!     &build_frame([0x0B, 0x90, 0x06, 0x05], &[0x01]),
//!     &build_frame([0x10, 0x0B, 0x06, 0x05], &[0x2A]),
//! );
//! assert_eq!(bus.remaining_expectations(), 1);
//! ```

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use emsbus_core::crc::crc8;
use emsbus_core::error::{Error, Result};
use emsbus_core::transport::Transport;

/// Flag set on the destination byte of read requests.
const READ_FLAG: u8 = 0x80;

/// Ack byte returned for accepted writes.
const DEFAULT_ACK: u8 = 0x01;

/// Build a frame with its CRC appended (no break terminator).
///
/// `header` is `[source, destination, message type, offset]`.
pub fn build_frame(header: [u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(header.len() + payload.len() + 1);
    frame.extend_from_slice(&header);
    frame.extend_from_slice(payload);
    frame.push(crc8(&frame));
    frame
}

/// A pre-loaded request/response pair for the mock bus.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact frame we expect to be transmitted (including CRC).
    request: Vec<u8>,
    /// The bytes to deliver in reply, without break. Empty means silence.
    response: Vec<u8>,
}

#[derive(Debug)]
struct BusState {
    own_address: u8,
    silent: bool,
    connected: bool,
    expectations: VecDeque<Expectation>,
    /// Simulated device memory, keyed by `(device address, message type)`.
    memory: HashMap<(u8, u8), Vec<u8>>,
    drop_writes: bool,
    ack: u8,
    /// Received bytes with their frame-error marker.
    rx: VecDeque<(u8, bool)>,
    /// Reply waiting for the sender to flush its echo.
    pending: Option<Vec<u8>>,
    injected: VecDeque<Vec<u8>>,
    tx: Vec<u8>,
    sent_log: Vec<Vec<u8>>,
    frame_error: bool,
    calls: usize,
    polls: usize,
}

impl BusState {
    fn new(own_address: u8, silent: bool) -> Self {
        BusState {
            own_address,
            silent,
            connected: true,
            expectations: VecDeque::new(),
            memory: HashMap::new(),
            drop_writes: false,
            ack: DEFAULT_ACK,
            rx: VecDeque::new(),
            pending: None,
            injected: VecDeque::new(),
            tx: Vec::new(),
            sent_log: Vec::new(),
            frame_error: false,
            calls: 0,
            polls: 0,
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.calls += 1;
        if self.connected {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }

    fn push_frame(&mut self, frame: &[u8]) {
        self.rx.extend(frame.iter().map(|&b| (b, false)));
        self.rx.push_back((0x00, true));
    }

    /// Answer a transmitted frame from device memory.
    fn simulate(&mut self, frame: &[u8]) -> Option<Vec<u8>> {
        if frame.len() != 6 || crc8(&frame[..5]) != frame[5] {
            return None;
        }
        let (src, dest, msg_type, offset, value) =
            (frame[0], frame[1], frame[2], frame[3] as usize, frame[4]);

        if dest & READ_FLAG != 0 {
            let device = dest & !READ_FLAG;
            let payload = self.memory.get(&(device, msg_type))?;
            let start = offset.min(payload.len());
            let end = (offset + value as usize).min(payload.len());
            Some(build_frame(
                [device, src, msg_type, offset as u8],
                &payload[start..end],
            ))
        } else {
            let drop_writes = self.drop_writes;
            let payload = self.memory.get_mut(&(dest, msg_type))?;
            if !drop_writes && offset < payload.len() {
                payload[offset] = value;
            }
            Some(vec![self.ack])
        }
    }
}

/// A mock [`Transport`] standing in for an EMS bus with a master and devices.
#[derive(Debug, Clone)]
pub struct MockBus {
    state: Arc<Mutex<BusState>>,
}

impl MockBus {
    /// Create a bus whose master polls `own_address`.
    pub fn new(own_address: u8) -> Self {
        MockBus {
            state: Arc::new(Mutex::new(BusState::new(own_address, false))),
        }
    }

    /// Create a bus that never delivers a single byte.
    pub fn silent() -> Self {
        MockBus {
            state: Arc::new(Mutex::new(BusState::new(0, true))),
        }
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add an expected request/response pair.
    ///
    /// `request` is the full transmitted frame including CRC. `response` is
    /// delivered verbatim followed by a break; pass an empty slice to have
    /// the device stay silent.
    pub fn expect(&self, request: &[u8], response: &[u8]) {
        self.state().expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    /// Install simulated memory for one message of one device.
    ///
    /// Frames not covered by scripted expectations are answered from here.
    pub fn load_message(&self, device: u8, msg_type: u8, payload: &[u8]) {
        self.state()
            .memory
            .insert((device, msg_type), payload.to_vec());
    }

    /// Current simulated memory for a message, if loaded.
    pub fn message(&self, device: u8, msg_type: u8) -> Option<Vec<u8>> {
        self.state().memory.get(&(device, msg_type)).cloned()
    }

    /// Acknowledge writes without storing them.
    pub fn drop_writes(&self, drop: bool) {
        self.state().drop_writes = drop;
    }

    /// Byte returned to acknowledge simulated writes (default `0x01`).
    pub fn ack_byte(&self, ack: u8) {
        self.state().ack = ack;
    }

    /// Queue foreign bus traffic to be delivered before the next poll.
    pub fn inject_frame(&self, frame: &[u8]) {
        self.state().injected.push_back(frame.to_vec());
    }

    /// Every frame transmitted so far, one entry per end-of-frame marker.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.state().sent_log.clone()
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.state().expectations.len()
    }

    /// Number of transport calls made, of any kind.
    pub fn call_count(&self) -> usize {
        self.state().calls
    }

    /// Number of poll frames emitted for our address.
    pub fn poll_count(&self) -> usize {
        self.state().polls
    }

    /// Set the connected state of the mock bus.
    ///
    /// When set to `false`, subsequent async calls return
    /// [`Error::NotConnected`].
    pub fn set_connected(&self, connected: bool) {
        self.state().connected = connected;
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new(0x0B)
    }
}

#[async_trait]
impl Transport for MockBus {
    async fn available(&mut self) -> Result<usize> {
        let mut state = self.state();
        state.enter()?;

        if state.silent {
            return Ok(0);
        }
        if state.rx.is_empty() {
            if let Some(reply) = state.pending.take() {
                state.push_frame(&reply);
            } else if let Some(frame) = state.injected.pop_front() {
                state.push_frame(&frame);
            } else {
                let poll = state.own_address | READ_FLAG;
                state.push_frame(&[poll]);
                state.polls += 1;
            }
        }
        Ok(state.rx.len())
    }

    fn peek(&self) -> Option<u8> {
        self.state().rx.front().map(|&(b, _)| b)
    }

    fn read(&mut self) -> Option<u8> {
        let mut state = self.state();
        let (byte, error) = state.rx.pop_front()?;
        state.frame_error = error;
        Some(byte)
    }

    async fn flush(&mut self) -> Result<()> {
        let mut state = self.state();
        state.enter()?;
        state.rx.clear();
        state.frame_error = false;
        Ok(())
    }

    async fn write(&mut self, byte: u8) -> Result<()> {
        let mut state = self.state();
        state.enter()?;
        state.tx.push(byte);
        Ok(())
    }

    async fn write_end_of_frame(&mut self) -> Result<()> {
        let mut state = self.state();
        state.enter()?;

        let frame = std::mem::take(&mut state.tx);
        state.sent_log.push(frame.clone());

        if let Some(expectation) = state.expectations.pop_front() {
            if frame != expectation.request {
                return Err(Error::Transport(format!(
                    "unexpected frame: expected {:02X?}, got {:02X?}",
                    expectation.request, frame
                )));
            }
            state.pending = (!expectation.response.is_empty()).then_some(expectation.response);
            Ok(())
        } else if !state.memory.is_empty() {
            state.pending = state.simulate(&frame);
            Ok(())
        } else {
            Err(Error::Transport(
                "no more expectations in mock bus".into(),
            ))
        }
    }

    fn frame_error(&mut self) -> bool {
        std::mem::take(&mut self.state().frame_error)
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.state();
        state.connected = false;
        state.rx.clear();
        state.pending = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state().connected
    }
}
