//! emsbus-test-harness: Test utilities and mock transports for emsbus.
//!
//! This crate provides [`MockBus`] for deterministic testing of the
//! protocol engine without a boiler or a bus adapter. It can replay a
//! scripted request/response exchange or simulate device memory, and it
//! plays the bus master by polling our address whenever the line is idle.

pub mod mock_bus;

pub use mock_bus::{MockBus, build_frame};
