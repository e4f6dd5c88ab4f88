//! Error types for emsbus.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport-layer, bus-protocol, and
//! argument-validation errors are all captured here.

/// The error type for all emsbus operations.
///
/// Bus-level variants (arbitration, corruption, mismatch, missing ack,
/// failed verification, timeout) are retried by the protocol engine until
/// the operation deadline expires; the last one seen is what the caller
/// receives. Transport variants end an operation immediately.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port, adapter, mock expectations).
    #[error("transport error: {0}")]
    Transport(String),

    /// Timed out waiting for a response after sending a request.
    ///
    /// Usually the addressed device is absent or did not understand the
    /// request.
    #[error("timeout waiting for response")]
    Timeout,

    /// The bus master never polled our address before the deadline.
    #[error("no poll for bus address 0x{address:02X} before deadline")]
    BusArbitrationTimeout {
        /// Our own bus address.
        address: u8,
    },

    /// A received frame was too short or failed its CRC check.
    #[error("corrupt frame: {0}")]
    FrameCorruption(String),

    /// A well-formed response did not answer the request that was sent.
    #[error("protocol mismatch: {0}")]
    ProtocolMismatch(String),

    /// A write request was not acknowledged with `0x01`.
    #[error("write not acknowledged (got {got:02X?})")]
    WriteNotAcknowledged {
        /// The byte received instead of the ack, if any.
        got: Option<u8>,
    },

    /// A write was acknowledged but reading the value back returned
    /// something else.
    #[error("write verification failed: wrote 0x{written:02X}, read back 0x{read_back:02X}")]
    WriteVerificationMismatch {
        /// The byte that was written.
        written: u8,
        /// The byte read back from the device.
        read_back: u8,
    },

    /// An argument was outside its documented range. Never touches the bus.
    #[error("invalid parameter: {0}")]
    Validation(String),

    /// No connection to the bus adapter has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the bus adapter was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` for failures caused by bus traffic rather than by the
    /// transport or the caller. These are the kinds the engine retries.
    pub fn is_bus_failure(&self) -> bool {
        matches!(
            self,
            Error::Timeout
                | Error::BusArbitrationTimeout { .. }
                | Error::FrameCorruption(_)
                | Error::ProtocolMismatch(_)
                | Error::WriteNotAcknowledged { .. }
                | Error::WriteVerificationMismatch { .. }
        )
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_transport() {
        let e = Error::Transport("port busy".into());
        assert_eq!(e.to_string(), "transport error: port busy");
    }

    #[test]
    fn error_display_timeout() {
        let e = Error::Timeout;
        assert_eq!(e.to_string(), "timeout waiting for response");
    }

    #[test]
    fn error_display_arbitration() {
        let e = Error::BusArbitrationTimeout { address: 0x0B };
        assert_eq!(e.to_string(), "no poll for bus address 0x0B before deadline");
    }

    #[test]
    fn error_display_not_acknowledged() {
        let e = Error::WriteNotAcknowledged { got: Some(0x04) };
        assert_eq!(e.to_string(), "write not acknowledged (got Some(04))");
        let e = Error::WriteNotAcknowledged { got: None };
        assert_eq!(e.to_string(), "write not acknowledged (got None)");
    }

    #[test]
    fn error_display_verification() {
        let e = Error::WriteVerificationMismatch {
            written: 0x2A,
            read_back: 0x28,
        };
        assert_eq!(
            e.to_string(),
            "write verification failed: wrote 0x2A, read back 0x28"
        );
    }

    #[test]
    fn error_display_validation() {
        let e = Error::Validation("temperature out of range".into());
        assert_eq!(e.to_string(), "invalid parameter: temperature out of range");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn bus_failures_are_classified() {
        assert!(Error::Timeout.is_bus_failure());
        assert!(Error::BusArbitrationTimeout { address: 0x0B }.is_bus_failure());
        assert!(Error::FrameCorruption("crc".into()).is_bus_failure());
        assert!(Error::ProtocolMismatch("type".into()).is_bus_failure());
        assert!(Error::WriteNotAcknowledged { got: None }.is_bus_failure());
        assert!(
            Error::WriteVerificationMismatch {
                written: 1,
                read_back: 2
            }
            .is_bus_failure()
        );

        assert!(!Error::Validation("x".into()).is_bus_failure());
        assert!(!Error::Transport("x".into()).is_bus_failure());
        assert!(!Error::NotConnected.is_bus_failure());
        assert!(!Error::ConnectionLost.is_bus_failure());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
