//! Port-specific error types.
//!
//! Every failure of the loopback channel is reported through [`PortError`].
//! Short reads are not errors and never show up here.

use std::time::Duration;
use thiserror::Error;

/// Hint appended to every address decoding failure.
pub const ADDRESS_FORMAT_HINT: &str =
    "expected a string in the form \"loop://[?logging={debug|info|warning|error}]\"";

/// Errors that can occur during loopback port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// Attempted to open a port that's already open.
    #[error("Port is already open")]
    AlreadyOpen,

    /// `open()` was called before a target address was supplied.
    #[error("Port must be configured before it can be used")]
    NotConfigured,

    /// The address string could not be decoded.
    #[error("{hint}: {0}", hint = ADDRESS_FORMAT_HINT)]
    AddressFormat(String),

    /// Baud rate outside of (0, 2^32).
    #[error("Invalid baud rate: {0}")]
    InvalidBaudRate(u64),

    /// Attempted to use a port that's not open.
    #[error("Port is not open")]
    NotOpen,

    /// A write could not be completed within the configured write timeout.
    #[error("Write timeout after {0:?}")]
    WriteTimeout(Duration),

    /// An I/O error from outside the channel, e.g. a failed blocking task.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PortError {
    /// Create an AddressFormat error from a message.
    pub fn address(message: impl Into<String>) -> Self {
        Self::AddressFormat(message.into())
    }

    /// Create a WriteTimeout error from a duration.
    pub fn write_timeout(duration: Duration) -> Self {
        Self::WriteTimeout(duration)
    }
}

impl From<PortError> for std::io::Error {
    fn from(err: PortError) -> Self {
        let kind = match err {
            PortError::Io(inner) => return inner,
            PortError::NotOpen => std::io::ErrorKind::NotConnected,
            PortError::WriteTimeout(_) => std::io::ErrorKind::TimedOut,
            PortError::AlreadyOpen => std::io::ErrorKind::AlreadyExists,
            PortError::NotConfigured
            | PortError::AddressFormat(_)
            | PortError::InvalidBaudRate(_) => std::io::ErrorKind::InvalidInput,
        };
        std::io::Error::new(kind, err)
    }
}

impl From<PortError> for serialport::Error {
    fn from(err: PortError) -> Self {
        let kind = match err {
            PortError::Io(ref inner) => serialport::ErrorKind::Io(inner.kind()),
            PortError::NotOpen => serialport::ErrorKind::NoDevice,
            PortError::WriteTimeout(_) => serialport::ErrorKind::Io(std::io::ErrorKind::TimedOut),
            PortError::AlreadyOpen => {
                serialport::ErrorKind::Io(std::io::ErrorKind::AlreadyExists)
            }
            PortError::NotConfigured
            | PortError::AddressFormat(_)
            | PortError::InvalidBaudRate(_) => serialport::ErrorKind::InvalidInput,
        };
        serialport::Error::new(kind, err.to_string())
    }
}
