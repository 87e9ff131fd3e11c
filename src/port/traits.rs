//! Core trait for serial port abstraction.
//!
//! Defines the `SerialPortAdapter` trait so code driving a port can be
//! written once and handed a [`LoopbackChannel`] in tests or a wrapper
//! around it elsewhere.

use super::error::PortError;
use super::loopback::LoopbackChannel;
use std::sync::Arc;
use std::time::Duration;

/// Trait for serial port I/O operations.
///
/// All methods take `&self`: implementors are shared between a reading and
/// a writing thread.
pub trait SerialPortAdapter: Send + Sync + std::fmt::Debug {
    /// Write bytes to the serial port.
    ///
    /// Returns the number of bytes actually written.
    fn write_bytes(&self, data: &[u8]) -> Result<usize, PortError>;

    /// Read up to `size` bytes, honoring the port's read timeout.
    fn read_bytes(&self, size: usize) -> Result<Vec<u8>, PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> String;

    /// Set the read timeout for this port. `None` blocks.
    fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), PortError>;

    /// Clear both input and output buffers.
    fn clear_buffers(&self) -> Result<(), PortError>;

    /// Get the current bytes available to read (if supported).
    ///
    /// Returns `None` if the operation is not supported or cannot be determined.
    fn bytes_to_read(&self) -> Option<usize> {
        None
    }

    /// Get the current bytes waiting to be written (if supported).
    ///
    /// Returns `None` if the operation is not supported or cannot be determined.
    fn bytes_to_write(&self) -> Option<usize> {
        None
    }
}

impl SerialPortAdapter for LoopbackChannel {
    fn write_bytes(&self, data: &[u8]) -> Result<usize, PortError> {
        self.write(data)
    }

    fn read_bytes(&self, size: usize) -> Result<Vec<u8>, PortError> {
        self.read(size)
    }

    fn name(&self) -> String {
        self.port().unwrap_or_default()
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), PortError> {
        LoopbackChannel::set_read_timeout(self, timeout);
        Ok(())
    }

    fn clear_buffers(&self) -> Result<(), PortError> {
        self.reset_input_buffer()?;
        self.reset_output_buffer()
    }

    fn bytes_to_read(&self) -> Option<usize> {
        self.in_waiting().ok()
    }

    fn bytes_to_write(&self) -> Option<usize> {
        self.out_waiting().ok()
    }
}

impl<P: SerialPortAdapter + ?Sized> SerialPortAdapter for Arc<P> {
    fn write_bytes(&self, data: &[u8]) -> Result<usize, PortError> {
        (**self).write_bytes(data)
    }

    fn read_bytes(&self, size: usize) -> Result<Vec<u8>, PortError> {
        (**self).read_bytes(size)
    }

    fn name(&self) -> String {
        (**self).name()
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), PortError> {
        (**self).set_read_timeout(timeout)
    }

    fn clear_buffers(&self) -> Result<(), PortError> {
        (**self).clear_buffers()
    }

    fn bytes_to_read(&self) -> Option<usize> {
        (**self).bytes_to_read()
    }

    fn bytes_to_write(&self) -> Option<usize> {
        (**self).bytes_to_write()
    }
}
