//! Async access to blocking ports.
//!
//! [`BlockingPortWrapper`] runs every call of a [`SerialPortAdapter`] on
//! Tokio's blocking pool, so a loopback channel can be driven from async
//! code without stalling the runtime while a read waits for bytes.

use super::error::PortError;
use super::loopback::LoopbackChannel;
use super::traits::SerialPortAdapter;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Async trait for serial port operations using Tokio.
#[async_trait]
pub trait AsyncPortAdapter: Send + Sync {
    /// Write bytes to the port.
    ///
    /// Returns the number of bytes actually written.
    async fn write_bytes(&self, data: &[u8]) -> Result<usize, PortError>;

    /// Read up to `size` bytes under the port's read timeout.
    async fn read_bytes(&self, size: usize) -> Result<Vec<u8>, PortError>;

    /// Get the name/path of this port.
    fn name(&self) -> String;

    /// Get the number of bytes available to read.
    async fn bytes_available(&self) -> Result<usize, PortError>;
}

/// Wrapper that provides an async interface for a blocking port.
///
/// Uses `tokio::task::spawn_blocking` for each operation. The port is held
/// in an `Arc`, so a wrapper and the code that created the port can keep
/// using it side by side.
pub struct BlockingPortWrapper<P: SerialPortAdapter + 'static = LoopbackChannel> {
    inner: Arc<P>,
}

impl<P: SerialPortAdapter + 'static> BlockingPortWrapper<P> {
    pub fn new(port: Arc<P>) -> Self {
        Self { inner: port }
    }

    pub fn inner(&self) -> &Arc<P> {
        &self.inner
    }

    async fn run<T, F>(&self, op: F) -> Result<T, PortError>
    where
        T: Send + 'static,
        F: FnOnce(&P) -> Result<T, PortError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&inner))
            .await
            .map_err(|e| PortError::Io(std::io::Error::other(e)))?
    }
}

impl BlockingPortWrapper<LoopbackChannel> {
    /// Open a loopback channel at `address` and wrap it.
    pub async fn open(address: impl Into<String>) -> Result<Self, PortError> {
        let address = address.into();
        let channel = tokio::task::spawn_blocking(move || LoopbackChannel::open_url(address))
            .await
            .map_err(|e| PortError::Io(std::io::Error::other(e)))??;
        Ok(Self::new(Arc::new(channel)))
    }

    /// Close the channel, waking any pending read. The settle pause runs on
    /// the blocking pool.
    pub async fn close(&self) -> Result<(), PortError> {
        self.run(|channel| {
            channel.close();
            Ok(())
        })
        .await
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) {
        LoopbackChannel::set_read_timeout(&self.inner, timeout);
    }
}

impl<P: SerialPortAdapter + 'static> Clone for BlockingPortWrapper<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl<P: SerialPortAdapter + 'static> AsyncPortAdapter for BlockingPortWrapper<P> {
    async fn write_bytes(&self, data: &[u8]) -> Result<usize, PortError> {
        let data = data.to_vec();
        self.run(move |port| port.write_bytes(&data)).await
    }

    async fn read_bytes(&self, size: usize) -> Result<Vec<u8>, PortError> {
        self.run(move |port| port.read_bytes(size)).await
    }

    fn name(&self) -> String {
        self.inner.name()
    }

    async fn bytes_available(&self) -> Result<usize, PortError> {
        self.run(|port| port.bytes_to_read().ok_or(PortError::NotOpen))
            .await
    }
}

impl<P: SerialPortAdapter + 'static> std::fmt::Debug for BlockingPortWrapper<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingPortWrapper")
            .field("inner", &self.inner)
            .finish()
    }
}
