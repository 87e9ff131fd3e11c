//! Port layer: the loopback channel and the adapters around it.
//!
//! [`LoopbackChannel`] is the port itself. [`SerialPortAdapter`] and
//! [`AsyncPortAdapter`] abstract over it for sync and async callers, and
//! [`LoopbackPort`] plugs it into code written for the `serialport` crate.

pub mod async_port;
pub mod compat;
pub mod error;
pub mod loopback;
pub mod queue;
pub mod settings;
pub mod traits;

pub use async_port::{AsyncPortAdapter, BlockingPortWrapper};
pub use compat::LoopbackPort;
pub use error::PortError;
pub use loopback::{ChannelStatus, LoopbackChannel, LoopbackChannelBuilder};
pub use settings::{DataBits, FlowControl, Parity, PortSettings, StopBits};
pub use traits::SerialPortAdapter;
