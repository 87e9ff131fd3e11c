//! Loop Serial Library
//!
//! A software serial port whose output is wired back to its input. Bytes
//! written to a [`LoopbackChannel`] come back out of its reads in order,
//! RTS can be read back as CTS and DTR as DSR. Useful for exercising serial
//! code without hardware.
//!
//! # Modules
//!
//! - `port`: The loopback channel plus sync, async and `serialport` adapters
//! - `address`: Decoding of `loop://` addresses
//! - `diagnostics`: Per-channel diagnostic logging requested by the address
//! - `config`: Configuration management with TOML support
//! - `logging`: Subscriber setup

pub mod address;
pub mod config;
pub mod diagnostics;
pub mod logging;
pub mod port;

// Re-export commonly used types for convenience
pub use address::{AddressOption, LoopAddress};
pub use diagnostics::{DiagnosticSink, LogLevel};
pub use port::{
    AsyncPortAdapter, BlockingPortWrapper, ChannelStatus, DataBits, FlowControl, LoopbackChannel,
    LoopbackChannelBuilder, LoopbackPort, Parity, PortError, PortSettings, SerialPortAdapter,
    StopBits,
};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
