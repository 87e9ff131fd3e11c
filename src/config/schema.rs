//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use super::error::{ConfigError, ConfigResult};
use crate::port::loopback::{saturating_millis, DEFAULT_CAPACITY, DEFAULT_CLOSE_SETTLE};
use crate::port::settings::{
    validate_baud_rate, DataBits, FlowControl, Parity, PortSettings, StopBits, DEFAULT_BAUD_RATE,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Loopback channel configuration
    pub channel: ChannelConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Check every section for values the channel would reject.
    pub fn validate(&self) -> ConfigResult<()> {
        self.channel.validate()
    }
}

/// Loopback channel configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Address handed to `open()`
    pub port: String,
    /// Maximum number of bytes in flight
    pub capacity: usize,
    /// Baud rate used for advisory transmit timing
    pub baud_rate: u32,
    /// Read timeout in milliseconds; omit to block
    pub read_timeout_ms: Option<u64>,
    /// Write timeout in milliseconds; omit to block
    pub write_timeout_ms: Option<u64>,
    /// Pause taken by `close()` in milliseconds
    pub close_settle_ms: u64,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            port: "loop://".to_string(),
            capacity: DEFAULT_CAPACITY,
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: None,
            write_timeout_ms: None,
            close_settle_ms: saturating_millis(DEFAULT_CLOSE_SETTLE),
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
        }
    }
}

impl ChannelConfig {
    /// Get the read timeout as Duration
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    /// Get the write timeout as Duration
    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_ms.map(Duration::from_millis)
    }

    /// Get the close settle pause as Duration
    pub fn close_settle(&self) -> Duration {
        Duration::from_millis(self.close_settle_ms)
    }

    /// Port settings described by this section.
    pub fn settings(&self) -> PortSettings {
        PortSettings {
            baud_rate: self.baud_rate,
            data_bits: self.data_bits,
            flow_control: self.flow_control,
            parity: self.parity,
            stop_bits: self.stop_bits,
            read_timeout: self.read_timeout(),
            write_timeout: self.write_timeout(),
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.capacity == 0 {
            return Err(ConfigError::OutOfRange {
                key: "channel.capacity",
                reason: "must be at least 1",
            });
        }
        validate_baud_rate(u64::from(self.baud_rate))?;
        Ok(())
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive: "trace", "debug", "info", "warn", "error" or a
    /// full `EnvFilter` expression
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}
