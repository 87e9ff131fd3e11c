//! Per-channel diagnostic logging.
//!
//! A [`DiagnosticSink`] is attached to a channel when its address carries a
//! `logging=<level>` option. Events go through `tracing` on the
//! [`DIAGNOSTIC_TARGET`] target and are dropped below the sink's level.
//! Emitting never changes what the channel does.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `tracing` target used by every channel diagnostic.
pub const DIAGNOSTIC_TARGET: &str = "loop_serial::loop";

/// Severity accepted by the `logging` address option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub const ALL: [LogLevel; 4] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a severity name is not one of the four known ones.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level: {0:?}")]
pub struct UnknownLogLevel(pub String);

impl FromStr for LogLevel {
    type Err = UnknownLogLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| UnknownLogLevel(s.to_string()))
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warning => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Optional observability sink owned by a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticSink {
    level: LogLevel,
}

impl DiagnosticSink {
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }

    /// Create a sink and make sure some subscriber will print its events.
    pub fn install(level: LogLevel) -> Self {
        crate::logging::ensure_default(level);
        let sink = Self::new(level);
        sink.debug(format_args!("enabled logging"));
        sink
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level
    }

    pub fn emit(&self, level: LogLevel, message: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        match level {
            LogLevel::Debug => tracing::debug!(target: DIAGNOSTIC_TARGET, "{}", message),
            LogLevel::Info => tracing::info!(target: DIAGNOSTIC_TARGET, "{}", message),
            LogLevel::Warning => tracing::warn!(target: DIAGNOSTIC_TARGET, "{}", message),
            LogLevel::Error => tracing::error!(target: DIAGNOSTIC_TARGET, "{}", message),
        }
    }

    pub fn debug(&self, message: fmt::Arguments<'_>) {
        self.emit(LogLevel::Debug, message);
    }

    pub fn info(&self, message: fmt::Arguments<'_>) {
        self.emit(LogLevel::Info, message);
    }
}
