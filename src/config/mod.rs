//! Configuration module for loop-serial.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `LOOP_SERIAL_CONFIG` environment variable (explicit path)
//! 2. `./loop-serial.toml` (current directory)
//! 3. `~/.config/loop-serial/loop-serial.toml` (XDG on Linux/macOS)
//! 4. `%APPDATA%\loop-serial\loop-serial.toml` (Windows)
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Any configuration value can be overridden via environment variables.
//! The pattern is: `LOOP_SERIAL_<SECTION>_<KEY>`
//!
//! Examples:
//! - `LOOP_SERIAL_CHANNEL_CAPACITY=64`
//! - `LOOP_SERIAL_CHANNEL_WRITE_TIMEOUT_MS=500`
//! - `LOOP_SERIAL_LOGGING_FORMAT=json`
//!
//! # Example
//!
//! ```rust,no_run
//! use loop_serial::config::ConfigLoader;
//! use loop_serial::LoopbackChannel;
//!
//! let loader = ConfigLoader::load()?;
//! let channel = LoopbackChannel::from_config(&loader.config().channel);
//! channel.open()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{find_config_file, ConfigLoader};
pub use schema::{ChannelConfig, Config, LogFormat, LoggingConfig};
