//! Errors raised while loading, checking or saving a configuration.

use crate::port::PortError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file '{path}' is not valid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot encode configuration: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("cannot write config file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value the channel could accept but that would leave it unusable.
    #[error("'{key}' {reason}")]
    OutOfRange {
        key: &'static str,
        reason: &'static str,
    },

    /// The channel itself rejected a setting.
    #[error("channel setting rejected: {0}")]
    Channel(#[from] PortError),

    #[error("{var}={value:?} is not a valid {expected}")]
    Env {
        var: String,
        value: String,
        expected: &'static str,
    },

    /// `save()` on a loader that was not loaded from a file.
    #[error("no config file path; use save_to")]
    NoPath,
}

pub type ConfigResult<T> = Result<T, ConfigError>;
