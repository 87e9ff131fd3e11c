//! Subscriber setup for the binary and for address-requested diagnostics.

use crate::config::{LogFormat, LoggingConfig};
use crate::diagnostics::{LogLevel, DIAGNOSTIC_TARGET};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber described by `config`.
///
/// `RUST_LOG` takes precedence over `config.level` when it is set.
pub fn init(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    }
}

/// Make sure channel diagnostics at `level` reach stderr.
///
/// Installs a minimal subscriber for [`DIAGNOSTIC_TARGET`] only when the
/// process has none yet. Returns `true` if this call installed it.
pub fn ensure_default(level: LogLevel) -> bool {
    if tracing::dispatcher::has_been_set() {
        return false;
    }

    let directive = match level {
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warning => "warn",
        LogLevel::Error => "error",
    };
    let filter = EnvFilter::new(format!("{DIAGNOSTIC_TARGET}={directive}"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_default_installs_once() {
        // Whichever call wins, a later one must not replace it.
        let _ = ensure_default(LogLevel::Info);
        assert!(tracing::dispatcher::has_been_set());
        assert!(!ensure_default(LogLevel::Debug));
    }

    #[test]
    fn test_init_after_default_fails() {
        let _ = ensure_default(LogLevel::Error);
        assert!(init(&LoggingConfig::default()).is_err());
    }
}
