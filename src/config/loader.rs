//! Finds, reads and writes `loop-serial.toml`, with `LOOP_SERIAL_*`
//! environment overrides applied on top.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const ENV_PREFIX: &str = "LOOP_SERIAL";
const CONFIG_PATH_ENV: &str = "LOOP_SERIAL_CONFIG";
const CONFIG_FILE_NAME: &str = "loop-serial.toml";
const APP_DIR_NAME: &str = "loop-serial";

/// A configuration together with the file it came from.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: Option<PathBuf>,
    config: Config,
}

impl ConfigLoader {
    /// Load the first config file found by [`find_config_file`], or the
    /// defaults when there is none. Environment overrides apply either way.
    pub fn load() -> ConfigResult<Self> {
        match find_config_file() {
            Some(path) => Self::load_from(path),
            None => Self::finish(None, Config::default()),
        }
    }

    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let config = read_file(&path)?;
        Self::finish(Some(path), config)
    }

    /// Defaults plus environment overrides. Overrides that fail to parse
    /// are logged and skipped.
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        if let Err(e) = apply_env_overrides(&mut config) {
            tracing::warn!("ignoring environment override: {e}");
        }
        Self { path: None, config }
    }

    fn finish(path: Option<PathBuf>, mut config: Config) -> ConfigResult<Self> {
        apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(Self { path, config })
    }

    /// File the configuration was read from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    /// Write back to the file the configuration was loaded from.
    pub fn save(&self) -> ConfigResult<()> {
        let path = self.path.as_deref().ok_or(ConfigError::NoPath)?;
        write_file(&self.config, path)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        write_file(&self.config, path.as_ref())
    }

    /// Re-read the source file. A loader built from defaults is left as is.
    pub fn reload(&mut self) -> ConfigResult<()> {
        if let Some(path) = self.path.clone() {
            *self = Self::load_from(path)?;
        }
        Ok(())
    }
}

/// First existing file among, in order: `$LOOP_SERIAL_CONFIG`,
/// `./loop-serial.toml`, then `loop-serial/loop-serial.toml` under the
/// platform config directory (`$XDG_CONFIG_HOME`, `~/.config` or
/// `%APPDATA%`).
pub fn find_config_file() -> Option<PathBuf> {
    let explicit = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    let local = Some(PathBuf::from(CONFIG_FILE_NAME));
    let per_user = platform_config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME));

    [explicit, local, per_user]
        .into_iter()
        .flatten()
        .find(|path| path.is_file())
}

#[cfg(target_os = "windows")]
fn platform_config_dir() -> Option<PathBuf> {
    std::env::var_os("APPDATA").map(PathBuf::from)
}

#[cfg(not(target_os = "windows"))]
fn platform_config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

fn read_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(config: &Config, path: &Path) -> ConfigResult<()> {
    let content = toml::to_string_pretty(config)?;
    let write_error = |source: std::io::Error| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    std::fs::write(path, content).map_err(write_error)
}

/// `LOOP_SERIAL_<key>` and its raw value, when set.
fn env_value(key: &str) -> Option<(String, String)> {
    let var = format!("{ENV_PREFIX}_{key}");
    std::env::var(&var).ok().map(|value| (var, value))
}

fn env_parsed<T: FromStr>(key: &str, expected: &'static str) -> ConfigResult<Option<T>> {
    let Some((var, value)) = env_value(key) else {
        return Ok(None);
    };
    match value.trim().parse() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(_) => Err(ConfigError::Env { var, value, expected }),
    }
}

/// Like [`env_parsed`], with `none`, `off` and the empty string meaning
/// "block".
fn env_timeout(key: &str) -> ConfigResult<Option<Option<u64>>> {
    let Some((var, value)) = env_value(key) else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") || trimmed.eq_ignore_ascii_case("off") {
        return Ok(Some(None));
    }
    match trimmed.parse() {
        Ok(ms) => Ok(Some(Some(ms))),
        Err(_) => Err(ConfigError::Env {
            var,
            value,
            expected: "timeout in milliseconds",
        }),
    }
}

/// Overrides follow `LOOP_SERIAL_<SECTION>_<KEY>`, for example
/// `LOOP_SERIAL_CHANNEL_READ_TIMEOUT_MS=none` or `LOOP_SERIAL_LOGGING_LEVEL=debug`.
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    let channel = &mut config.channel;
    if let Some(port) = env_parsed("CHANNEL_PORT", "address")? {
        channel.port = port;
    }
    if let Some(capacity) = env_parsed("CHANNEL_CAPACITY", "capacity")? {
        channel.capacity = capacity;
    }
    if let Some(baud_rate) = env_parsed("CHANNEL_BAUD_RATE", "baud rate")? {
        channel.baud_rate = baud_rate;
    }
    if let Some(timeout) = env_timeout("CHANNEL_READ_TIMEOUT_MS")? {
        channel.read_timeout_ms = timeout;
    }
    if let Some(timeout) = env_timeout("CHANNEL_WRITE_TIMEOUT_MS")? {
        channel.write_timeout_ms = timeout;
    }
    if let Some(settle) = env_parsed("CHANNEL_CLOSE_SETTLE_MS", "settle time in milliseconds")? {
        channel.close_settle_ms = settle;
    }

    let logging = &mut config.logging;
    if let Some(level) = env_parsed("LOGGING_LEVEL", "filter directive")? {
        logging.level = level;
    }
    if let Some(format) = env_parsed("LOGGING_FORMAT", "log format")? {
        logging.format = format;
    }
    Ok(())
}
