//! Address decoding and configuration loading from files and environment.

use loop_serial::config::{ChannelConfig, ConfigError, ConfigLoader, LogFormat};
use loop_serial::{LogLevel, LoopAddress, LoopbackChannel, PortError};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_every_level_opens_with_a_sink() {
    for level in LogLevel::ALL {
        let channel = LoopbackChannel::builder()
            .port(format!("loop://?logging={level}"))
            .close_settle(Duration::ZERO)
            .build();

        channel.open().unwrap();

        assert_eq!(channel.diagnostics(), Some(level));
        channel.close();
    }
}

#[test]
fn test_rejected_addresses() {
    let cases = [
        "",
        "serial:///dev/ttyS0",
        "loop://?logging=verbose",
        "loop://?baudrate=9600",
        "loop://?logging=info&color=1",
    ];

    for address in cases {
        let result = LoopAddress::parse(address);
        assert!(
            matches!(result, Err(PortError::AddressFormat(_))),
            "{address:?} should be rejected"
        );
    }
}

#[test]
fn test_error_message_names_expected_form() {
    let err = LoopAddress::parse("loop://?nope=1").unwrap_err();
    assert_eq!(
        err.to_string(),
        "expected a string in the form \"loop://[?logging={debug|info|warning|error}]\": unknown option: \"nope\""
    );
}

#[test]
#[serial]
fn test_load_from_file() {
    // Arrange
    let file = write_config(
        r#"
        [channel]
        port = "loop://?logging=warning"
        capacity = 32
        baud_rate = 57600
        read_timeout_ms = 100
        close_settle_ms = 0

        [logging]
        level = "debug"
        format = "json"
        "#,
    );

    // Act
    let loader = ConfigLoader::load_from(file.path()).unwrap();
    let config = loader.config();

    // Assert
    assert_eq!(config.channel.port, "loop://?logging=warning");
    assert_eq!(config.channel.capacity, 32);
    assert_eq!(config.channel.read_timeout(), Some(Duration::from_millis(100)));
    assert_eq!(config.channel.write_timeout(), None);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(loader.path(), Some(file.path()));
}

#[test]
#[serial]
fn test_channel_from_loaded_config() {
    let file = write_config(
        r#"
        [channel]
        capacity = 3
        baud_rate = 19200
        write_timeout_ms = 20
        close_settle_ms = 0
        "#,
    );
    let config = ConfigLoader::load_from(file.path()).unwrap().into_config();

    let channel = LoopbackChannel::from_config(&config.channel);
    channel.open().unwrap();

    assert_eq!(channel.capacity(), 3);
    assert_eq!(channel.baud_rate(), 19200);
    assert!(matches!(channel.write(b"four"), Err(PortError::WriteTimeout(_))));
    assert_eq!(channel.in_waiting().unwrap(), 3);
}

#[test]
#[serial]
fn test_env_overrides_file() {
    let file = write_config("[channel]\nbaud_rate = 4800\n");
    std::env::set_var("LOOP_SERIAL_CHANNEL_BAUD_RATE", "38400");
    std::env::set_var("LOOP_SERIAL_LOGGING_FORMAT", "compact");

    let result = ConfigLoader::load_from(file.path());

    std::env::remove_var("LOOP_SERIAL_CHANNEL_BAUD_RATE");
    std::env::remove_var("LOOP_SERIAL_LOGGING_FORMAT");
    let config = result.unwrap().into_config();
    assert_eq!(config.channel.baud_rate, 38400);
    assert_eq!(config.logging.format, LogFormat::Compact);
}

#[test]
#[serial]
fn test_config_env_var_selects_file() {
    let file = write_config("[channel]\ncapacity = 77\n");
    std::env::set_var("LOOP_SERIAL_CONFIG", file.path());

    let result = ConfigLoader::load();

    std::env::remove_var("LOOP_SERIAL_CONFIG");
    let loader = result.unwrap();
    assert_eq!(loader.config().channel.capacity, 77);
}

#[test]
#[serial]
fn test_invalid_file_values_are_rejected() {
    let file = write_config("[channel]\ncapacity = 0\n");
    let err = ConfigLoader::load_from(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::OutOfRange { key: "channel.capacity", .. }));

    let file = write_config("[channel]\nbaud_rate = \"fast\"\n");
    let err = ConfigLoader::load_from(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { ref path, .. } if path == file.path()));
}

#[test]
#[serial]
fn test_zero_baud_rate_is_a_channel_error() {
    let file = write_config("[channel]
baud_rate = 0
");

    let err = ConfigLoader::load_from(file.path()).unwrap_err();

    assert!(matches!(err, ConfigError::Channel(PortError::InvalidBaudRate(0))));
    assert_eq!(err.to_string(), "channel setting rejected: Invalid baud rate: 0");
}

#[test]
#[serial]
fn test_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("loop-serial.toml");

    let mut loader = ConfigLoader::with_defaults();
    loader.config_mut().channel.capacity = 128;
    loader.save_to(&path).unwrap();

    let mut reloaded = ConfigLoader::load_from(&path).unwrap();
    assert_eq!(reloaded.config().channel, ChannelConfig {
        capacity: 128,
        ..ChannelConfig::default()
    });

    std::fs::write(&path, "[channel]\ncapacity = 256\n").unwrap();
    reloaded.reload().unwrap();
    assert_eq!(reloaded.config().channel.capacity, 256);
}
