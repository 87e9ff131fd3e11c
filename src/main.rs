use clap::Parser;
use loop_serial::config::{ConfigLoader, LogFormat};
use loop_serial::{AsyncPortAdapter, BlockingPortWrapper, LoopbackChannel, PortError};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "loop-serial",
    version,
    about = "Send a message through a software loopback serial port and read it back.",
    long_about = "Opens a loop:// channel, writes the message, reads the same number of bytes back and prints a report. Settings come from loop-serial.toml and LOOP_SERIAL_* variables; flags override both."
)]
struct Args {
    /// Message to send through the loopback.
    #[arg(default_value = "hello, loopback")]
    message: String,

    /// Channel address, e.g. loop://?logging=debug
    #[arg(short, long)]
    url: Option<String>,

    /// Baud rate used for advisory transmit timing.
    #[arg(short, long)]
    baud: Option<u32>,

    /// Read timeout in milliseconds.
    #[arg(long)]
    read_timeout_ms: Option<u64>,

    /// Write timeout in milliseconds.
    #[arg(long)]
    write_timeout_ms: Option<u64>,

    /// Path to a config file instead of the standard locations.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter directive, e.g. "debug" or "loop_serial=trace".
    #[arg(long)]
    log_level: Option<String>,

    /// Print the report as JSON and log as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Report {
    sent: usize,
    received: usize,
    matched: bool,
    echo: String,
    elapsed_ms: u128,
    status: loop_serial::ChannelStatus,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let loader = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let mut config = loader.into_config();

    if let Some(url) = args.url {
        config.channel.port = url;
    }
    if let Some(baud) = args.baud {
        config.channel.baud_rate = baud;
    }
    if args.read_timeout_ms.is_some() {
        config.channel.read_timeout_ms = args.read_timeout_ms;
    }
    if args.write_timeout_ms.is_some() {
        config.channel.write_timeout_ms = args.write_timeout_ms;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if args.json {
        config.logging.format = LogFormat::Json;
    }
    config.validate()?;

    loop_serial::logging::init(&config.logging)?;
    debug!(?config, "configuration resolved");

    let channel = LoopbackChannel::from_config(&config.channel);
    let port = {
        let channel = Arc::new(channel);
        let opener = Arc::clone(&channel);
        tokio::task::spawn_blocking(move || opener.open()).await??;
        BlockingPortWrapper::new(channel)
    };
    info!(port = %port.name(), "channel open");

    let payload = args.message.into_bytes();
    let started = Instant::now();

    // Close on every path so a reader still waiting on the blocking pool
    // is woken before the runtime shuts down.
    let outcome = echo(&port, &payload).await;
    let elapsed = started.elapsed();
    let status = port.inner().status();
    port.close().await?;
    let (sent, echoed) = match outcome {
        Ok(pair) => pair,
        Err(e) => {
            error!(error = %e, "loopback echo failed");
            return Err(e.into());
        }
    };

    let report = Report {
        sent,
        received: echoed.len(),
        matched: echoed == payload,
        echo: String::from_utf8_lossy(&echoed).into_owned(),
        elapsed_ms: elapsed.as_millis(),
        status,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("sent {} bytes, received {} bytes in {:?}", report.sent, report.received, elapsed);
        println!("echo: {}", report.echo);
        if !report.matched {
            println!("echo did not match the message");
        }
    }

    if report.matched {
        Ok(())
    } else {
        Err("loopback echo mismatch".into())
    }
}

/// Write `payload` while a concurrent task reads the same number of bytes
/// back, so messages longer than the capacity still fit.
async fn echo(port: &BlockingPortWrapper, payload: &[u8]) -> Result<(usize, Vec<u8>), PortError> {
    let reader = {
        let port = port.clone();
        let len = payload.len();
        tokio::spawn(async move { port.read_bytes(len).await })
    };
    let sent = port.write_bytes(payload).await?;
    let echoed = reader
        .await
        .map_err(|e| PortError::Io(std::io::Error::other(e)))??;
    Ok((sent, echoed))
}
