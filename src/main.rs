//! # FC Comms
//!
//! Poll an MSP flight controller over serial and republish its telemetry.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Parse command line, load configuration
//!    - Set up logging with tracing subscriber
//!    - Register telemetry outputs
//!
//! 2. **Main Loop**
//!    - Tick at the configured rate (10Hz by default)
//!    - Reconnect while the link is down, poll STATUS/ANALOG/RC while it is up
//!    - Publish battery voltage and flight status after every clean poll
//!
//! 3. **Graceful Shutdown**
//!    - Ctrl+C stops the tick loop after the cycle in flight
//!    - Close the serial port
//!
//! Expected output:
//! ```text
//! INFO fc_comms: FC Comms v0.1.0 starting...
//! INFO fc_comms::serial: Opened flight controller at /dev/ttyACM0 (115200 baud)
//! INFO fc_comms::comms: Connected to flight controller
//! INFO fc_comms::telemetry: Battery topic="fc_battery" volts=12.6
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use fc_comms::comms::FcComms;
use fc_comms::config::Config;
use fc_comms::serial::SerialLink;
use fc_comms::telemetry::logger::JsonlSink;
use fc_comms::telemetry::{LogSink, TelemetrySink};

/// Configuration file loaded when `--config` is not given, if present
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Poll an MSP flight controller and republish its telemetry
#[derive(Debug, Parser)]
#[command(name = "fc-comms", version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Serial device, overrides `serial.port`
    #[arg(short, long, value_name = "DEVICE")]
    port: Option<String>,

    /// Poll rate in Hz, overrides `comms.tick_rate_hz`
    #[arg(short = 'r', long, value_name = "HZ")]
    tick_rate: Option<u32>,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load {}", DEFAULT_CONFIG_PATH))?,
        None => Config::default(),
    };

    if let Some(port) = &cli.port {
        config.serial.port = port.clone();
    }
    if let Some(rate) = cli.tick_rate {
        config.comms.tick_rate_hz = rate;
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(writer)
        .init();

    info!("FC Comms v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;

    let sink: Box<dyn TelemetrySink> = if config.telemetry.enabled {
        Box::new(JsonlSink::from_config(&config.telemetry))
    } else {
        Box::new(LogSink::new())
    };
    let link = SerialLink::new(&config.serial);

    let mut fc = FcComms::new(link, sink, config.serial.timeout());
    fc.init().await.context("FC Comms initialization failed")?;

    info!("Press Ctrl+C to exit");
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    fc.run(config.comms.tick_rate_hz, shutdown)
        .await
        .context("FC node exited with error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from(["fc-comms", "--port", "/dev/ttyUSB3", "-r", "20"]);
        assert_eq!(cli.port.as_deref(), Some("/dev/ttyUSB3"));
        assert_eq!(cli.tick_rate, Some(20));
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_invalid_tick_rate_override_rejected() {
        let cli = Cli::parse_from([
            "fc-comms",
            "--config",
            "/nonexistent/fc-comms.toml",
        ]);
        assert!(load_config(&cli).is_err());

        let cli = Cli {
            config: None,
            port: None,
            tick_rate: Some(0),
        };
        assert!(load_config(&cli).is_err());
    }
}
