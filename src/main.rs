// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

//! uart-bridge: forwards bytes between a serial port and a wireless peer

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, FromArgMatches, Parser};
use tracing::{error, info};

use uart_bridge_config::{
    load_config, load_config_or_default, validate_config, BridgeConfig, ConsoleFormat,
};
use uart_bridge_core::{event_queue, Coordinator, CoordinatorConfig};
use uart_bridge_observability::{
    debug_flags_help, init_logging, parse_debug_flags, strip_debug_flags, FileLogging,
    LogFormat, LoggingOptions,
};
use uart_bridge_transports::{
    SerialPortIo, SerialReceiver, SessionAdapter, StreamLink, StreamLinkConfig,
};

/// How often the main thread checks on the bridge threads
const SUPERVISE_INTERVAL: Duration = Duration::from_millis(200);

/// Serial <-> wireless byte bridge with flow control
#[derive(Parser, Debug)]
#[command(name = "uart-bridge", version, author, long_about = None)]
struct Args {
    /// Path to uart_bridge.toml (searched for when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial device, overrides `serial.port`
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate, overrides `serial.baud_rate`
    #[arg(short, long)]
    baud: Option<u32>,

    /// Wireless listen address, overrides `wireless.listen_address`
    #[arg(short, long)]
    listen: Option<String>,

    /// Log at debug level
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Console log format, overrides `logging.format`
    #[arg(long, value_parser = ["text", "json"])]
    log_format: Option<String>,

    /// Write log files (requires the `file-logging` feature)
    #[arg(long, default_value_t = false)]
    log_files: bool,

    /// Print the effective configuration and exit
    #[arg(long, default_value_t = false)]
    print_config: bool,
}

impl Args {
    /// CLI overrides in the form understood by the config loader
    fn overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        if let Some(port) = &self.port {
            overrides.insert("serial_port".to_string(), port.clone());
        }
        if let Some(baud) = self.baud {
            overrides.insert("baud_rate".to_string(), baud.to_string());
        }
        if let Some(listen) = &self.listen {
            overrides.insert("listen_address".to_string(), listen.clone());
        }
        if self.verbose {
            overrides.insert("log_level".to_string(), "debug".to_string());
        }
        if let Some(format) = &self.log_format {
            overrides.insert("log_format".to_string(), format.clone());
        }
        if self.log_files {
            overrides.insert("file_logging".to_string(), "true".to_string());
        }
        overrides
    }
}

fn parse_args() -> Args {
    // `--debug-<crate>` flags are read by the observability crate
    let matches = Args::command()
        .after_help(debug_flags_help())
        .get_matches_from(strip_debug_flags(std::env::args()));
    Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

fn load(args: &Args) -> Result<(BridgeConfig, Option<PathBuf>)> {
    let overrides = args.overrides();
    let loaded = match &args.config {
        Some(path) => load_config(Some(path), Some(&overrides))
            .map(|config| (config, Some(path.clone())))
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => load_config_or_default(Some(&overrides)).context("Failed to load configuration")?,
    };
    validate_config(&loaded.0)?;
    Ok(loaded)
}

fn logging_options(config: &BridgeConfig) -> LoggingOptions {
    let logging = &config.logging;
    LoggingOptions {
        level: logging.level.clone(),
        format: match logging.format {
            ConsoleFormat::Text => LogFormat::Text,
            ConsoleFormat::Json => LogFormat::Json,
        },
        file: logging.file_logging.then(|| FileLogging {
            log_dir: logging.log_dir.clone(),
            retention_days: logging.retention_days,
            retention_runs: logging.retention_runs,
        }),
    }
}

fn main() -> Result<()> {
    let args = parse_args();
    let (config, config_path) = load(&args)?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let _logging = init_logging(&parse_debug_flags(), &logging_options(&config))?;
    match &config_path {
        Some(path) => info!("configuration loaded from {}", path.display()),
        None => info!("no configuration file found, using defaults"),
    }

    run(&config)
}

fn run(config: &BridgeConfig) -> Result<()> {
    let serial = SerialPortIo::open(&config.serial)?;
    let serial_writer = serial
        .try_clone()
        .context("Failed to clone serial port handle")?;

    let (events, queue) = event_queue(config.bridge.queue_capacity);

    let adapter = SessionAdapter::new(events.clone(), config.wireless.max_inbound_size);
    let (link, mut link_service) = StreamLink::bind(StreamLinkConfig::from(&config.wireless), adapter)?;

    let coordinator = Coordinator::new(
        CoordinatorConfig {
            staging_capacity: config.bridge.staging_capacity,
            max_inbound_size: config.wireless.max_inbound_size,
        },
        link,
        serial_writer,
    )
    .spawn(queue)
    .context("Failed to spawn coordinator thread")?;

    let mut receiver = SerialReceiver::spawn(serial, config.serial.rx_chunk_size, events)
        .context("Failed to spawn serial receiver thread")?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    info!(
        "bridging {} <-> {} (Press Ctrl+C to stop)",
        config.serial.port,
        link_service.local_addr()
    );

    let mut failure = None;
    while running.load(Ordering::Relaxed) {
        thread::sleep(SUPERVISE_INTERVAL);
        if coordinator.is_finished() {
            failure = Some("bridge coordinator stopped unexpectedly");
            break;
        }
        if !receiver.is_running() {
            failure = Some("serial receiver stopped");
            break;
        }
    }

    if failure.is_none() {
        info!("shutdown signal received");
    }

    // Dropping every producer lets the coordinator drain and return
    if let Some(stats) = receiver.stop() {
        info!(
            "serial receiver: {} chunks, {} bytes, {} overflows, {} queue stalls",
            stats.chunks, stats.bytes, stats.overflows, stats.queue_stalls
        );
    }
    link_service.stop();
    drop(link_service);

    match coordinator.join() {
        Ok(stats) => info!(stats = %serde_json::to_string(&stats)?, "bridge stopped"),
        Err(_) => bail!("bridge coordinator thread panicked"),
    }

    if let Some(reason) = failure {
        error!("{}", reason);
        bail!(reason);
    }
    Ok(())
}
