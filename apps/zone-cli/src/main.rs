//! SoundTouch Zone - command-line controller for a group of SoundTouch speakers.
//!
//! Every invocation discovers the speakers on the local network first, then
//! runs one command against the whole group. Nothing is persisted between
//! runs.

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use soundtouch_core::{
    ControllerConfig, DeviceInfo, FadeOptions, Key, SoundTouchClientImpl, SsdpClient,
    ZoneCoordinator, ZoneReport,
};
use tokio::signal;

/// SoundTouch Zone - discover, group and control SoundTouch speakers.
#[derive(Parser, Debug)]
#[command(name = "soundtouch-zone")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE", env = "SOUNDTOUCH_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "SOUNDTOUCH_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Device name preferred as zone master (overrides config file).
    #[arg(short, long)]
    master_name: Option<String>,

    /// Address to probe directly, in addition to SSDP (repeatable, overrides config file).
    #[arg(short, long = "fallback", value_name = "ADDRESS", value_delimiter = ',')]
    fallback: Vec<String>,

    /// Number of SSDP search rounds (overrides config file).
    #[arg(short, long)]
    rounds: Option<u32>,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover speakers and show the registry.
    Detect,

    /// Group every discovered speaker under the master.
    Group,

    /// Press keys on every speaker, one key at a time.
    Key {
        /// Key names, e.g. POWER, PRESET_1, play-pause.
        #[arg(required = true, num_args = 1..)]
        keys: Vec<Key>,
    },

    /// Set the volume of every speaker.
    Volume {
        level: u8,
    },

    /// Fade every speaker towards a target volume.
    Fade {
        target: u8,

        /// Starting level (defaults to the configured fade start).
        #[arg(long)]
        from: Option<u8>,

        /// Total fade duration in milliseconds.
        #[arg(long)]
        duration_ms: Option<u64>,

        /// Volume change per step.
        #[arg(long)]
        step: Option<u8>,
    },
}

/// One registry entry as printed by the CLI.
#[derive(Serialize)]
struct DeviceSummary<'a> {
    address: &'a str,
    master: bool,
    #[serde(flatten)]
    info: &'a DeviceInfo,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Output<'a, T: Serialize> {
    devices: Vec<DeviceSummary<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<T>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("SoundTouch Zone v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        config::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(name) = args.master_name.clone() {
        config.master_name = name;
    }
    if !args.fallback.is_empty() {
        config.fallback_addresses = args.fallback.clone();
    }
    if let Some(rounds) = args.rounds {
        config.discovery.rounds = rounds;
    }
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;

    log::info!(
        "Configuration: master_name={:?}, fallback={:?}, rounds={}",
        config.master_name,
        config.fallback_addresses,
        config.discovery.rounds
    );

    let coordinator = ZoneCoordinator::new(
        Arc::new(SoundTouchClientImpl::default()),
        Arc::new(SsdpClient::new()),
        config,
    );

    tokio::select! {
        result = run(&coordinator, &args) => result,
        _ = shutdown_signal() => {
            log::warn!("Interrupted");
            Ok(())
        }
    }
}

async fn run(coordinator: &ZoneCoordinator, args: &Args) -> Result<()> {
    coordinator
        .detect()
        .await
        .context("Discovery could not start")?;

    match &args.command {
        Command::Detect => print_result::<()>(coordinator, args.json, None),
        Command::Group => {
            let report = coordinator
                .group_zone()
                .await
                .context("Failed to group speakers")?;
            if !args.json {
                print_report(&report);
            }
            print_result(coordinator, args.json, Some(&report))
        }
        Command::Key { keys } => {
            coordinator
                .key_sequence(keys)
                .await
                .context("Failed to send keys")?;
            print_result::<()>(coordinator, args.json, None)
        }
        Command::Volume { level } => {
            let level = coordinator
                .volume(*level)
                .await
                .context("Failed to set volume")?;
            print_result(coordinator, args.json, Some(&level))
        }
        Command::Fade {
            target,
            from,
            duration_ms,
            step,
        } => {
            let options = fade_options(coordinator.config(), *from, *duration_ms, *step);
            let level = coordinator
                .volume_fade_in(*target, &options)
                .await
                .context("Failed to fade volume")?;
            print_result(coordinator, args.json, Some(&level))
        }
    }
}

/// Merges fade flags over the configured defaults.
fn fade_options(
    config: &ControllerConfig,
    from: Option<u8>,
    duration_ms: Option<u64>,
    step: Option<u8>,
) -> FadeOptions {
    let defaults = config.fade.to_options();
    FadeOptions {
        start: from.unwrap_or(defaults.start),
        duration: duration_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.duration),
        step: step.unwrap_or(defaults.step).max(1),
    }
}

fn print_result<T: Serialize>(
    coordinator: &ZoneCoordinator,
    json: bool,
    result: Option<&T>,
) -> Result<()> {
    let devices = coordinator.devices();
    let master = coordinator.master();
    let is_master = |address: &str| master.as_ref().is_some_and(|m| m.address() == address);

    if json {
        let output = Output {
            devices: devices
                .iter()
                .map(|d| DeviceSummary {
                    address: d.address(),
                    master: is_master(d.address()),
                    info: d.info(),
                })
                .collect(),
            result,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to encode output")?
        );
        return Ok(());
    }

    if devices.is_empty() {
        println!("No SoundTouch speakers found");
    }
    for device in &devices {
        println!(
            "{} {:<15} {:<20} {} ({})",
            if is_master(device.address()) { "*" } else { " " },
            device.address(),
            device.name(),
            device.device_type(),
            device.device_id()
        );
    }
    Ok(())
}

fn print_report(report: &ZoneReport) {
    println!(
        "Zone master {}: {} joined, {} failed",
        report.master,
        report.joined.len(),
        report.failed.len()
    );
    for failure in &report.failed {
        println!("  {} failed: {}", failure.address, failure.error);
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
