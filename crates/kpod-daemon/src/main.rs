//! kpodd - tunes a rigctld-controlled radio from an Elecraft KPod.
//!
//! The daemon polls the KPod over hidraw, turns knob rotation into frequency
//! changes sent to rigctld, and exits when the device goes away or on
//! SIGINT/SIGTERM.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use kpod_hid::{HidrawTransport, KPod};
use kpod_rig::RigClient;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod announce;
mod config;
mod controller;
mod signals;

use announce::CommandAnnouncer;
use config::{Config, LogFormat};
use controller::{DeviceSettings, KnobController};

/// Command-line options. Anything given here overrides the config file.
#[derive(Debug, Parser)]
#[command(name = "kpodd", version, about = "Tune a rigctld radio with an Elecraft KPod")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// rigctld host
    #[arg(short, long)]
    server: Option<String>,

    /// rigctld port
    #[arg(short, long)]
    port: Option<u16>,

    /// KPod hidraw node, e.g. /dev/hidraw2
    #[arg(short, long)]
    device: Option<PathBuf>,

    /// Delay between device polls in milliseconds
    #[arg(short, long)]
    update_interval: Option<u64>,
}

impl Cli {
    fn apply(self, config: &mut Config) {
        if let Some(server) = self.server {
            config.rig.server = server;
        }
        if let Some(port) = self.port {
            config.rig.port = port;
        }
        if let Some(device) = self.device {
            config.device.path = Some(device);
        }
        if let Some(interval) = self.update_interval {
            config.daemon.update_interval_ms = interval;
        }
    }
}

fn init_logging(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.daemon.log_level))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.daemon.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = config::load_config(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    init_logging(&config)?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting kpodd");

    let path = config
        .device
        .path
        .clone()
        .context("No KPod device configured; pass --device or set device.path")?;
    let transport = HidrawTransport::open(&path)
        .with_context(|| format!("Failed to open KPod at {}", path.display()))?;

    let rig = RigClient::new(&config.rig.server, config.rig.port)
        .with_read_timeout(config.rig.read_timeout());
    info!(addr = rig.addr(), "Using rig daemon");

    let announcer = CommandAnnouncer::new(config.announce.command.clone());
    let mut controller = KnobController::new(
        rig,
        KPod::new(transport),
        announcer,
        DeviceSettings::from(&config.device),
    );

    if let Err(e) = controller.on_device_added().await {
        controller.on_device_removed();
        return Err(e).context("Failed to initialise KPod");
    }

    let mut shutdown_rx = signals::setup_signal_handlers()?;
    info!(interval_ms = config.daemon.update_interval_ms, "kpodd running");

    match controller.run(config.update_interval(), &mut shutdown_rx).await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => error!(error = %e, "KPod lost"),
    }

    controller.on_device_removed();
    info!("kpodd stopped");
    Ok(())
}
