//! hidkb entry point.
//!
//! Wires the engine to the loopback transport and the in-memory registry,
//! then drives one session from the command line: register, connect to the
//! chosen (or first configured) bonded device, type the given text, exit.
//! Without `--text` it stays connected and idle until Ctrl-C, logging every
//! status change.
//!
//! ```text
//! main()
//!  └─ load_config()          -- TOML from the platform config dir
//!  └─ KeyboardEngine::new()  -- spawns the event pump
//!       ├─ LoopbackTransport       (simulated host)
//!       └─ MemoryDeviceRegistry    (seeded from config.devices)
//!  └─ status loop            -- reacts to PairedReady / session end / Ctrl-C
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hidkb_core::{ConnectionStatus, Device};
use hidkb_engine::application::engine::{EngineStatus, KeyboardEngine};
use hidkb_engine::infrastructure::bridge;
use hidkb_engine::infrastructure::registry::{DeviceRegistry, MemoryDeviceRegistry};
use hidkb_engine::infrastructure::storage::config::{config_file_path, load_config, save_config};
use hidkb_engine::infrastructure::transport::loopback::LoopbackTransport;
use hidkb_engine::infrastructure::transport::{KeyboardDescriptor, Transport};

/// HID boot-protocol keyboard emulator.
#[derive(Debug, Parser)]
#[command(name = "hidkb", version, about)]
struct Cli {
    /// Text to type once a host connection is up.
    #[arg(long)]
    text: Option<String>,

    /// Per-character base delay in milliseconds (5–200).
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Add random 5–50 ms jitter to each keystroke.
    #[arg(long)]
    jitter: bool,

    /// Add a random 5–400 ms pause after each word.
    #[arg(long)]
    word_pause: bool,

    /// Address of the bonded device to connect to.  Defaults to the first
    /// device in the configuration.
    #[arg(long)]
    device: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config().context("loading configuration")?;

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.engine.log_level)),
        )
        .init();

    info!("hidkb starting");

    // Persist defaults on first run so there is a file to edit.
    if let Ok(path) = config_file_path() {
        if !path.exists() {
            match save_config(&config) {
                Ok(()) => info!(path = %path.display(), "wrote default configuration"),
                Err(e) => warn!(error = %e, "could not write default configuration"),
            }
        }
    }

    // Seed the registry from configuration; without any configured device
    // fall back to one synthetic host so the loopback demo works end-to-end.
    let mut devices: Vec<Device> = config
        .devices
        .iter()
        .map(|d| Device::bonded(&d.address, &d.name))
        .collect();
    if devices.is_empty() {
        devices.push(Device::bonded("F0:0D:CA:FE:00:01", "loopback host"));
    }

    let (events_tx, events_rx) = tokio::sync::mpsc::channel(64);
    let transport = Arc::new(LoopbackTransport::new(events_tx.clone()));
    let registry = Arc::new(MemoryDeviceRegistry::new(devices, events_tx));

    let descriptor = KeyboardDescriptor {
        name: config.engine.device_name.clone(),
        ..KeyboardDescriptor::default()
    };
    let (engine, mut status_rx) = KeyboardEngine::new(
        Arc::clone(&transport) as Arc<dyn Transport>,
        Arc::clone(&registry) as Arc<dyn DeviceRegistry>,
        events_rx,
        descriptor,
        Duration::from_millis(config.engine.bond_settle_delay_ms),
    );

    engine.initialize().await?;

    let listed = bridge::get_paired_devices(&engine).await.data.unwrap_or_default();
    for device in &listed {
        info!(name = %device.name, address = %device.address, "bonded device");
    }

    let target = match cli.device.clone() {
        Some(address) => address,
        // Non-empty by construction above.
        None => listed[0].address.clone(),
    };
    engine.connect_to_device(&target).await?;

    let delay_ms = cli.delay_ms.unwrap_or(config.typing.delay_ms);
    let jitter = cli.jitter || config.typing.letter_jitter;
    let word_pause = cli.word_pause || config.typing.word_pause;

    // React to pushed status changes: start typing once the link is up, exit
    // when the session completes (or on Ctrl-C).
    let mut session_started = false;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received; shutting down");
                let _ = engine.stop_typing();
                break;
            }
            status = status_rx.recv() => {
                let Some(status) = status else { break };
                info!(%status, "status");
                match &status {
                    EngineStatus::Connection(ConnectionStatus::PairedReady)
                        if !session_started =>
                    {
                        match &cli.text {
                            Some(text) => {
                                session_started = true;
                                let message = engine
                                    .start_typing(text, delay_ms, jitter, word_pause)
                                    .await?;
                                info!("{message}");
                            }
                            None => info!("connected; no --text given, idling until Ctrl-C"),
                        }
                    }
                    EngineStatus::Connection(status) if session_started => {
                        // The worker restored the connection status: done.
                        info!(%status, "typing session finished");
                        break;
                    }
                    EngineStatus::Connection(ConnectionStatus::Error(reason)) => {
                        warn!(%reason, "engine entered error state");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("hidkb exiting");
    Ok(())
}
