//! chilwaterd - The chilwater irrigation daemon
//!
//! This is the main entry point of the daemon. It wires together:
//! - Configuration loading
//! - Hardware (Raspberry Pi or simulated)
//! - The orchestration core: sensors, controllers and the Pumper
//! - Signal handling for shutdown, reload and status dumps

use anyhow::{Context, Result};
use clap::Parser;
use chilwater_config::{load_config, Setup};
use chilwater_core::System;
use chilwater_hw_api::{Hardware, MockHardware};
use chilwater_hw_linux::LinuxHardware;
use chilwater_util::default_config_path;
use std::path::PathBuf;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// chilwaterd - Sensor-driven pump control for unattended irrigation
#[derive(Parser, Debug)]
#[command(name = "chilwaterd")]
#[command(about = "Sensor-driven pump control for unattended irrigation", long_about = None)]
struct Args {
    /// Configuration file path (default: /var/lib/chilwater/conf/chilwater.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Use simulated sensors and pumps instead of the GPIO/SPI hardware
    #[arg(long, env = "CHILWATER_SIMULATE")]
    simulate: bool,
}

/// What a received signal asks the daemon to do
enum SignalEvent {
    Shutdown(&'static str),
    Reload,
    Dump,
}

struct Signals {
    term: Signal,
    int: Signal,
    hup: Signal,
    usr1: Signal,
}

impl Signals {
    fn install() -> Result<Self> {
        Ok(Self {
            term: signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?,
            int: signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?,
            hup: signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?,
            usr1: signal(SignalKind::user_defined1())
                .context("Failed to create SIGUSR1 handler")?,
        })
    }

    async fn next(&mut self) -> SignalEvent {
        tokio::select! {
            _ = self.term.recv() => SignalEvent::Shutdown("SIGTERM"),
            _ = self.int.recv() => SignalEvent::Shutdown("SIGINT"),
            _ = self.hup.recv() => SignalEvent::Reload,
            _ = self.usr1.recv() => SignalEvent::Dump,
        }
    }
}

/// How a run cycle ended
enum CycleEnd {
    Exit,
    Reload,
}

struct Daemon {
    args: Args,
    signals: Signals,
}

impl Daemon {
    fn hardware(&self, setup: &Setup) -> Box<dyn Hardware> {
        if self.args.simulate {
            warn!("Running with simulated hardware");
            Box::new(MockHardware::new())
        } else {
            Box::new(LinuxHardware::new(
                &setup.hardware.gpio_root,
                &setup.hardware.spi_device,
            ))
        }
    }

    /// Probes and pumps keep what they need of the hardware alive, so the
    /// factory itself is dropped once the System is built.
    fn build_system(&self) -> Result<System> {
        let setup = load_config(&self.args.config)
            .with_context(|| format!("Failed to load config from {:?}", self.args.config))?;

        info!(
            config_path = %self.args.config.display(),
            pumps = setup.pumps.len(),
            sensors = setup.sensors.len(),
            controllers = setup.controllers.len(),
            "Configuration loaded"
        );

        let hardware = self.hardware(&setup);
        System::build(&setup, hardware.as_ref()).context("Failed to build system")
    }

    /// Run one System until a signal ends it
    async fn run_cycle(&mut self, mut system: System) -> CycleEnd {
        system.start();
        info!("Daemon running");

        loop {
            match self.signals.next().await {
                SignalEvent::Shutdown(name) => {
                    info!(signal = name, "Shutting down gracefully");
                    system.shutdown().await;
                    return CycleEnd::Exit;
                }
                SignalEvent::Reload => {
                    info!("Received SIGHUP, reloading configuration");
                    system.shutdown().await;
                    return CycleEnd::Reload;
                }
                SignalEvent::Dump => match serde_json::to_string(&system.snapshot()) {
                    Ok(json) => info!(snapshot = %json, "System snapshot"),
                    Err(e) => warn!(error = %e, "Failed to serialize snapshot"),
                },
            }
        }
    }

    /// Stay down after a failed reload until the next SIGHUP or a shutdown
    async fn wait_while_down(&mut self) -> CycleEnd {
        loop {
            match self.signals.next().await {
                SignalEvent::Shutdown(name) => {
                    info!(signal = name, "Shutting down");
                    return CycleEnd::Exit;
                }
                SignalEvent::Reload => return CycleEnd::Reload,
                SignalEvent::Dump => warn!("No system running, nothing to report"),
            }
        }
    }

    async fn run(mut self) -> Result<()> {
        // The first configuration must be valid; later ones may be fixed and
        // reloaded while the daemon is down.
        let system = self.build_system()?;
        let mut end = self.run_cycle(system).await;

        while let CycleEnd::Reload = end {
            end = match self.build_system() {
                Ok(system) => self.run_cycle(system).await,
                Err(e) => {
                    error!(
                        error = %format!("{e:#}"),
                        "Reload failed, pumps stay off until the next SIGHUP"
                    );
                    self.wait_while_down().await
                }
            };
        }

        info!("Shutdown complete");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if args.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        now = %chilwater_util::format_datetime_full(&chilwater_util::now()),
        mock_time = chilwater_util::is_mock_time_active(),
        "chilwaterd starting"
    );

    let signals = Signals::install()?;
    Daemon { args, signals }.run().await
}
