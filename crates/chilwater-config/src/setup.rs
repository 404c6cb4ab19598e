//! Validated setup structures

use crate::schema::{RawConfig, RawController, RawHardwareConfig, RawRule, RawSensor};
use chilwater_api::{Comparator, RuleCondition, SensorKind};
use chilwater_util::{ControllerNr, DailyWindow, PumpNr, SensorNr, TICK_INTERVAL, WallClock};
use std::path::PathBuf;
use std::time::Duration;

/// Default SPI device of the MCP3008
pub const DEFAULT_SPI_DEVICE: &str = "/dev/spidev0.0";

/// Default sysfs GPIO class directory
pub const DEFAULT_GPIO_ROOT: &str = "/sys/class/gpio";

/// Validated setup ready for use by the core
#[derive(Debug, Clone)]
pub struct Setup {
    pub daemon: DaemonSettings,
    pub hardware: HardwareSettings,
    pub pumps: Vec<PumpSpec>,
    pub sensors: Vec<SensorSpec>,
    pub controllers: Vec<ControllerSpec>,
}

impl Setup {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            daemon: DaemonSettings {
                tick_interval: raw
                    .daemon
                    .tick_interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or(TICK_INTERVAL),
            },
            hardware: HardwareSettings::from_raw(raw.hardware),
            pumps: raw
                .pumps
                .into_iter()
                .map(|p| PumpSpec {
                    nr: PumpNr::new(p.nr),
                    gpio: p.gpio,
                    active_low: p.active_low,
                })
                .collect(),
            sensors: raw.sensors.into_iter().map(SensorSpec::from_raw).collect(),
            controllers: raw
                .controllers
                .into_iter()
                .map(ControllerSpec::from_raw)
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DaemonSettings {
    /// Polling interval of every loop
    pub tick_interval: Duration,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            tick_interval: TICK_INTERVAL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HardwareSettings {
    pub spi_device: PathBuf,
    pub gpio_root: PathBuf,
}

impl HardwareSettings {
    fn from_raw(raw: RawHardwareConfig) -> Self {
        Self {
            spi_device: raw
                .spi_device
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SPI_DEVICE)),
            gpio_root: raw
                .gpio_root
                .unwrap_or_else(|| PathBuf::from(DEFAULT_GPIO_ROOT)),
        }
    }
}

impl Default for HardwareSettings {
    fn default() -> Self {
        Self::from_raw(RawHardwareConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct PumpSpec {
    pub nr: PumpNr,
    pub gpio: u32,
    pub active_low: bool,
}

#[derive(Debug, Clone)]
pub struct SensorSpec {
    pub nr: SensorNr,
    pub kind: SensorKind,
    pub channel: String,
}

impl SensorSpec {
    fn from_raw(raw: RawSensor) -> Self {
        Self {
            nr: SensorNr::new(raw.nr),
            kind: raw.kind,
            channel: raw.channel.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerSpec {
    pub nr: ControllerNr,
    pub pump: PumpNr,
    pub sensor: Option<SensorNr>,
    pub rules: Vec<RuleSpec>,
}

impl ControllerSpec {
    fn from_raw(raw: RawController) -> Self {
        Self {
            nr: ControllerNr::new(raw.nr),
            pump: PumpNr::new(raw.pump),
            sensor: raw.sensor.map(SensorNr::new),
            rules: raw.rules.into_iter().map(RuleSpec::from_raw).collect(),
        }
    }
}

/// A rule as configured; `condition` is present for measure rules
#[derive(Debug, Clone)]
pub struct RuleSpec {
    pub name: String,
    pub window: DailyWindow,
    pub pump_seconds: u32,
    pub condition: Option<RuleCondition>,
}

impl RuleSpec {
    fn from_raw(raw: RawRule) -> Self {
        // Validation already rejected unparsable times and comparators
        let from: WallClock = raw.from.parse().unwrap_or(WallClock::MIDNIGHT);
        let to: WallClock = raw.to.parse().unwrap_or(WallClock::MIDNIGHT);

        let condition = match (raw.comparator, raw.threshold) {
            (Some(cmp), Some(threshold)) => {
                cmp.parse::<Comparator>()
                    .ok()
                    .map(|comparator| RuleCondition {
                        comparator,
                        threshold,
                    })
            }
            _ => None,
        };

        Self {
            name: raw.name,
            window: DailyWindow::new(from, to),
            pump_seconds: raw.pump_seconds,
            condition,
        }
    }
}
