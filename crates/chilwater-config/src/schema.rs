//! Raw configuration schema (as parsed from TOML)

use chilwater_api::SensorKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Global daemon settings
    #[serde(default)]
    pub daemon: RawDaemonConfig,

    /// Hardware locations
    #[serde(default)]
    pub hardware: RawHardwareConfig,

    #[serde(default)]
    pub pumps: Vec<RawPump>,

    #[serde(default)]
    pub sensors: Vec<RawSensor>,

    #[serde(default)]
    pub controllers: Vec<RawController>,
}

/// Daemon-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDaemonConfig {
    /// Polling interval shared by every loop (default: 100)
    pub tick_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawHardwareConfig {
    /// SPI device of the MCP3008 (default: /dev/spidev0.0)
    pub spi_device: Option<PathBuf>,

    /// sysfs GPIO class directory (default: /sys/class/gpio)
    pub gpio_root: Option<PathBuf>,
}

/// Raw pump definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawPump {
    pub nr: u32,

    /// BCM GPIO number driving the pump relay
    pub gpio: u32,

    #[serde(default)]
    pub active_low: bool,
}

/// Raw sensor definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawSensor {
    pub nr: u32,

    pub kind: SensorKind,

    /// ADC channel for humidity and light, w1_slave path for temperature
    pub channel: String,
}

/// Raw controller definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawController {
    pub nr: u32,

    /// Number of the pump this controller requests time from
    pub pump: u32,

    /// Sensor feeding measure rules; absent for time-only controllers
    pub sensor: Option<u32>,

    #[serde(default)]
    pub rules: Vec<RawRule>,
}

/// Raw rule definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawRule {
    pub name: String,

    /// Window start, "HH:MM" or "HH:MM:SS"
    pub from: String,

    /// Window end, inclusive
    pub to: String,

    pub pump_seconds: u32,

    /// One of <, <=, =, >=, >; turns the rule into a measure rule
    pub comparator: Option<String>,

    pub threshold: Option<f64>,
}
