//! Hardware traits

use async_trait::async_trait;
use chilwater_api::SensorKind;
use chilwater_util::PumpNr;
use std::sync::Arc;
use thiserror::Error;

/// Errors from hardware operations
#[derive(Debug, Error)]
pub enum HwError {
    #[error("Sensor read failed: {0}")]
    ReadFailed(String),

    #[error("Malformed sensor data: {0}")]
    Malformed(String),

    #[error("Invalid channel '{channel}' for {kind} sensor")]
    InvalidChannel { kind: SensorKind, channel: String },

    #[error("GPIO {gpio}: {message}")]
    Gpio { gpio: u32, message: String },

    #[error("SPI error: {0}")]
    Spi(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HwResult<T> = Result<T, HwError>;

/// A source of readings for one sensor.
///
/// `read` is never called concurrently for the same probe. `Ok(None)` means
/// the hardware answered but had nothing usable to report.
#[async_trait]
pub trait SensorProbe: Send + Sync {
    async fn read(&self) -> HwResult<Option<f64>>;

    /// Short human readable description for logs
    fn describe(&self) -> String;
}

/// Switches one pump on or off.
///
/// Both operations must be quick and idempotent: they are called from the
/// Pumper tick and starting a running pump or stopping a stopped one is fine.
pub trait PumpActuator: Send + Sync {
    fn start(&self) -> HwResult<()>;

    fn stop(&self) -> HwResult<()>;
}

/// Builds probes and actuators from configured channels
pub trait Hardware: Send + Sync {
    fn sensor_probe(&self, kind: SensorKind, channel: &str) -> HwResult<Arc<dyn SensorProbe>>;

    fn pump_actuator(
        &self,
        pump_nr: PumpNr,
        gpio: u32,
        active_low: bool,
    ) -> HwResult<Arc<dyn PumpActuator>>;

    /// Name used in startup logs
    fn name(&self) -> &'static str;
}
