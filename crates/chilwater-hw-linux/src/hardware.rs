//! Hardware factory for the Raspberry Pi

use chilwater_api::SensorKind;
use chilwater_hw_api::{Hardware, HwError, HwResult, PumpActuator, SensorProbe};
use chilwater_util::{parse_adc_channel, PumpNr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

use crate::{AdcProbe, AdcReader, Mcp3008, SysfsPump, W1Thermometer};

/// Builds probes and pumps on the real device.
///
/// The MCP3008 is opened on the first analog probe and shared by all of
/// them, so setups without analog sensors never touch SPI.
pub struct LinuxHardware {
    gpio_root: PathBuf,
    spi_device: PathBuf,
    adc: Mutex<Option<Arc<dyn AdcReader>>>,
}

impl LinuxHardware {
    /// `gpio_root` is the sysfs GPIO directory, `spi_device` the spidev node
    /// of the MCP3008
    pub fn new(gpio_root: impl Into<PathBuf>, spi_device: impl Into<PathBuf>) -> Self {
        Self {
            gpio_root: gpio_root.into(),
            spi_device: spi_device.into(),
            adc: Mutex::new(None),
        }
    }

    fn adc(&self) -> HwResult<Arc<dyn AdcReader>> {
        let mut adc = self.adc.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(adc) = adc.as_ref() {
            return Ok(adc.clone());
        }

        let opened: Arc<dyn AdcReader> = Arc::new(Mcp3008::open(&self.spi_device)?);
        info!(device = %self.spi_device.display(), "MCP3008 opened");
        *adc = Some(opened.clone());
        Ok(opened)
    }
}

impl Hardware for LinuxHardware {
    fn sensor_probe(&self, kind: SensorKind, channel: &str) -> HwResult<Arc<dyn SensorProbe>> {
        match kind {
            SensorKind::Temperature => Ok(Arc::new(W1Thermometer::new(channel))),
            SensorKind::Humidity | SensorKind::Light => {
                let adc_channel = parse_adc_channel(channel).ok_or_else(|| HwError::InvalidChannel {
                    kind,
                    channel: channel.to_string(),
                })?;
                Ok(Arc::new(AdcProbe::new(self.adc()?, kind, adc_channel)?))
            }
        }
    }

    fn pump_actuator(
        &self,
        pump_nr: PumpNr,
        gpio: u32,
        active_low: bool,
    ) -> HwResult<Arc<dyn PumpActuator>> {
        let pump = SysfsPump::open(&self.gpio_root, gpio, active_low)?;
        info!(pump_nr = %pump_nr, gpio, active_low, "Pump line configured");
        Ok(Arc::new(pump))
    }

    fn name(&self) -> &'static str {
        "linux"
    }
}
