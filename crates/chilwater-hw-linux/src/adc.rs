//! MCP3008 ADC on SPI and the analog sensors behind it

use async_trait::async_trait;
use chilwater_api::SensorKind;
use chilwater_hw_api::{HwError, HwResult, SensorProbe};
use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// Largest raw value of the 10-bit converter
pub const ADC_MAX: u16 = 1023;

/// Raw humidity reading of a sensor in water
const HUMIDITY_WET: f64 = 400.0;

const SPI_SPEED_HZ: u32 = 1_000_000;

/// Source of raw 10-bit conversions
pub trait AdcReader: Send + Sync {
    fn read_raw(&self, channel: u8) -> HwResult<u16>;
}

/// MCP3008 8-channel ADC, shared by every analog probe
pub struct Mcp3008 {
    spi: Mutex<Spidev>,
}

impl Mcp3008 {
    pub fn open(device: &Path) -> HwResult<Self> {
        let mut spi = Spidev::open(device)?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(SPI_SPEED_HZ)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options)?;
        Ok(Self {
            spi: Mutex::new(spi),
        })
    }
}

impl AdcReader for Mcp3008 {
    fn read_raw(&self, channel: u8) -> HwResult<u16> {
        if channel > 7 {
            return Err(HwError::Spi(format!("MCP3008 has no channel {channel}")));
        }

        let tx = [1u8, (8 + channel) << 4, 0];
        let mut rx = [0u8; 3];
        {
            let spi = self.spi.lock().unwrap_or_else(PoisonError::into_inner);
            let mut transfer = SpidevTransfer::read_write(&tx, &mut rx);
            spi.transfer(&mut transfer)
                .map_err(|e| HwError::Spi(e.to_string()))?;
        }

        Ok(decode_sample(rx))
    }
}

/// Extract the 10-bit sample from an MCP3008 reply
pub fn decode_sample(rx: [u8; 3]) -> u16 {
    (((rx[1] & 0b11) as u16) << 8) | rx[2] as u16
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Soil moisture: 100 in water, falling as the raw value rises
pub fn humidity_percent(raw: u16) -> f64 {
    round2(100.0 - (raw as f64 - HUMIDITY_WET) / (ADC_MAX as f64 - HUMIDITY_WET) * 100.0)
}

pub fn light_percent(raw: u16) -> f64 {
    round2(raw as f64 / ADC_MAX as f64 * 100.0)
}

/// Humidity or light sensor on one ADC channel
pub struct AdcProbe {
    adc: Arc<dyn AdcReader>,
    channel: u8,
    kind: SensorKind,
}

impl AdcProbe {
    /// Fails for temperature, which is not an analog sensor here
    pub fn new(adc: Arc<dyn AdcReader>, kind: SensorKind, channel: u8) -> HwResult<Self> {
        if kind == SensorKind::Temperature {
            return Err(HwError::InvalidChannel {
                kind,
                channel: channel.to_string(),
            });
        }
        Ok(Self { adc, channel, kind })
    }

    fn scale(&self, raw: u16) -> f64 {
        match self.kind {
            SensorKind::Humidity => humidity_percent(raw),
            _ => light_percent(raw),
        }
    }
}

#[async_trait]
impl SensorProbe for AdcProbe {
    async fn read(&self) -> HwResult<Option<f64>> {
        let adc = self.adc.clone();
        let channel = self.channel;
        let raw = tokio::task::spawn_blocking(move || adc.read_raw(channel))
            .await
            .map_err(|e| HwError::Internal(e.to_string()))??;
        Ok(Some(self.scale(raw)))
    }

    fn describe(&self) -> String {
        format!("{} on mcp3008 channel {}", self.kind, self.channel)
    }
}
