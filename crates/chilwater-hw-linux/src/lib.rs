//! Raspberry Pi hardware for chilwater
//!
//! Provides:
//! - Pump relays on sysfs GPIO lines, optionally active low
//! - DS18B20 thermometers on the 1-wire bus
//! - Humidity and light sensors behind an MCP3008 ADC on SPI

mod adc;
mod gpio;
mod hardware;
mod w1;

pub use adc::*;
pub use gpio::*;
pub use hardware::*;
pub use w1::*;
