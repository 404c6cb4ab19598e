//! Pump relays on sysfs GPIO lines

use chilwater_hw_api::{HwError, HwResult, PumpActuator};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A pump switched through `/sys/class/gpio/gpioN/value`.
///
/// The line is exported and configured as output when opened, and driven to
/// its inactive level when opened and when dropped.
#[derive(Debug)]
pub struct SysfsPump {
    gpio: u32,
    active_low: bool,
    value_path: PathBuf,
}

impl SysfsPump {
    pub fn open(gpio_root: &Path, gpio: u32, active_low: bool) -> HwResult<Self> {
        let line_dir = gpio_root.join(format!("gpio{gpio}"));

        if !line_dir.exists() {
            debug!(gpio, "Exporting GPIO line");
            write_attr(gpio, &gpio_root.join("export"), &gpio.to_string())?;
        }
        write_attr(gpio, &line_dir.join("direction"), "out")?;

        let pump = Self {
            gpio,
            active_low,
            value_path: line_dir.join("value"),
        };
        pump.drive(false)?;
        Ok(pump)
    }

    pub fn gpio(&self) -> u32 {
        self.gpio
    }

    fn drive(&self, on: bool) -> HwResult<()> {
        let level = if on != self.active_low { "1" } else { "0" };
        write_attr(self.gpio, &self.value_path, level)
    }
}

fn write_attr(gpio: u32, path: &Path, value: &str) -> HwResult<()> {
    fs::write(path, value).map_err(|e| HwError::Gpio {
        gpio,
        message: format!("writing {}: {}", path.display(), e),
    })
}

impl PumpActuator for SysfsPump {
    fn start(&self) -> HwResult<()> {
        self.drive(true)
    }

    fn stop(&self) -> HwResult<()> {
        self.drive(false)
    }
}

impl Drop for SysfsPump {
    fn drop(&mut self) {
        if let Err(e) = self.drive(false) {
            warn!(gpio = self.gpio, error = %e, "Failed to switch pump off on release");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_line(root: &Path, gpio: u32) {
        fs::create_dir_all(root.join(format!("gpio{gpio}"))).unwrap();
    }

    fn value(root: &Path, gpio: u32) -> String {
        fs::read_to_string(root.join(format!("gpio{gpio}/value"))).unwrap()
    }

    #[test]
    fn open_configures_output_and_switches_off() {
        let root = tempfile::tempdir().unwrap();
        fake_line(root.path(), 16);

        let pump = SysfsPump::open(root.path(), 16, false).unwrap();
        assert_eq!(pump.gpio(), 16);
        assert_eq!(
            fs::read_to_string(root.path().join("gpio16/direction")).unwrap(),
            "out"
        );
        assert_eq!(value(root.path(), 16), "0");

        pump.start().unwrap();
        assert_eq!(value(root.path(), 16), "1");
        pump.stop().unwrap();
        assert_eq!(value(root.path(), 16), "0");
    }

    #[test]
    fn active_low_inverts_levels() {
        let root = tempfile::tempdir().unwrap();
        fake_line(root.path(), 20);

        let pump = SysfsPump::open(root.path(), 20, true).unwrap();
        assert_eq!(value(root.path(), 20), "1");

        pump.start().unwrap();
        assert_eq!(value(root.path(), 20), "0");
    }

    #[test]
    fn drop_switches_off() {
        let root = tempfile::tempdir().unwrap();
        fake_line(root.path(), 21);

        let pump = SysfsPump::open(root.path(), 21, false).unwrap();
        pump.start().unwrap();
        drop(pump);
        assert_eq!(value(root.path(), 21), "0");
    }

    #[test]
    fn unexported_line_is_exported() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("export"), "").unwrap();

        // The fake sysfs does not create the line directory on export
        let result = SysfsPump::open(root.path(), 26, false);
        assert_eq!(
            fs::read_to_string(root.path().join("export")).unwrap(),
            "26"
        );
        assert!(matches!(result, Err(HwError::Gpio { gpio: 26, .. })));
    }
}
