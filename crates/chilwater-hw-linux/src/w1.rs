//! DS18B20 thermometers on the 1-wire bus

use async_trait::async_trait;
use chilwater_hw_api::{HwError, HwResult, SensorProbe};
use std::path::PathBuf;

/// Reads a `w1_slave` file such as
/// `/sys/bus/w1/devices/28-000005e2fdc3/w1_slave`
#[derive(Debug, Clone)]
pub struct W1Thermometer {
    path: PathBuf,
}

impl W1Thermometer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SensorProbe for W1Thermometer {
    async fn read(&self) -> HwResult<Option<f64>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        parse_w1_slave(&content)
    }

    fn describe(&self) -> String {
        format!("ds18b20 at {}", self.path.display())
    }
}

/// Parse the two-line output of the w1_therm driver.
///
/// ```text
/// 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
/// 72 01 4b 46 7f ff 0e 10 57 t=23125
/// ```
///
/// A failed CRC yields no reading rather than an error: the driver simply
/// caught the bus at a bad moment.
pub fn parse_w1_slave(content: &str) -> HwResult<Option<f64>> {
    let mut lines = content.lines();

    let crc_line = lines
        .next()
        .ok_or_else(|| HwError::Malformed("empty w1_slave".into()))?;
    if !crc_line.contains("crc=") {
        return Err(HwError::Malformed(format!("no crc in '{crc_line}'")));
    }
    if !crc_line.trim_end().ends_with("YES") {
        return Ok(None);
    }

    let data_line = lines
        .next()
        .ok_or_else(|| HwError::Malformed("missing temperature line".into()))?;
    let raw = data_line
        .split_once("t=")
        .map(|(_, t)| t.trim())
        .ok_or_else(|| HwError::Malformed(format!("no temperature in '{data_line}'")))?;
    let millidegrees: i64 = raw
        .parse()
        .map_err(|_| HwError::Malformed(format!("bad temperature '{raw}'")))?;

    Ok(Some(millidegrees as f64 / 1000.0))
}
