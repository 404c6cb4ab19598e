//! Strongly-typed identifiers for chilwater
//!
//! Pumps, sensors and controllers are numbered in the configuration file.
//! Wrapping the numbers keeps a sensor number from being passed where a pump
//! number is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of a pump, unique within the Pumper
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PumpNr(u32);

impl PumpNr {
    pub const fn new(nr: u32) -> Self {
        Self(nr)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PumpNr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PumpNr {
    fn from(nr: u32) -> Self {
        Self(nr)
    }
}

/// Number of a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorNr(u32);

impl SensorNr {
    pub const fn new(nr: u32) -> Self {
        Self(nr)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SensorNr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SensorNr {
    fn from(nr: u32) -> Self {
        Self(nr)
    }
}

/// Number of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControllerNr(u32);

impl ControllerNr {
    pub const fn new(nr: u32) -> Self {
        Self(nr)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ControllerNr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ControllerNr {
    fn from(nr: u32) -> Self {
        Self(nr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pump_nr_equality_and_order() {
        let p1 = PumpNr::new(1);
        let p1b = PumpNr::from(1);
        let p2 = PumpNr::new(2);

        assert_eq!(p1, p1b);
        assert_ne!(p1, p2);
        assert!(p1 < p2);
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&SensorNr::new(7)).unwrap();
        assert_eq!(json, "7");

        let parsed: ControllerNr = serde_json::from_str("3").unwrap();
        assert_eq!(parsed, ControllerNr::new(3));
    }

    #[test]
    fn display_is_the_number() {
        assert_eq!(PumpNr::new(4).to_string(), "4");
        assert_eq!(SensorNr::new(12).to_string(), "12");
    }
}
