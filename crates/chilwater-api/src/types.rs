//! Shared types for the chilwater API

use chrono::{DateTime, Local, NaiveDate};
use chilwater_util::{ControllerNr, PumpNr, SensorNr, WallClock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle state shared by every polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Running,
    Stopped,
}

/// Comparison applied between a sensor value and a rule threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = ">")]
    Greater,
}

impl Comparator {
    /// Whether `value <op> threshold` holds
    pub fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparator::Less => value < threshold,
            Comparator::LessOrEqual => value <= threshold,
            Comparator::Equal => value == threshold,
            Comparator::GreaterOrEqual => value >= threshold,
            Comparator::Greater => value > threshold,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Comparator::Less => "<",
            Comparator::LessOrEqual => "<=",
            Comparator::Equal => "=",
            Comparator::GreaterOrEqual => ">=",
            Comparator::Greater => ">",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown comparator '{0}', expected one of <, <=, =, >=, >")]
pub struct UnknownComparator(pub String);

impl FromStr for Comparator {
    type Err = UnknownComparator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "<" => Ok(Comparator::Less),
            "<=" => Ok(Comparator::LessOrEqual),
            "=" | "==" => Ok(Comparator::Equal),
            ">=" => Ok(Comparator::GreaterOrEqual),
            ">" => Ok(Comparator::Greater),
            other => Err(UnknownComparator(other.to_string())),
        }
    }
}

/// Physical quantity a sensor measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Degrees Celsius from a 1-wire thermometer
    Temperature,
    /// Soil moisture, normalized to 0-100
    Humidity,
    /// Ambient light, normalized to 0-100
    Light,
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
            SensorKind::Light => "light",
        };
        f.write_str(name)
    }
}

/// Sensor condition of a measure rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    pub comparator: Comparator,
    pub threshold: f64,
}

/// View of a rule for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleView {
    pub name: String,
    pub from: WallClock,
    pub to: WallClock,
    pub pump_seconds: u32,
    /// None for purely time based rules
    pub condition: Option<RuleCondition>,
    pub last_fired: Option<NaiveDate>,
}

/// View of a sensor for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorView {
    pub nr: SensorNr,
    pub kind: SensorKind,
    pub channel: String,
    pub state: LoopState,
    pub value: Option<f64>,
    pub updated_at: Option<DateTime<Local>>,
}

/// Snapshot of one pump accumulator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PumpStatus {
    pub pump_nr: PumpNr,
    pub pumping: bool,
    pub seconds_remaining: f64,
    pub last_started: Option<DateTime<Local>>,
}

/// View of a controller for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerView {
    pub nr: ControllerNr,
    pub pump_nr: PumpNr,
    /// None for time-only controllers
    pub sensor_nr: Option<SensorNr>,
    pub state: LoopState,
    pub rules: Vec<RuleView>,
}

/// Full system snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub api_version: u32,
    pub taken_at: DateTime<Local>,
    pub pumper_state: LoopState,
    pub pumps: Vec<PumpStatus>,
    pub sensors: Vec<SensorView>,
    pub controllers: Vec<ControllerView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparator_semantics() {
        assert!(Comparator::LessOrEqual.holds(15.0, 20.0));
        assert!(Comparator::LessOrEqual.holds(20.0, 20.0));
        assert!(!Comparator::LessOrEqual.holds(25.0, 20.0));

        assert!(Comparator::Less.holds(19.9, 20.0));
        assert!(!Comparator::Less.holds(20.0, 20.0));

        assert!(Comparator::Equal.holds(20.0, 20.0));
        assert!(!Comparator::Equal.holds(20.5, 20.0));

        assert!(Comparator::GreaterOrEqual.holds(20.0, 20.0));
        assert!(!Comparator::GreaterOrEqual.holds(19.0, 20.0));

        assert!(Comparator::Greater.holds(21.0, 20.0));
        assert!(!Comparator::Greater.holds(20.0, 20.0));
    }

    #[test]
    fn comparator_parse_and_display() {
        for symbol in ["<", "<=", "=", ">=", ">"] {
            let cmp: Comparator = symbol.parse().unwrap();
            assert_eq!(cmp.to_string(), symbol);
        }
        assert_eq!("==".parse::<Comparator>().unwrap(), Comparator::Equal);
        assert!("=>".parse::<Comparator>().is_err());
        assert!("".parse::<Comparator>().is_err());
    }

    #[test]
    fn comparator_serializes_as_symbol() {
        let json = serde_json::to_string(&Comparator::GreaterOrEqual).unwrap();
        assert_eq!(json, "\">=\"");

        let parsed: Comparator = serde_json::from_str("\"<\"").unwrap();
        assert_eq!(parsed, Comparator::Less);
    }

    #[test]
    fn sensor_kind_serialization() {
        let json = serde_json::to_string(&SensorKind::Humidity).unwrap();
        assert_eq!(json, "\"humidity\"");
        assert_eq!(SensorKind::Light.to_string(), "light");
    }

    #[test]
    fn pump_status_serialization() {
        let status = PumpStatus {
            pump_nr: PumpNr::new(2),
            pumping: true,
            seconds_remaining: 12.5,
            last_started: None,
        };

        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"pump_nr\":2"));
        assert!(json.contains("\"pumping\":true"));
    }
}
