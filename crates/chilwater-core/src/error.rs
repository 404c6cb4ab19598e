//! Core errors

use chilwater_hw_api::HwError;
use chilwater_util::{ControllerNr, PumpNr, SensorNr};
use thiserror::Error;

/// Errors from building or driving the orchestration entities
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Pump {0} is already registered")]
    DuplicatePump(PumpNr),

    #[error("Pump {0} is not registered")]
    PumpNotFound(PumpNr),

    #[error("Invalid pump time {0}s: must be finite and not negative")]
    InvalidSeconds(f64),

    #[error("Pumper is stopping, request for pump {0} refused")]
    Stopping(PumpNr),

    #[error("Rule '{0}' already exists")]
    DuplicateRule(String),

    #[error("Rule '{0}' not found")]
    RuleNotFound(String),

    #[error("Sensor {0} is already registered")]
    DuplicateSensor(SensorNr),

    #[error("Sensor {0} not found")]
    SensorNotFound(SensorNr),

    #[error("Controller {0} is already registered")]
    DuplicateController(ControllerNr),

    #[error("Hardware error: {0}")]
    Hardware(#[from] HwError),
}

pub type CoreResult<T> = Result<T, CoreError>;
