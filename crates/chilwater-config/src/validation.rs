//! Configuration validation

use crate::schema::{RawConfig, RawController, RawRule, RawSensor};
use chilwater_api::{Comparator, SensorKind};
use chilwater_util::{parse_adc_channel, WallClock, ADC_CHANNEL_COUNT};
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Duplicate pump number: {0}")]
    DuplicatePump(u32),

    #[error("GPIO {gpio} is used by more than one pump")]
    DuplicateGpio { gpio: u32 },

    #[error("Duplicate sensor number: {0}")]
    DuplicateSensor(u32),

    #[error("Duplicate controller number: {0}")]
    DuplicateController(u32),

    #[error("Sensor {sensor}: {message}")]
    SensorError { sensor: u32, message: String },

    #[error("Controller {controller} references unknown pump {pump}")]
    UnknownPump { controller: u32, pump: u32 },

    #[error("Controller {controller} references unknown sensor {sensor}")]
    UnknownSensor { controller: u32, sensor: u32 },

    #[error("Controller {controller}: duplicate rule name '{name}'")]
    DuplicateRule { controller: u32, name: String },

    #[error("Controller {controller}, rule '{rule}': invalid time '{value}': {message}")]
    InvalidTimeFormat {
        controller: u32,
        rule: String,
        value: String,
        message: String,
    },

    #[error("Controller {controller}, rule '{rule}': window start {from} is after its end {to}")]
    InvertedWindow {
        controller: u32,
        rule: String,
        from: String,
        to: String,
    },

    #[error("Controller {controller}, rule '{rule}': {message}")]
    RuleError {
        controller: u32,
        rule: String,
        message: String,
    },

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.daemon.tick_interval_ms == Some(0) {
        errors.push(ValidationError::GlobalError(
            "tick_interval_ms must be greater than 0".into(),
        ));
    }

    let mut pump_nrs = HashSet::new();
    let mut gpios = HashSet::new();
    for pump in &config.pumps {
        if !pump_nrs.insert(pump.nr) {
            errors.push(ValidationError::DuplicatePump(pump.nr));
        }
        if !gpios.insert(pump.gpio) {
            errors.push(ValidationError::DuplicateGpio { gpio: pump.gpio });
        }
    }

    let mut sensor_nrs = HashSet::new();
    for sensor in &config.sensors {
        if !sensor_nrs.insert(sensor.nr) {
            errors.push(ValidationError::DuplicateSensor(sensor.nr));
        }
        errors.extend(validate_sensor(sensor));
    }

    let mut controller_nrs = HashSet::new();
    for controller in &config.controllers {
        if !controller_nrs.insert(controller.nr) {
            errors.push(ValidationError::DuplicateController(controller.nr));
        }
        errors.extend(validate_controller(controller, &pump_nrs, &sensor_nrs));
    }

    errors
}

fn validate_sensor(sensor: &RawSensor) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if sensor.channel.trim().is_empty() {
        errors.push(ValidationError::SensorError {
            sensor: sensor.nr,
            message: "channel cannot be empty".into(),
        });
        return errors;
    }

    match sensor.kind {
        SensorKind::Humidity | SensorKind::Light => {
            if parse_adc_channel(&sensor.channel).is_none() {
                errors.push(ValidationError::SensorError {
                    sensor: sensor.nr,
                    message: format!(
                        "ADC channel must be 0-{}, got '{}'",
                        ADC_CHANNEL_COUNT - 1,
                        sensor.channel
                    ),
                });
            }
        }
        SensorKind::Temperature => {}
    }

    errors
}

fn validate_controller(
    controller: &RawController,
    pump_nrs: &HashSet<u32>,
    sensor_nrs: &HashSet<u32>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if !pump_nrs.contains(&controller.pump) {
        errors.push(ValidationError::UnknownPump {
            controller: controller.nr,
            pump: controller.pump,
        });
    }

    if let Some(sensor) = controller.sensor {
        if !sensor_nrs.contains(&sensor) {
            errors.push(ValidationError::UnknownSensor {
                controller: controller.nr,
                sensor,
            });
        }
    }

    let mut names = HashSet::new();
    for rule in &controller.rules {
        if !names.insert(rule.name.as_str()) {
            errors.push(ValidationError::DuplicateRule {
                controller: controller.nr,
                name: rule.name.clone(),
            });
        }
        errors.extend(validate_rule(rule, controller));
    }

    errors
}

fn validate_rule(rule: &RawRule, controller: &RawController) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let rule_error = |message: String| ValidationError::RuleError {
        controller: controller.nr,
        rule: rule.name.clone(),
        message,
    };

    if rule.name.trim().is_empty() {
        errors.push(rule_error("name cannot be empty".into()));
    }

    if rule.pump_seconds == 0 {
        errors.push(rule_error("pump_seconds must be greater than 0".into()));
    }

    let mut parse_time = |value: &str| match value.parse::<WallClock>() {
        Ok(time) => Some(time),
        Err(e) => {
            errors.push(ValidationError::InvalidTimeFormat {
                controller: controller.nr,
                rule: rule.name.clone(),
                value: value.to_string(),
                message: e.to_string(),
            });
            None
        }
    };
    let from = parse_time(&rule.from);
    let to = parse_time(&rule.to);

    if matches!((from, to), (Some(from), Some(to)) if from > to) {
        errors.push(ValidationError::InvertedWindow {
            controller: controller.nr,
            rule: rule.name.clone(),
            from: rule.from.clone(),
            to: rule.to.clone(),
        });
    }

    match (&rule.comparator, rule.threshold) {
        (Some(comparator), Some(threshold)) => {
            if let Err(e) = comparator.parse::<Comparator>() {
                errors.push(rule_error(e.to_string()));
            }
            if !threshold.is_finite() {
                errors.push(rule_error("threshold must be a finite number".into()));
            }
            if controller.sensor.is_none() {
                errors.push(rule_error(
                    "measure rule on a controller without sensor".into(),
                ));
            }
        }
        (Some(_), None) => errors.push(rule_error("comparator requires a threshold".into())),
        (None, Some(_)) => errors.push(rule_error("threshold requires a comparator".into())),
        (None, None) => {}
    }

    errors
}
