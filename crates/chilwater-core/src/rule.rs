//! Watering rules

use chilwater_api::{Comparator, RuleCondition, RuleView};
use chilwater_config::RuleSpec;
use chilwater_util::DailyWindow;
use chrono::{DateTime, Local, NaiveDate};

/// What has to hold, besides the window, for a rule to fire
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleKind {
    /// Fires unconditionally once per day inside the window
    Time,
    /// Fires once per day inside the window while `value <comparator> threshold`
    Measure {
        comparator: Comparator,
        threshold: f64,
    },
}

/// A time-windowed, once-a-day request for pump time
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    window: DailyWindow,
    pump_seconds: u32,
    kind: RuleKind,
    last_fired: Option<NaiveDate>,
}

impl Rule {
    pub fn new(name: impl Into<String>, window: DailyWindow, pump_seconds: u32, kind: RuleKind) -> Self {
        Self {
            name: name.into(),
            window,
            pump_seconds,
            kind,
            last_fired: None,
        }
    }

    pub fn time(name: impl Into<String>, window: DailyWindow, pump_seconds: u32) -> Self {
        Self::new(name, window, pump_seconds, RuleKind::Time)
    }

    pub fn measure(
        name: impl Into<String>,
        window: DailyWindow,
        pump_seconds: u32,
        comparator: Comparator,
        threshold: f64,
    ) -> Self {
        Self::new(
            name,
            window,
            pump_seconds,
            RuleKind::Measure {
                comparator,
                threshold,
            },
        )
    }

    pub fn from_spec(spec: &RuleSpec) -> Self {
        let kind = match spec.condition {
            Some(RuleCondition {
                comparator,
                threshold,
            }) => RuleKind::Measure {
                comparator,
                threshold,
            },
            None => RuleKind::Time,
        };
        Self::new(spec.name.clone(), spec.window, spec.pump_seconds, kind)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn window(&self) -> DailyWindow {
        self.window
    }

    pub fn pump_seconds(&self) -> u32 {
        self.pump_seconds
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn last_fired(&self) -> Option<NaiveDate> {
        self.last_fired
    }

    /// Inside the window and not fired yet on the date of `now`
    pub fn should_check(&self, now: &DateTime<Local>) -> bool {
        self.window.contains(now) && self.last_fired != Some(now.date_naive())
    }

    /// Evaluate the rule, returning the seconds of pumping it asks for.
    ///
    /// A non-zero result records the date of `now`, so the rule yields
    /// nothing else until the next day. A measure rule that is checked but
    /// not satisfied stays eligible for the rest of the window.
    pub fn evaluate(&mut self, now: &DateTime<Local>, value: Option<f64>) -> u32 {
        if !self.should_check(now) {
            return 0;
        }

        let fires = match self.kind {
            RuleKind::Time => true,
            RuleKind::Measure {
                comparator,
                threshold,
            } => value.is_some_and(|v| comparator.holds(v, threshold)),
        };
        if !fires {
            return 0;
        }

        self.last_fired = Some(now.date_naive());
        self.pump_seconds
    }

    pub fn view(&self) -> RuleView {
        let condition = match self.kind {
            RuleKind::Time => None,
            RuleKind::Measure {
                comparator,
                threshold,
            } => Some(RuleCondition {
                comparator,
                threshold,
            }),
        };
        RuleView {
            name: self.name.clone(),
            from: self.window.from,
            to: self.window.to,
            pump_seconds: self.pump_seconds,
            condition,
            last_fired: self.last_fired,
        }
    }
}
