//! Controllers: rules bound to one sensor and one pump

use chilwater_api::{ControllerView, LoopState, RuleView};
use chilwater_util::{ControllerNr, PumpNr};
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::lifecycle::{lock, ticker, Lifecycle, LoopControl};
use crate::{CoreError, CoreResult, Pumper, Rule, Sensor};

struct ControllerState {
    lifecycle: Lifecycle,
    rules: Vec<Rule>,
}

/// Evaluates its rules every tick and forwards their requests to the Pumper
pub struct Controller {
    nr: ControllerNr,
    pump_nr: PumpNr,
    sensor: Option<Arc<Sensor>>,
    pumper: Arc<Pumper>,
    tick_interval: Duration,
    state: Mutex<ControllerState>,
}

impl Controller {
    /// `sensor` is None for controllers driven by time rules only
    pub fn new(
        nr: ControllerNr,
        pump_nr: PumpNr,
        sensor: Option<Arc<Sensor>>,
        pumper: Arc<Pumper>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            nr,
            pump_nr,
            sensor,
            pumper,
            tick_interval,
            state: Mutex::new(ControllerState {
                lifecycle: Lifecycle::new(),
                rules: Vec::new(),
            }),
        }
    }

    pub fn nr(&self) -> ControllerNr {
        self.nr
    }

    pub fn pump_nr(&self) -> PumpNr {
        self.pump_nr
    }

    /// Add a rule; it takes part from the next tick on
    pub fn add_rule(&self, rule: Rule) -> CoreResult<()> {
        let mut state = lock(&self.state);
        if state.rules.iter().any(|r| r.name() == rule.name()) {
            return Err(CoreError::DuplicateRule(rule.name().to_string()));
        }
        debug!(controller_nr = %self.nr, rule = rule.name(), "Rule added");
        state.rules.push(rule);
        Ok(())
    }

    /// Replace the rule called `name`. The replacement may carry a new name
    /// as long as no other rule uses it.
    pub fn replace_rule(&self, name: &str, rule: Rule) -> CoreResult<()> {
        let mut state = lock(&self.state);
        if rule.name() != name && state.rules.iter().any(|r| r.name() == rule.name()) {
            return Err(CoreError::DuplicateRule(rule.name().to_string()));
        }
        let slot = state
            .rules
            .iter_mut()
            .find(|r| r.name() == name)
            .ok_or_else(|| CoreError::RuleNotFound(name.to_string()))?;
        debug!(controller_nr = %self.nr, rule = name, "Rule replaced");
        *slot = rule;
        Ok(())
    }

    pub fn remove_rule(&self, name: &str) -> CoreResult<Rule> {
        let mut state = lock(&self.state);
        let index = state
            .rules
            .iter()
            .position(|r| r.name() == name)
            .ok_or_else(|| CoreError::RuleNotFound(name.to_string()))?;
        debug!(controller_nr = %self.nr, rule = name, "Rule removed");
        Ok(state.rules.remove(index))
    }

    /// Replace the whole rule set at once
    pub fn set_rules(&self, rules: Vec<Rule>) -> CoreResult<()> {
        let mut names = HashSet::new();
        for rule in &rules {
            if !names.insert(rule.name()) {
                return Err(CoreError::DuplicateRule(rule.name().to_string()));
            }
        }
        lock(&self.state).rules = rules;
        Ok(())
    }

    pub fn rules(&self) -> Vec<RuleView> {
        lock(&self.state).rules.iter().map(Rule::view).collect()
    }

    pub fn state(&self) -> LoopState {
        lock(&self.state).lifecycle.state()
    }

    /// Ask the loop to stop on its next tick. Does not wait.
    pub fn stop(&self) {
        lock(&self.state).lifecycle.request_stop();
    }

    pub fn view(&self) -> ControllerView {
        let state = lock(&self.state);
        ControllerView {
            nr: self.nr,
            pump_nr: self.pump_nr,
            sensor_nr: self.sensor.as_ref().map(|s| s.nr()),
            state: state.lifecycle.state(),
            rules: state.rules.iter().map(Rule::view).collect(),
        }
    }

    /// Evaluate every rule once.
    ///
    /// The sensor value is read before taking the controller lock and the
    /// Pumper is called after releasing it.
    pub fn tick(&self, now: DateTime<Local>) -> LoopControl {
        let value = self.sensor.as_ref().and_then(|s| s.value());

        let requests: Vec<(String, u32)> = {
            let mut state = lock(&self.state);
            if state.lifecycle.observe_stop() {
                return LoopControl::Stop;
            }
            state
                .rules
                .iter_mut()
                .filter_map(|rule| match rule.evaluate(&now, value) {
                    0 => None,
                    seconds => Some((rule.name().to_string(), seconds)),
                })
                .collect()
        };

        for (rule, seconds) in requests {
            match self.pumper.request(self.pump_nr, f64::from(seconds)) {
                Ok(total) => info!(
                    controller_nr = %self.nr,
                    pump_nr = %self.pump_nr,
                    rule = %rule,
                    seconds,
                    total,
                    value = ?value,
                    "Rule fired"
                ),
                Err(CoreError::Stopping(_)) => debug!(
                    controller_nr = %self.nr,
                    rule = %rule,
                    "Pumper stopping, request dropped"
                ),
                Err(e) => error!(
                    controller_nr = %self.nr,
                    pump_nr = %self.pump_nr,
                    rule = %rule,
                    error = %e,
                    "Failed to request pump time"
                ),
            }
        }

        LoopControl::Continue
    }

    /// Run the evaluation loop until [`Controller::stop`] is observed
    pub async fn run(self: Arc<Self>) {
        let rule_count = {
            let mut state = lock(&self.state);
            if !state.lifecycle.begin() {
                warn!(controller_nr = %self.nr, "Controller loop already started");
                return;
            }
            state.rules.len()
        };

        info!(
            controller_nr = %self.nr,
            pump_nr = %self.pump_nr,
            sensor_nr = ?self.sensor.as_ref().map(|s| s.nr()),
            rule_count,
            "Controller loop started"
        );

        let mut ticker = ticker(self.tick_interval);
        loop {
            ticker.tick().await;
            if self.tick(chilwater_util::now()) == LoopControl::Stop {
                break;
            }
        }

        info!(controller_nr = %self.nr, "Controller loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chilwater_api::{Comparator, SensorKind};
    use chilwater_hw_api::{MockProbe, MockPump};
    use chilwater_util::{DailyWindow, SensorNr, WallClock};
    use chrono::TimeZone;

    const P1: PumpNr = PumpNr::new(1);

    fn window(from: u8, to: u8) -> DailyWindow {
        DailyWindow::new(
            WallClock::new(from, 0, 0).unwrap(),
            WallClock::new(to, 0, 0).unwrap(),
        )
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2025, 6, day, hour, minute, 0)
            .single()
            .unwrap()
    }

    fn pumper() -> Arc<Pumper> {
        let pumper = Arc::new(Pumper::new(Duration::from_millis(10)));
        pumper.add_pump(P1, Arc::new(MockPump::new())).unwrap();
        pumper
    }

    async fn sensor_reading(value: f64) -> Arc<Sensor> {
        let sensor = Arc::new(Sensor::new(
            SensorNr::new(1),
            SensorKind::Humidity,
            "0",
            Arc::new(MockProbe::new(Some(value))),
            Duration::from_millis(10),
        ));
        sensor.poll_once(chilwater_util::now()).await;
        sensor
    }

    fn remaining(pumper: &Pumper) -> f64 {
        pumper.pump_state(P1).unwrap().seconds_remaining
    }

    #[test]
    fn time_rules_request_once_per_day() {
        let pumper = pumper();
        let ctrl = Controller::new(ControllerNr::new(1), P1, None, pumper.clone(), Duration::from_millis(10));
        ctrl.add_rule(Rule::time("morning", window(6, 7), 30)).unwrap();

        ctrl.tick(at(10, 6, 30));
        assert_eq!(remaining(&pumper), 30.0);

        ctrl.tick(at(10, 6, 45));
        assert_eq!(remaining(&pumper), 30.0);

        ctrl.tick(at(11, 6, 15));
        assert_eq!(remaining(&pumper), 60.0);
    }

    #[tokio::test]
    async fn measure_rules_use_sensor_value() {
        let pumper = pumper();
        let wet = Controller::new(
            ControllerNr::new(1),
            P1,
            Some(sensor_reading(25.0).await),
            pumper.clone(),
            Duration::from_millis(10),
        );
        wet.add_rule(Rule::measure("dry", window(6, 7), 20, Comparator::LessOrEqual, 20.0))
            .unwrap();
        wet.tick(at(10, 6, 30));
        assert_eq!(remaining(&pumper), 0.0);

        let dry = Controller::new(
            ControllerNr::new(2),
            P1,
            Some(sensor_reading(15.0).await),
            pumper.clone(),
            Duration::from_millis(10),
        );
        dry.add_rule(Rule::measure("dry", window(6, 7), 20, Comparator::LessOrEqual, 20.0))
            .unwrap();
        dry.tick(at(10, 12, 0));
        assert_eq!(remaining(&pumper), 0.0);
        dry.tick(at(10, 6, 30));
        assert_eq!(remaining(&pumper), 20.0);
    }

    #[test]
    fn controller_without_sensor_never_fires_measure_rules() {
        let pumper = pumper();
        let ctrl = Controller::new(ControllerNr::new(1), P1, None, pumper.clone(), Duration::from_millis(10));
        ctrl.add_rule(Rule::measure("any", window(0, 23), 5, Comparator::GreaterOrEqual, 0.0))
            .unwrap();

        ctrl.tick(at(10, 12, 0));
        assert_eq!(remaining(&pumper), 0.0);
    }

    #[test]
    fn rules_fire_independently() {
        let pumper = pumper();
        let ctrl = Controller::new(ControllerNr::new(1), P1, None, pumper.clone(), Duration::from_millis(10));
        ctrl.add_rule(Rule::time("a", window(6, 7), 10)).unwrap();
        ctrl.add_rule(Rule::time("b", window(6, 8), 5)).unwrap();

        ctrl.tick(at(10, 6, 30));
        assert_eq!(remaining(&pumper), 15.0);
    }

    #[test]
    fn unknown_pump_is_logged_not_fatal() {
        let pumper = pumper();
        let ctrl = Controller::new(
            ControllerNr::new(1),
            PumpNr::new(9),
            None,
            pumper.clone(),
            Duration::from_millis(10),
        );
        ctrl.add_rule(Rule::time("a", window(6, 7), 10)).unwrap();

        assert_eq!(ctrl.tick(at(10, 6, 30)), LoopControl::Continue);
        assert_eq!(remaining(&pumper), 0.0);
    }

    #[test]
    fn rule_set_mutation() {
        let ctrl = Controller::new(ControllerNr::new(1), P1, None, pumper(), Duration::from_millis(10));
        ctrl.add_rule(Rule::time("a", window(6, 7), 10)).unwrap();
        ctrl.add_rule(Rule::time("b", window(8, 9), 10)).unwrap();

        assert!(matches!(
            ctrl.add_rule(Rule::time("a", window(1, 2), 1)),
            Err(CoreError::DuplicateRule(_))
        ));

        ctrl.replace_rule("a", Rule::time("a", window(6, 7), 45)).unwrap();
        assert_eq!(ctrl.rules()[0].pump_seconds, 45);

        assert!(matches!(
            ctrl.replace_rule("a", Rule::time("b", window(6, 7), 1)),
            Err(CoreError::DuplicateRule(_))
        ));
        assert!(matches!(
            ctrl.replace_rule("zzz", Rule::time("zzz", window(6, 7), 1)),
            Err(CoreError::RuleNotFound(_))
        ));

        let removed = ctrl.remove_rule("b").unwrap();
        assert_eq!(removed.name(), "b");
        assert!(matches!(ctrl.remove_rule("b"), Err(CoreError::RuleNotFound(_))));

        assert!(matches!(
            ctrl.set_rules(vec![Rule::time("x", window(1, 2), 1), Rule::time("x", window(3, 4), 1)]),
            Err(CoreError::DuplicateRule(_))
        ));
        assert_eq!(ctrl.rules().len(), 1);

        ctrl.set_rules(vec![Rule::time("x", window(1, 2), 1), Rule::time("y", window(3, 4), 1)])
            .unwrap();
        let names: Vec<String> = ctrl.rules().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn stop_is_observed_on_next_tick() {
        let pumper = pumper();
        let ctrl = Controller::new(ControllerNr::new(1), P1, None, pumper.clone(), Duration::from_millis(10));
        ctrl.add_rule(Rule::time("a", window(6, 7), 10)).unwrap();

        ctrl.stop();
        assert_eq!(ctrl.tick(at(10, 6, 30)), LoopControl::Stop);
        assert_eq!(remaining(&pumper), 0.0);
        assert_eq!(ctrl.state(), LoopState::Stopped);
    }

    #[tokio::test]
    async fn rule_added_while_running_fires() {
        let pumper = pumper();
        let ctrl = Arc::new(Controller::new(
            ControllerNr::new(1),
            P1,
            None,
            pumper.clone(),
            Duration::from_millis(10),
        ));
        let handle = tokio::spawn(ctrl.clone().run());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ctrl.state(), LoopState::Running);
        assert_eq!(remaining(&pumper), 0.0);

        let all_day = DailyWindow::new(WallClock::MIDNIGHT, WallClock::new(23, 59, 59).unwrap());
        ctrl.add_rule(Rule::time("all-day", all_day, 12)).unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(remaining(&pumper), 12.0);

        ctrl.stop();
        handle.await.unwrap();
        assert_eq!(ctrl.state(), LoopState::Stopped);
    }

    #[test]
    fn request_after_pumper_stop_is_dropped() {
        let pumper = pumper();
        let ctrl = Controller::new(ControllerNr::new(1), P1, None, pumper.clone(), Duration::from_millis(10));
        ctrl.add_rule(Rule::time("a", window(6, 7), 10)).unwrap();

        pumper.stop();
        pumper.tick(chilwater_util::MonotonicInstant::now());

        assert_eq!(ctrl.tick(at(10, 6, 30)), LoopControl::Continue);
        assert_eq!(remaining(&pumper), 0.0);
    }

    #[tokio::test]
    async fn view_reports_rules_and_sensor() {
        let ctrl = Controller::new(
            ControllerNr::new(3),
            P1,
            Some(sensor_reading(1.0).await),
            pumper(),
            Duration::from_millis(10),
        );
        ctrl.add_rule(Rule::time("a", window(6, 7), 10)).unwrap();
        ctrl.tick(at(10, 6, 30));

        let view = ctrl.view();
        assert_eq!(view.sensor_nr, Some(SensorNr::new(1)));
        assert_eq!(view.rules.len(), 1);
        assert_eq!(view.rules[0].last_fired, Some(at(10, 6, 30).date_naive()));

        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("\"nr\":3"));
    }
}
