//! Pump accumulators and the Pumper loop

use chilwater_api::{LoopState, PumpStatus};
use chilwater_hw_api::PumpActuator;
use chilwater_util::{MonotonicInstant, PumpNr};
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::lifecycle::{lock, ticker, Lifecycle, LoopControl};
use crate::{CoreError, CoreResult};

/// Remaining run time of one pump.
///
/// `running_since` is set exactly while the pump is physically on; the
/// remaining seconds are only decremented while it is.
struct PumpAccumulator {
    actuator: Arc<dyn PumpActuator>,
    seconds_remaining: f64,
    running_since: Option<MonotonicInstant>,
    last_started: Option<DateTime<Local>>,
}

impl PumpAccumulator {
    fn new(actuator: Arc<dyn PumpActuator>) -> Self {
        Self {
            actuator,
            seconds_remaining: 0.0,
            running_since: None,
            last_started: None,
        }
    }

    fn is_pumping(&self) -> bool {
        self.running_since.is_some()
    }

    fn advance(&mut self, pump_nr: PumpNr, now: MonotonicInstant) {
        match self.running_since {
            Some(since) => {
                self.seconds_remaining -= now.duration_since(since).as_secs_f64();
                self.running_since = Some(now);

                if self.seconds_remaining <= 0.0 {
                    if let Err(e) = self.actuator.stop() {
                        error!(pump_nr = %pump_nr, error = %e, "Failed to stop pump");
                    }
                    self.running_since = None;
                    self.seconds_remaining = 0.0;
                    info!(pump_nr = %pump_nr, "Pump stopped");
                }
            }
            None if self.seconds_remaining > 0.0 => match self.actuator.start() {
                Ok(()) => {
                    self.running_since = Some(now);
                    self.last_started = Some(chilwater_util::now());
                    info!(
                        pump_nr = %pump_nr,
                        seconds = self.seconds_remaining,
                        "Pump started"
                    );
                }
                Err(e) => {
                    error!(pump_nr = %pump_nr, error = %e, "Failed to start pump, retrying next tick");
                }
            },
            None => {}
        }
    }

    fn force_off(&mut self, pump_nr: PumpNr) {
        if let Err(e) = self.actuator.stop() {
            error!(pump_nr = %pump_nr, error = %e, "Failed to stop pump");
        }
        if self.is_pumping() {
            info!(
                pump_nr = %pump_nr,
                discarded_seconds = self.seconds_remaining,
                "Pump stopped immediately"
            );
        }
        self.running_since = None;
        self.seconds_remaining = 0.0;
    }

    fn status(&self, pump_nr: PumpNr) -> PumpStatus {
        PumpStatus {
            pump_nr,
            pumping: self.is_pumping(),
            seconds_remaining: self.seconds_remaining,
            last_started: self.last_started,
        }
    }
}

struct PumperState {
    lifecycle: Lifecycle,
    pumps: BTreeMap<PumpNr, PumpAccumulator>,
}

/// Owns every pump and turns requested seconds into start/stop transitions.
///
/// Requests from all controllers add up per pump. The loop applies them on
/// its next tick.
pub struct Pumper {
    tick_interval: Duration,
    state: Mutex<PumperState>,
}

impl Pumper {
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            tick_interval,
            state: Mutex::new(PumperState {
                lifecycle: Lifecycle::new(),
                pumps: BTreeMap::new(),
            }),
        }
    }

    /// Register a pump. An already registered number is left untouched.
    pub fn add_pump(&self, pump_nr: PumpNr, actuator: Arc<dyn PumpActuator>) -> CoreResult<()> {
        let mut state = lock(&self.state);
        if state.pumps.contains_key(&pump_nr) {
            return Err(CoreError::DuplicatePump(pump_nr));
        }
        state.pumps.insert(pump_nr, PumpAccumulator::new(actuator));
        debug!(pump_nr = %pump_nr, "Pump registered");
        Ok(())
    }

    /// Add `seconds` of pumping to a pump, returning its new total.
    ///
    /// Refused once [`Pumper::stop`] has been called, so nothing is left in
    /// an accumulator after the final sweep.
    pub fn request(&self, pump_nr: PumpNr, seconds: f64) -> CoreResult<f64> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(CoreError::InvalidSeconds(seconds));
        }

        let mut state = lock(&self.state);
        if state.lifecycle.stop_requested() {
            return Err(CoreError::Stopping(pump_nr));
        }
        let pump = state
            .pumps
            .get_mut(&pump_nr)
            .ok_or(CoreError::PumpNotFound(pump_nr))?;
        pump.seconds_remaining += seconds;

        debug!(
            pump_nr = %pump_nr,
            seconds,
            total = pump.seconds_remaining,
            "Pump time requested"
        );
        Ok(pump.seconds_remaining)
    }

    /// One management pass over every pump
    pub fn tick(&self, now: MonotonicInstant) -> LoopControl {
        let mut state = lock(&self.state);

        if state.lifecycle.observe_stop() {
            for (pump_nr, pump) in state.pumps.iter_mut() {
                pump.force_off(*pump_nr);
            }
            return LoopControl::Stop;
        }

        for (pump_nr, pump) in state.pumps.iter_mut() {
            pump.advance(*pump_nr, now);
        }
        LoopControl::Continue
    }

    /// Run the management loop until [`Pumper::stop`] is observed.
    ///
    /// Stopping switches every pump off and discards any remaining time.
    pub async fn run(self: Arc<Self>) {
        let pump_count = {
            let mut state = lock(&self.state);
            if !state.lifecycle.begin() {
                warn!("Pumper loop already started");
                return;
            }
            state.pumps.len()
        };

        info!(pump_count, "Pumper loop started");

        let mut ticker = ticker(self.tick_interval);
        loop {
            ticker.tick().await;
            if self.tick(MonotonicInstant::now()) == LoopControl::Stop {
                break;
            }
        }

        info!("Pumper loop stopped");
    }

    /// Ask the loop to stop on its next tick. Does not wait.
    pub fn stop(&self) {
        lock(&self.state).lifecycle.request_stop();
    }

    pub fn state(&self) -> LoopState {
        lock(&self.state).lifecycle.state()
    }

    pub fn pump_state(&self, pump_nr: PumpNr) -> Option<PumpStatus> {
        lock(&self.state)
            .pumps
            .get(&pump_nr)
            .map(|pump| pump.status(pump_nr))
    }

    pub fn pump_states(&self) -> Vec<PumpStatus> {
        lock(&self.state)
            .pumps
            .iter()
            .map(|(nr, pump)| pump.status(*nr))
            .collect()
    }

    pub fn has_pump(&self, pump_nr: PumpNr) -> bool {
        lock(&self.state).pumps.contains_key(&pump_nr)
    }
}
