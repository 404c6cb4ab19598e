//! Sensor polling loop

use chilwater_api::{LoopState, SensorKind, SensorView};
use chilwater_hw_api::SensorProbe;
use chilwater_util::SensorNr;
use chrono::{DateTime, Local};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::lifecycle::{lock, ticker, Lifecycle, LoopControl};

#[derive(Debug)]
struct SensorState {
    lifecycle: Lifecycle,
    last_value: Option<f64>,
    updated_at: Option<DateTime<Local>>,
    failing: bool,
}

/// A sensor sampled by its own loop.
///
/// Only the loop writes the published value; controllers read it through
/// [`Sensor::value`] at any time.
pub struct Sensor {
    nr: SensorNr,
    kind: SensorKind,
    channel: String,
    probe: Arc<dyn SensorProbe>,
    tick_interval: Duration,
    state: Mutex<SensorState>,
}

impl Sensor {
    pub fn new(
        nr: SensorNr,
        kind: SensorKind,
        channel: impl Into<String>,
        probe: Arc<dyn SensorProbe>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            nr,
            kind,
            channel: channel.into(),
            probe,
            tick_interval,
            state: Mutex::new(SensorState {
                lifecycle: Lifecycle::new(),
                last_value: None,
                updated_at: None,
                failing: false,
            }),
        }
    }

    pub fn nr(&self) -> SensorNr {
        self.nr
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Latest published reading, None before the first successful one
    pub fn value(&self) -> Option<f64> {
        lock(&self.state).last_value
    }

    pub fn state(&self) -> LoopState {
        lock(&self.state).lifecycle.state()
    }

    /// Ask the loop to stop on its next tick. Does not wait.
    pub fn stop(&self) {
        lock(&self.state).lifecycle.request_stop();
    }

    pub fn view(&self) -> SensorView {
        let state = lock(&self.state);
        SensorView {
            nr: self.nr,
            kind: self.kind,
            channel: self.channel.clone(),
            state: state.lifecycle.state(),
            value: state.last_value,
            updated_at: state.updated_at,
        }
    }

    /// Take one reading and publish it, unless a stop was requested.
    ///
    /// The probe is read without holding the sensor lock.
    pub async fn poll_once(&self, now: DateTime<Local>) -> LoopControl {
        let reading = self.probe.read().await;

        let mut state = lock(&self.state);
        if state.lifecycle.observe_stop() {
            return LoopControl::Stop;
        }

        match reading {
            Ok(Some(value)) => {
                if state.failing {
                    info!(sensor_nr = %self.nr, value, "Sensor recovered");
                    state.failing = false;
                }
                trace!(sensor_nr = %self.nr, value, "Sensor reading");
                state.last_value = Some(value);
                state.updated_at = Some(now);
            }
            Ok(None) => {
                trace!(sensor_nr = %self.nr, "Sensor returned no reading");
            }
            Err(e) => {
                if state.failing {
                    debug!(sensor_nr = %self.nr, error = %e, "Sensor read still failing");
                } else {
                    warn!(
                        sensor_nr = %self.nr,
                        probe = %self.probe.describe(),
                        error = %e,
                        "Sensor read failed, keeping last value"
                    );
                    state.failing = true;
                }
            }
        }

        LoopControl::Continue
    }

    /// Run the polling loop until [`Sensor::stop`] is observed
    pub async fn run(self: Arc<Self>) {
        if !lock(&self.state).lifecycle.begin() {
            warn!(sensor_nr = %self.nr, "Sensor loop already started");
            return;
        }

        info!(
            sensor_nr = %self.nr,
            kind = %self.kind,
            probe = %self.probe.describe(),
            "Sensor loop started"
        );

        let mut ticker = ticker(self.tick_interval);
        loop {
            ticker.tick().await;
            if self.poll_once(chilwater_util::now()).await == LoopControl::Stop {
                break;
            }
        }

        info!(sensor_nr = %self.nr, "Sensor loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chilwater_hw_api::{MockProbe, MockReading};

    fn sensor_with(probe: Arc<MockProbe>) -> Sensor {
        Sensor::new(
            SensorNr::new(1),
            SensorKind::Humidity,
            "0",
            probe,
            Duration::from_millis(10),
        )
    }

    #[tokio::test]
    async fn publishes_readings() {
        let probe = Arc::new(MockProbe::new(Some(42.0)));
        let sensor = sensor_with(probe);
        assert_eq!(sensor.value(), None);

        let now = chilwater_util::now();
        assert_eq!(sensor.poll_once(now).await, LoopControl::Continue);
        assert_eq!(sensor.value(), Some(42.0));
        assert_eq!(sensor.view().updated_at, Some(now));
    }

    #[tokio::test]
    async fn failures_keep_last_value() {
        let probe = Arc::new(MockProbe::scripted(
            [
                MockReading::Value(10.0),
                MockReading::Fail,
                MockReading::Fail,
                MockReading::Nothing,
                MockReading::Value(12.0),
            ],
            None,
        ));
        let sensor = sensor_with(probe);
        let now = chilwater_util::now();

        sensor.poll_once(now).await;
        assert_eq!(sensor.value(), Some(10.0));

        for _ in 0..3 {
            assert_eq!(sensor.poll_once(now).await, LoopControl::Continue);
            assert_eq!(sensor.value(), Some(10.0));
        }

        sensor.poll_once(now).await;
        assert_eq!(sensor.value(), Some(12.0));
    }

    #[tokio::test]
    async fn stop_is_observed_on_next_poll() {
        let probe = Arc::new(MockProbe::new(Some(1.0)));
        let sensor = sensor_with(probe.clone());

        sensor.stop();
        assert_eq!(sensor.poll_once(chilwater_util::now()).await, LoopControl::Stop);
        // The reading taken in the stopping tick is not published
        assert_eq!(sensor.value(), None);
        assert_eq!(probe.read_count(), 1);
    }

    #[tokio::test]
    async fn run_loop_stops() {
        let probe = Arc::new(MockProbe::new(Some(3.5)));
        let sensor = Arc::new(sensor_with(probe));

        let handle = tokio::spawn(sensor.clone().run());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sensor.state(), LoopState::Running);
        assert_eq!(sensor.value(), Some(3.5));

        sensor.stop();
        handle.await.unwrap();
        assert_eq!(sensor.state(), LoopState::Stopped);

        // A stopped sensor does not start again
        sensor.clone().run().await;
        assert_eq!(sensor.state(), LoopState::Stopped);
    }
}
