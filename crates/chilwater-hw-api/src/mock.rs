//! Mock hardware for testing and simulation

use async_trait::async_trait;
use chilwater_api::SensorKind;
use chilwater_util::PumpNr;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{Hardware, HwError, HwResult, PumpActuator, SensorProbe};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One scripted outcome of [`MockProbe::read`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockReading {
    Value(f64),
    Nothing,
    Fail,
}

#[derive(Debug)]
struct MockProbeState {
    script: VecDeque<MockReading>,
    steady: Option<f64>,
    reads: u32,
}

/// Probe returning scripted readings, then a steady value once the script
/// runs out
#[derive(Debug)]
pub struct MockProbe {
    description: String,
    state: Mutex<MockProbeState>,
}

impl MockProbe {
    pub fn new(steady: Option<f64>) -> Self {
        Self {
            description: "mock probe".into(),
            state: Mutex::new(MockProbeState {
                script: VecDeque::new(),
                steady,
                reads: 0,
            }),
        }
    }

    pub fn scripted(readings: impl IntoIterator<Item = MockReading>, steady: Option<f64>) -> Self {
        let probe = Self::new(steady);
        lock(&probe.state).script.extend(readings);
        probe
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Change the value reported once the script is exhausted
    pub fn set_value(&self, value: Option<f64>) {
        lock(&self.state).steady = value;
    }

    pub fn push(&self, reading: MockReading) {
        lock(&self.state).script.push_back(reading);
    }

    pub fn read_count(&self) -> u32 {
        lock(&self.state).reads
    }
}

#[async_trait]
impl SensorProbe for MockProbe {
    async fn read(&self) -> HwResult<Option<f64>> {
        let mut state = lock(&self.state);
        state.reads += 1;
        match state.script.pop_front() {
            Some(MockReading::Value(v)) => Ok(Some(v)),
            Some(MockReading::Nothing) => Ok(None),
            Some(MockReading::Fail) => Err(HwError::ReadFailed("mock read failure".into())),
            None => Ok(state.steady),
        }
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Pump recording every physical transition
#[derive(Debug, Default)]
pub struct MockPump {
    on: AtomicBool,
    starts: AtomicU32,
    stops: AtomicU32,

    /// Configure start to fail
    pub fail_start: AtomicBool,

    /// Configure stop to fail
    pub fail_stop: AtomicBool,
}

impl MockPump {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }

    pub fn start_count(&self) -> u32 {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> u32 {
        self.stops.load(Ordering::SeqCst)
    }
}

impl PumpActuator for MockPump {
    fn start(&self) -> HwResult<()> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(HwError::Internal("mock start failure".into()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.on.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> HwResult<()> {
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(HwError::Internal("mock stop failure".into()));
        }
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.on.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory hardware.
///
/// Probes can be preset per channel before the system is built; channels
/// without a preset get a steady probe with a plausible reading for their
/// kind. Every created pump is kept so tests can inspect it.
#[derive(Debug, Default)]
pub struct MockHardware {
    probes: Mutex<HashMap<String, Arc<MockProbe>>>,
    pumps: Mutex<HashMap<PumpNr, Arc<MockPump>>>,

    /// Configure pump creation to fail
    pub fail_pumps: AtomicBool,
}

impl MockHardware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset the probe handed out for `channel`
    pub fn with_probe(self, channel: impl Into<String>, probe: Arc<MockProbe>) -> Self {
        lock(&self.probes).insert(channel.into(), probe);
        self
    }

    pub fn probe(&self, channel: &str) -> Option<Arc<MockProbe>> {
        lock(&self.probes).get(channel).cloned()
    }

    pub fn pump(&self, pump_nr: PumpNr) -> Option<Arc<MockPump>> {
        lock(&self.pumps).get(&pump_nr).cloned()
    }

    /// Numbers of all pumps currently switched on
    pub fn pumps_on(&self) -> Vec<PumpNr> {
        let mut on: Vec<PumpNr> = lock(&self.pumps)
            .iter()
            .filter(|(_, pump)| pump.is_on())
            .map(|(nr, _)| *nr)
            .collect();
        on.sort();
        on
    }

    fn default_reading(kind: SensorKind) -> f64 {
        match kind {
            SensorKind::Temperature => 21.5,
            SensorKind::Humidity => 45.0,
            SensorKind::Light => 60.0,
        }
    }
}

impl Hardware for MockHardware {
    fn sensor_probe(&self, kind: SensorKind, channel: &str) -> HwResult<Arc<dyn SensorProbe>> {
        let mut probes = lock(&self.probes);
        let probe = probes
            .entry(channel.to_string())
            .or_insert_with(|| {
                Arc::new(
                    MockProbe::new(Some(Self::default_reading(kind)))
                        .with_description(format!("mock {kind} on {channel}")),
                )
            })
            .clone();
        Ok(probe)
    }

    fn pump_actuator(
        &self,
        pump_nr: PumpNr,
        gpio: u32,
        _active_low: bool,
    ) -> HwResult<Arc<dyn PumpActuator>> {
        if self.fail_pumps.load(Ordering::SeqCst) {
            return Err(HwError::Gpio {
                gpio,
                message: "mock export failure".into(),
            });
        }
        let pump = Arc::new(MockPump::new());
        lock(&self.pumps).insert(pump_nr, pump.clone());
        Ok(pump)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn probe_plays_script_then_steady_value() {
        let probe = MockProbe::scripted(
            [MockReading::Value(1.0), MockReading::Fail, MockReading::Nothing],
            Some(7.0),
        );

        assert_eq!(probe.read().await.unwrap(), Some(1.0));
        assert!(probe.read().await.is_err());
        assert_eq!(probe.read().await.unwrap(), None);
        assert_eq!(probe.read().await.unwrap(), Some(7.0));
        assert_eq!(probe.read().await.unwrap(), Some(7.0));
        assert_eq!(probe.read_count(), 5);

        probe.set_value(None);
        assert_eq!(probe.read().await.unwrap(), None);
    }

    #[test]
    fn pump_counts_transitions() {
        let pump = MockPump::new();
        assert!(!pump.is_on());

        pump.start().unwrap();
        assert!(pump.is_on());
        pump.stop().unwrap();
        assert!(!pump.is_on());

        assert_eq!(pump.start_count(), 1);
        assert_eq!(pump.stop_count(), 1);
    }

    #[test]
    fn pump_failure_leaves_state_alone() {
        let pump = MockPump::new();
        pump.fail_start.store(true, Ordering::SeqCst);

        assert!(pump.start().is_err());
        assert!(!pump.is_on());
        assert_eq!(pump.start_count(), 0);
    }

    #[tokio::test]
    async fn hardware_hands_out_preset_probes() {
        let preset = Arc::new(MockProbe::new(Some(12.0)));
        let hw = MockHardware::new().with_probe("3", preset.clone());

        let probe = hw.sensor_probe(SensorKind::Humidity, "3").unwrap();
        assert_eq!(probe.read().await.unwrap(), Some(12.0));
        assert_eq!(preset.read_count(), 1);

        let other = hw.sensor_probe(SensorKind::Temperature, "w1").unwrap();
        assert_eq!(other.read().await.unwrap(), Some(21.5));
        assert!(hw.probe("w1").is_some());
    }

    #[test]
    fn hardware_tracks_pumps() {
        let hw = MockHardware::new();
        let a = hw.pump_actuator(PumpNr::new(1), 16, false).unwrap();
        hw.pump_actuator(PumpNr::new(2), 20, false).unwrap();

        a.start().unwrap();
        assert_eq!(hw.pumps_on(), vec![PumpNr::new(1)]);
        assert_eq!(hw.pump(PumpNr::new(2)).unwrap().start_count(), 0);
    }
}
