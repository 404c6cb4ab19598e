//! The full set of loops built from one setup

use chilwater_api::{SystemSnapshot, API_VERSION};
use chilwater_config::Setup;
use chilwater_hw_api::Hardware;
use chilwater_util::{ControllerNr, SensorNr};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::{Controller, CoreError, CoreResult, Pumper, Rule, Sensor};

/// Every sensor, controller and the Pumper of one run cycle.
///
/// A reload builds a new System; nothing carries over from the previous one.
pub struct System {
    pumper: Arc<Pumper>,
    sensors: BTreeMap<SensorNr, Arc<Sensor>>,
    controllers: BTreeMap<ControllerNr, Arc<Controller>>,
    tasks: Vec<JoinHandle<()>>,
    started: bool,
}

impl System {
    /// Build every entity from a validated setup, creating their hardware
    pub fn build(setup: &Setup, hardware: &dyn Hardware) -> CoreResult<Self> {
        let tick = setup.daemon.tick_interval;
        let pumper = Arc::new(Pumper::new(tick));

        for spec in &setup.pumps {
            let actuator = hardware.pump_actuator(spec.nr, spec.gpio, spec.active_low)?;
            pumper.add_pump(spec.nr, actuator)?;
        }

        let mut sensors = BTreeMap::new();
        for spec in &setup.sensors {
            if sensors.contains_key(&spec.nr) {
                return Err(CoreError::DuplicateSensor(spec.nr));
            }
            let probe = hardware.sensor_probe(spec.kind, &spec.channel)?;
            let sensor = Sensor::new(spec.nr, spec.kind, spec.channel.clone(), probe, tick);
            sensors.insert(spec.nr, Arc::new(sensor));
        }

        let mut controllers = BTreeMap::new();
        for spec in &setup.controllers {
            if controllers.contains_key(&spec.nr) {
                return Err(CoreError::DuplicateController(spec.nr));
            }
            if !pumper.has_pump(spec.pump) {
                return Err(CoreError::PumpNotFound(spec.pump));
            }
            let sensor = match spec.sensor {
                Some(nr) => Some(
                    sensors
                        .get(&nr)
                        .cloned()
                        .ok_or(CoreError::SensorNotFound(nr))?,
                ),
                None => None,
            };

            let controller = Controller::new(spec.nr, spec.pump, sensor, pumper.clone(), tick);
            for rule in &spec.rules {
                controller.add_rule(Rule::from_spec(rule))?;
            }
            controllers.insert(spec.nr, Arc::new(controller));
        }

        info!(
            hardware = hardware.name(),
            pumps = setup.pumps.len(),
            sensors = sensors.len(),
            controllers = controllers.len(),
            tick_ms = tick.as_millis() as u64,
            "System built"
        );

        Ok(Self {
            pumper,
            sensors,
            controllers,
            tasks: Vec::new(),
            started: false,
        })
    }

    /// Spawn one task per sensor, per controller and one for the Pumper.
    /// Must be called within a tokio runtime.
    pub fn start(&mut self) {
        if self.started {
            warn!("System already started");
            return;
        }
        self.started = true;

        for sensor in self.sensors.values() {
            self.tasks.push(tokio::spawn(sensor.clone().run()));
        }
        self.tasks.push(tokio::spawn(self.pumper.clone().run()));
        for controller in self.controllers.values() {
            self.tasks.push(tokio::spawn(controller.clone().run()));
        }

        info!(tasks = self.tasks.len(), "System started");
    }

    /// Stop controllers, then sensors, then the Pumper, and wait for every
    /// loop to finish. The Pumper switches every pump off as it stops.
    pub async fn shutdown(mut self) {
        info!("System shutting down");

        for controller in self.controllers.values() {
            controller.stop();
        }
        for sensor in self.sensors.values() {
            sensor.stop();
        }
        self.pumper.stop();

        if !self.started {
            // No loop will observe the stop; switch the pumps off here
            self.pumper.tick(chilwater_util::MonotonicInstant::now());
        }

        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                error!(error = %e, "Loop task failed");
            }
        }

        info!("System stopped");
    }

    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot {
            api_version: API_VERSION,
            taken_at: chilwater_util::now(),
            pumper_state: self.pumper.state(),
            pumps: self.pumper.pump_states(),
            sensors: self.sensors.values().map(|s| s.view()).collect(),
            controllers: self.controllers.values().map(|c| c.view()).collect(),
        }
    }

    pub fn pumper(&self) -> &Arc<Pumper> {
        &self.pumper
    }

    pub fn sensor(&self, nr: SensorNr) -> Option<&Arc<Sensor>> {
        self.sensors.get(&nr)
    }

    pub fn controller(&self, nr: ControllerNr) -> Option<&Arc<Controller>> {
        self.controllers.get(&nr)
    }

    pub fn sensors(&self) -> impl Iterator<Item = &Arc<Sensor>> {
        self.sensors.values()
    }

    pub fn controllers(&self) -> impl Iterator<Item = &Arc<Controller>> {
        self.controllers.values()
    }
}
