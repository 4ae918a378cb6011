//! Hardware adapter: bridges real peripherals to the domain port traits.
//!
//! Owns the output pins and the probe bank and exposes them through
//! [`ActuatorPort`] and [`SensorPort`], which is the pairing
//! [`Controller::tick`](crate::app::service::Controller::tick) expects.

use crate::app::commands::{ActuatorId, Sensor};
use crate::app::ports::{ActuatorPort, SensorPort};
use crate::error::SensorError;

/// Concrete adapter that combines all hardware behind port traits.
pub struct Hardware<A, S> {
    outputs: A,
    sensors: S,
}

impl<A: ActuatorPort, S: SensorPort> Hardware<A, S> {
    pub fn new(outputs: A, sensors: S) -> Self {
        Self { outputs, sensors }
    }

    pub fn outputs(&self) -> &A {
        &self.outputs
    }

    pub fn sensors(&self) -> &S {
        &self.sensors
    }

    pub fn sensors_mut(&mut self) -> &mut S {
        &mut self.sensors
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<A: ActuatorPort, S> ActuatorPort for Hardware<A, S> {
    fn set_output(&mut self, id: ActuatorId, on: bool) {
        self.outputs.set_output(id, on);
    }

    fn all_off(&mut self) {
        self.outputs.all_off();
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<A, S: SensorPort> SensorPort for Hardware<A, S> {
    fn read(&mut self, sensor: Sensor) -> Result<f32, SensorError> {
        self.sensors.read(sensor)
    }

    fn send_command(&mut self, sensor: Sensor, command: &str) -> Result<(), SensorError> {
        self.sensors.send_command(sensor, command)
    }

    fn read_temperature(&mut self) -> Result<f32, SensorError> {
        self.sensors.read_temperature()
    }
}
