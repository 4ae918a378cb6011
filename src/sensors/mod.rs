//! Sensor subsystem: probe drivers and the aggregating [`ProbeBank`].
//!
//! The bank owns the two EZO circuits and the temperature probe and
//! exposes them through [`SensorPort`].  Irrigation controllers have no
//! probes and use [`NoProbes`] instead.

pub mod ds18b20;
pub mod ezo;

use log::warn;

use crate::app::commands::Sensor;
use crate::app::ports::SensorPort;
use crate::error::SensorError;
use ezo::{EzoProbe, ProbeLink};

/// Anything that yields a water temperature.
pub trait Thermometer {
    fn read_celsius(&mut self) -> Result<f32, SensorError>;
}

/// pH and ORP circuits plus an optional temperature probe.
pub struct ProbeBank<L, T> {
    ph: EzoProbe<L>,
    orp: EzoProbe<L>,
    temperature: Option<T>,
}

impl<L: ProbeLink, T: Thermometer> ProbeBank<L, T> {
    pub fn new(ph: EzoProbe<L>, orp: EzoProbe<L>, temperature: Option<T>) -> Self {
        if temperature.is_none() {
            warn!("no temperature probe configured");
        }
        Self {
            ph,
            orp,
            temperature,
        }
    }

    fn probe(&mut self, sensor: Sensor) -> &mut EzoProbe<L> {
        match sensor {
            Sensor::Ph => &mut self.ph,
            Sensor::Orp => &mut self.orp,
        }
    }
}

impl<L: ProbeLink, T: Thermometer> SensorPort for ProbeBank<L, T> {
    fn read(&mut self, sensor: Sensor) -> Result<f32, SensorError> {
        self.probe(sensor).read()
    }

    fn send_command(&mut self, sensor: Sensor, command: &str) -> Result<(), SensorError> {
        self.probe(sensor).command(command)
    }

    fn read_temperature(&mut self) -> Result<f32, SensorError> {
        self.temperature
            .as_mut()
            .ok_or(SensorError::NotPresent)?
            .read_celsius()
    }
}

/// Sensor port for controllers without probes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProbes;

impl SensorPort for NoProbes {
    fn read(&mut self, _: Sensor) -> Result<f32, SensorError> {
        Err(SensorError::NotPresent)
    }

    fn send_command(&mut self, _: Sensor, _: &str) -> Result<(), SensorError> {
        Err(SensorError::NotPresent)
    }

    fn read_temperature(&mut self) -> Result<f32, SensorError> {
        Err(SensorError::NotPresent)
    }
}
