//! GPIO output adapter.
//!
//! Implements [`ActuatorPort`] over any `embedded-hal` output pin, one pin
//! per actuator id.  On the device the pins are `esp-idf-hal`
//! `PinDriver`s; host tests plug in recording pins.

use embedded_hal::digital::OutputPin;
use log::{debug, warn};

use crate::app::commands::ActuatorId;
use crate::app::ports::ActuatorPort;
use crate::config::MAX_ACTUATORS;

/// Output pins keyed by actuator id.
pub struct PinBank<P> {
    pins: heapless::Vec<(ActuatorId, P), MAX_ACTUATORS>,
}

impl<P: OutputPin> PinBank<P> {
    pub fn new() -> Self {
        Self {
            pins: heapless::Vec::new(),
        }
    }

    /// Register the pin for `id` and drive it low.  Returns the pin back
    /// if the bank is full or the id is already taken.
    pub fn attach(&mut self, id: ActuatorId, mut pin: P) -> Result<(), P> {
        if self.pins.iter().any(|(existing, _)| *existing == id) {
            return Err(pin);
        }
        if pin.set_low().is_err() {
            warn!("GPIO: actuator {} failed to initialise low", id);
        }
        self.pins.push((id, pin)).map_err(|(_, pin)| pin)
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    fn drive(id: ActuatorId, pin: &mut P, on: bool) {
        let result = if on { pin.set_high() } else { pin.set_low() };
        if result.is_err() {
            warn!("GPIO: actuator {} write failed", id);
        }
    }
}

impl<P: OutputPin> Default for PinBank<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: OutputPin> ActuatorPort for PinBank<P> {
    fn set_output(&mut self, id: ActuatorId, on: bool) {
        match self.pins.iter_mut().find(|(pid, _)| *pid == id) {
            Some((_, pin)) => {
                debug!("GPIO: actuator {} -> {}", id, if on { "high" } else { "low" });
                Self::drive(id, pin, on);
            }
            None => warn!("GPIO: no pin for actuator {}", id),
        }
    }

    fn all_off(&mut self) {
        for (id, pin) in &mut self.pins {
            Self::drive(*id, pin, false);
        }
    }
}
