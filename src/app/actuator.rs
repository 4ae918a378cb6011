//! Actuators — physical on/off outputs gated by an administrative flag.
//!
//! The [`ActuatorBank`] is owned by the actuation supervisor.  `engaged`
//! is the only field that changes at runtime, and it is only ever set
//! after the corresponding pin write went out through [`ActuatorPort`].
//!
//! Invariant: `engaged` implies `active`.

use core::fmt::Write as _;

use log::{debug, warn};

use crate::config::MAX_ACTUATORS;
use crate::error::ActuatorFault;

use super::commands::ActuatorId;
use super::ports::ActuatorPort;

/// Short human-readable name (`ph`, `orp`, `zone3`).
pub type Label = heapless::String<12>;

/// Static description of one output, derived from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuatorSpec {
    pub id: ActuatorId,
    /// GPIO number driving the output.
    pub pin: u8,
    pub label: Label,
    /// Administratively enabled.
    pub active: bool,
}

/// Runtime view of one output, as published in snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuatorState {
    pub id: ActuatorId,
    pub label: Label,
    pub engaged: bool,
}

/// Every output's `engaged` flag, in configuration order.
pub type Snapshot = heapless::Vec<ActuatorState, MAX_ACTUATORS>;

/// Outcome of an engage request on a known actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engagement {
    Engaged,
    /// The actuator is disabled; nothing was driven.
    Disabled,
}

#[derive(Debug, Clone)]
pub struct Actuator {
    id: ActuatorId,
    label: Label,
    active: bool,
    engaged: bool,
}

impl Actuator {
    pub fn new(spec: &ActuatorSpec) -> Self {
        Self {
            id: spec.id,
            label: spec.label.clone(),
            active: spec.active,
            engaged: false,
        }
    }

    pub fn id(&self) -> ActuatorId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// Drive the output on.  A disabled actuator is left untouched.
    pub fn engage(&mut self, out: &mut impl ActuatorPort) -> Engagement {
        if !self.active {
            warn!("actuator {} ({}) is disabled; not engaging", self.id, self.label);
            return Engagement::Disabled;
        }
        out.set_output(self.id, true);
        self.engaged = true;
        debug!("actuator {} ({}) engaged", self.id, self.label);
        Engagement::Engaged
    }

    /// Drive the output off.  Always writes the pin, even if the flag
    /// already says off.
    pub fn disengage(&mut self, out: &mut impl ActuatorPort) {
        out.set_output(self.id, false);
        if self.engaged {
            debug!("actuator {} ({}) disengaged", self.id, self.label);
        }
        self.engaged = false;
    }
}

// ───────────────────────────────────────────────────────────────
// ActuatorBank
// ───────────────────────────────────────────────────────────────

/// Every configured output.
#[derive(Debug, Clone, Default)]
pub struct ActuatorBank {
    actuators: heapless::Vec<Actuator, MAX_ACTUATORS>,
}

impl ActuatorBank {
    pub fn from_layout(layout: &[ActuatorSpec]) -> Self {
        let mut actuators = heapless::Vec::new();
        for spec in layout.iter().take(MAX_ACTUATORS) {
            let _ = actuators.push(Actuator::new(spec));
        }
        Self { actuators }
    }

    pub fn get(&self, id: ActuatorId) -> Option<&Actuator> {
        self.actuators.iter().find(|a| a.id == id)
    }

    fn get_mut(&mut self, id: ActuatorId) -> Result<&mut Actuator, ActuatorFault> {
        self.actuators
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(ActuatorFault::Unknown(id))
    }

    /// Engage one output.  Unknown and disabled ids are faults, never
    /// fatal; the pin is not touched.
    pub fn engage(&mut self, id: ActuatorId, out: &mut impl ActuatorPort) -> Result<(), ActuatorFault> {
        match self.get_mut(id)?.engage(out) {
            Engagement::Engaged => Ok(()),
            Engagement::Disabled => Err(ActuatorFault::Disabled(id)),
        }
    }

    pub fn disengage(&mut self, id: ActuatorId, out: &mut impl ActuatorPort) -> Result<(), ActuatorFault> {
        self.get_mut(id)?.disengage(out);
        Ok(())
    }

    /// Fail-safe: drive every output off, whatever its flag says.
    pub fn disengage_all(&mut self, out: &mut impl ActuatorPort) {
        for actuator in &mut self.actuators {
            actuator.disengage(out);
        }
    }

    pub fn engaged_count(&self) -> usize {
        self.actuators.iter().filter(|a| a.engaged).count()
    }

    pub fn label_of(&self, id: ActuatorId) -> Label {
        match self.get(id) {
            Some(a) => a.label.clone(),
            None => {
                let mut label = Label::new();
                let _ = write!(label, "{id}");
                label
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.actuators
            .iter()
            .map(|a| ActuatorState {
                id: a.id,
                label: a.label.clone(),
                engaged: a.engaged,
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Actuator> {
        self.actuators.iter()
    }

    pub fn len(&self) -> usize {
        self.actuators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actuators.is_empty()
    }
}
