//! Outbound application events.
//!
//! The domain emits these through the [`EventSink`](super::ports::EventSink)
//! port.  The [`Outbox`](super::report::Outbox) renders them into
//! topic/payload pairs for the broker; tests record them directly.

use core::fmt;
use core::time::Duration;

use crate::error::{ActuatorFault, CalibrationError, QueueError, SensorError};

use super::actuator::{Label, Snapshot};
use super::commands::{ActuatorId, Sensor};

/// Structured events emitted by the controller core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The controller finished boot and drove every output off.
    Online,

    /// An actuation was popped from the queue and its output engaged.
    ActuationStarted {
        actuator: ActuatorId,
        label: Label,
        duration: Duration,
    },

    /// The running actuation ended; every output is now off.
    ActuationEnded {
        actuator: ActuatorId,
        label: Label,
        reason: EndReason,
    },

    /// An `off` command drove a single output off.
    ActuatorReleased { actuator: ActuatorId, label: Label },

    /// Every output's engaged flag after a state change.
    Snapshot(Snapshot),

    /// Raw probe reading (the timeout sentinel included).
    Reading { sensor: Sensor, value: f32 },

    /// Moving average after the latest valid reading.
    Average { sensor: Sensor, value: f32 },

    /// Calibration lifecycle.
    Calibration { sensor: Sensor, phase: CalibrationPhase },

    /// WiFi signal strength for a status request (`None` when unknown).
    Rssi(Option<i32>),

    /// Water temperature for a status request.
    Temperature(f32),

    /// The temperature probe did not answer a status request.
    TemperatureError(SensorError),

    /// A message could not be parsed.
    UnknownCommand,

    /// A non-fatal problem worth telling the operator about.
    Diagnostic(Diagnostic),
}

/// Why a running actuation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    TimeUp,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    Start,
    End,
    Timeout,
}

impl CalibrationPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Timeout => "timeout",
        }
    }
}

/// Non-fatal errors that surface as `error: …` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// A command was dropped because the backlog is full.
    Queue(QueueError),
    Actuator(ActuatorFault),
    Calibration(CalibrationError),
    Sensor { sensor: Sensor, error: SensorError },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queue(e) => write!(f, "command dropped, {e}"),
            Self::Actuator(e) => write!(f, "{e}"),
            Self::Calibration(e) => write!(f, "{e}"),
            Self::Sensor { sensor, error } => write!(f, "{} sensor {error}", sensor.label()),
        }
    }
}

impl From<ActuatorFault> for AppEvent {
    fn from(e: ActuatorFault) -> Self {
        Self::Diagnostic(Diagnostic::Actuator(e))
    }
}

impl From<CalibrationError> for AppEvent {
    fn from(e: CalibrationError) -> Self {
        Self::Diagnostic(Diagnostic::Calibration(e))
    }
}

impl From<QueueError> for AppEvent {
    fn from(e: QueueError) -> Self {
        Self::Diagnostic(Diagnostic::Queue(e))
    }
}
