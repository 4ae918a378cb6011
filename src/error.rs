//! Unified error types for the aquactl firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! top-level control loop's error handling uniform.  All variants are
//! `Copy` so they can be passed through the tick path without allocation.
//!
//! Only [`TransportError`] is fatal: it escapes `Controller::tick` and the
//! binary answers it with a bounded delay followed by a restart.  Every
//! other class ends up as a published diagnostic string.

use core::fmt;

use crate::app::commands::{ActuatorId, Sensor};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An inbound message could not be turned into a command.
    Parse(ParseError),
    /// The pending-command queue rejected an operation.
    Queue(QueueError),
    /// A sensor transaction failed or timed out.
    Sensor(SensorError),
    /// A calibration request conflicts with the current session.
    Calibration(CalibrationError),
    /// A moving-average window could not be built.
    Filter(FilterError),
    /// The message transport failed.
    Transport(TransportError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "parse: {e}"),
            Self::Queue(e) => write!(f, "queue: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Calibration(e) => write!(f, "calibration: {e}"),
            Self::Filter(e) => write!(f, "filter: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The message was empty or not valid UTF-8.
    Empty,
    /// Field 0 is not a known keyword.
    UnrecognizedCommand,
    /// The actuator or sensor index is absent.
    MissingTarget,
    /// The actuator or sensor index is not a small non-negative integer.
    InvalidTarget,
    /// A duration/interval field is required but absent.
    MissingDuration,
    /// The duration field is not a finite, non-negative number.
    InvalidDuration,
    /// The keyword takes fewer fields than were supplied.
    UnexpectedField,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty message"),
            Self::UnrecognizedCommand => write!(f, "unrecognized command"),
            Self::MissingTarget => write!(f, "missing target index"),
            Self::InvalidTarget => write!(f, "invalid target index"),
            Self::MissingDuration => write!(f, "missing duration"),
            Self::InvalidDuration => write!(f, "invalid duration"),
            Self::UnexpectedField => write!(f, "unexpected extra field"),
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

// ---------------------------------------------------------------------------
// Queue errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// `pop_front` on an empty queue.
    Empty,
    /// The bounded backlog is at capacity; the command was dropped.
    Full,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "queue empty"),
            Self::Full => write!(f, "queue full"),
        }
    }
}

impl From<QueueError> for Error {
    fn from(e: QueueError) -> Self {
        Self::Queue(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// No complete response arrived within the read timeout.
    Timeout,
    /// The UART or GPIO transaction itself failed.
    Io,
    /// A response arrived but could not be parsed as a reading.
    Malformed,
    /// No device answered (1-Wire presence pulse missing, unknown channel).
    NotPresent,
    /// Scratchpad checksum mismatch.
    Crc,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "read timed out"),
            Self::Io => write!(f, "bus I/O failed"),
            Self::Malformed => write!(f, "malformed response"),
            Self::NotPresent => write!(f, "device not present"),
            Self::Crc => write!(f, "checksum mismatch"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Calibration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    /// A session for this sensor is already sampling.
    AlreadyRunning(Sensor),
    /// Another sensor is being calibrated; only one session runs at a time.
    Busy { running: Sensor },
    /// `done` arrived for a sensor that has no session.
    NotRunning(Sensor),
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning(s) => write!(f, "calibration of {} already running", s.label()),
            Self::Busy { running } => write!(f, "calibration of {} in progress", running.label()),
            Self::NotRunning(s) => write!(f, "no calibration running for {}", s.label()),
        }
    }
}

impl From<CalibrationError> for Error {
    fn from(e: CalibrationError) -> Self {
        Self::Calibration(e)
    }
}

// ---------------------------------------------------------------------------
// Filter errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterError {
    /// A window of capacity 0 has no defined average.
    EmptyWindow,
    /// Capacity exceeds the fixed storage of the window.
    CapacityTooLarge,
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyWindow => write!(f, "window capacity must be at least 1"),
            Self::CapacityTooLarge => write!(f, "window capacity too large"),
        }
    }
}

impl From<FilterError> for Error {
    fn from(e: FilterError) -> Self {
        Self::Filter(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    ConnectFailed,
    NotConnected,
    PublishFailed,
    SubscribeFailed,
    PingFailed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed => write!(f, "broker connect failed"),
            Self::NotConnected => write!(f, "not connected"),
            Self::PublishFailed => write!(f, "publish failed"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
            Self::PingFailed => write!(f, "keepalive failed"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator diagnostics
// ---------------------------------------------------------------------------

/// Non-fatal actuation problems.  These never abort a tick; they become
/// `error: …` strings on the response topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorFault {
    /// No output is configured under this id.
    Unknown(ActuatorId),
    /// The output exists but is administratively disabled.
    Disabled(ActuatorId),
}

impl fmt::Display for ActuatorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(id) => write!(f, "unknown actuator {}", id.0),
            Self::Disabled(id) => write!(f, "actuator {} disabled", id.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_prefixed_by_class() {
        let e: Error = ParseError::MissingDuration.into();
        assert_eq!(e.to_string(), "parse: missing duration");
        let e: Error = TransportError::PublishFailed.into();
        assert_eq!(e.to_string(), "transport: publish failed");
    }

    #[test]
    fn calibration_errors_name_the_sensor() {
        let e = CalibrationError::Busy { running: Sensor::Orp };
        assert_eq!(e.to_string(), "calibration of orp in progress");
    }
}
