//! Inbound commands to the controller.
//!
//! A [`Command`] is built once by the
//! [`CommandParser`](super::parser::CommandParser) and consumed exactly
//! once, either by the actuation supervisor (through the queue) or by the
//! calibration sequencer.  It is never mutated after construction.

use core::fmt;
use core::time::Duration;

/// Longest inbound message kept verbatim in [`Command::raw`].
pub const MAX_RAW_LEN: usize = 64;

/// Original message text, truncated to [`MAX_RAW_LEN`] bytes.
pub type RawText = heapless::String<MAX_RAW_LEN>;

// ───────────────────────────────────────────────────────────────
// Targets
// ───────────────────────────────────────────────────────────────

/// Identifier of a physical output (irrigation zone or dosing pump).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActuatorId(pub u8);

impl fmt::Display for ActuatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The UART-attached chemistry probes.  Discriminants match the sensor
/// index used on the wire (`cal:1:…`, `cal:2:…`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Sensor {
    Ph = 1,
    Orp = 2,
}

impl Sensor {
    pub const ALL: [Sensor; 2] = [Sensor::Ph, Sensor::Orp];

    pub fn from_index(idx: u8) -> Option<Self> {
        match idx {
            1 => Some(Self::Ph),
            2 => Some(Self::Orp),
            _ => None,
        }
    }

    pub const fn index(self) -> u8 {
        self as u8
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Ph => "ph",
            Self::Orp => "orp",
        }
    }

    /// Vendor command that commits a calibration point on the probe.
    pub const fn finalize_command(self) -> &'static str {
        match self {
            Self::Ph => "Cal,mid,7.00",
            Self::Orp => "cal,225",
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Command
// ───────────────────────────────────────────────────────────────

/// What the command asks for.  Durations are always seconds; the
/// minutes-based irrigation form is converted by the parser.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandKind {
    /// Open an irrigation zone for a fixed time.
    Water { zone: ActuatorId, duration: Duration },
    /// Run a dosing pump for a fixed time.
    On { actuator: ActuatorId, duration: Duration },
    /// Drive one output off.
    Off { actuator: ActuatorId },
    /// Start a calibration session sampling every `interval`.
    Calibrate { sensor: Sensor, interval: Duration },
    /// Operator signal that the probe has settled; finalize calibration.
    Done { sensor: Sensor },
    /// Cancel the running actuation, drop the backlog, all outputs off.
    Stop,
    /// Out-of-band status report.
    Status,
}

impl CommandKind {
    /// Whether this command goes through the FIFO backlog.
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Water { .. } | Self::On { .. } | Self::Off { .. })
    }

    /// Requested run time for actuation commands.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::Water { duration, .. } | Self::On { duration, .. } => Some(*duration),
            _ => None,
        }
    }

    /// The output this command drives, if any.
    pub fn actuator(&self) -> Option<ActuatorId> {
        match self {
            Self::Water { zone, .. } => Some(*zone),
            Self::On { actuator, .. } | Self::Off { actuator } => Some(*actuator),
            _ => None,
        }
    }
}

/// A parsed inbound command together with the text it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub kind: CommandKind,
    pub raw: RawText,
}

impl Command {
    pub fn new(kind: CommandKind, raw: &str) -> Self {
        Self {
            kind,
            raw: truncate_raw(raw),
        }
    }
}

fn truncate_raw(raw: &str) -> RawText {
    let mut end = raw.len().min(MAX_RAW_LEN);
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    let mut text = RawText::new();
    // Cannot fail: `end` is within capacity.
    let _ = text.push_str(&raw[..end]);
    text
}
