//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! Driven adapters (GPIO, probe UARTs, MQTT, WiFi, flash config) implement
//! these traits.  The [`Controller`](super::service::Controller) consumes
//! them via generics, so the domain core never touches hardware directly.
//!
//! Only [`TransportPort`] errors are fatal to the controller; every other
//! port reports failures that end up as published diagnostics.

use std::time::{Duration, Instant};

use crate::config::ControllerConfig;
use crate::error::{SensorError, TransportError};

use super::commands::{ActuatorId, Sensor};
use super::events::AppEvent;

/// Largest inbound message accepted from the broker.
pub const MAX_INBOUND_LEN: usize = 128;

/// Raw payload of one inbound message.
pub type InboundPayload = heapless::Vec<u8, MAX_INBOUND_LEN>;

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: one digital output per actuator id.
pub trait ActuatorPort {
    /// Drive the output for `id` on or off.  Unknown ids are ignored.
    fn set_output(&mut self, id: ActuatorId, on: bool);

    /// Drive every output off.  Used at boot and before a restart.
    fn all_off(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the chemistry probes and the temperature probe.
///
/// Every call is a bounded-timeout blocking transaction; a silent probe
/// yields [`SensorError::Timeout`], never a hang.
pub trait SensorPort {
    /// Request and read one value from a probe.
    fn read(&mut self, sensor: Sensor) -> Result<f32, SensorError>;

    /// Send a raw vendor command (without terminator) to a probe.
    fn send_command(&mut self, sensor: Sensor, command: &str) -> Result<(), SensorError>;

    /// Water temperature in °C.
    fn read_temperature(&mut self) -> Result<f32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Transport port (driven adapter: domain ↔ broker)
// ───────────────────────────────────────────────────────────────

/// Publish/subscribe message channel.
pub trait TransportPort {
    /// First connection, including the last-will registration.
    fn connect(&mut self) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;

    /// Sessions established so far.  Changes whenever the broker session
    /// was re-established, including by the client library on its own;
    /// a new session starts without subscriptions.
    fn session_generation(&self) -> u32;

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), TransportError>;

    /// Non-blocking poll for the next inbound message on any subscription.
    fn check_message(&mut self) -> Option<InboundPayload>;

    /// Re-establish a dropped session.  Subscriptions must be renewed by
    /// the caller afterwards.
    fn reconnect(&mut self) -> Result<(), TransportError>;

    /// Keepalive probe.
    fn ping(&mut self) -> Result<(), TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Link port (driven adapter: WiFi station)
// ───────────────────────────────────────────────────────────────

/// Link-layer connectivity beneath the transport.
pub trait LinkPort {
    fn is_link_up(&self) -> bool;

    /// Signal strength of the configured network in dBm, if visible.
    fn rssi(&mut self) -> Option<i32>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source and the loop's only suspension point.
pub trait ClockPort {
    fn now(&self) -> Instant;

    fn sleep(&mut self, duration: Duration);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → outbox / test recorder)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: flash → domain)
// ───────────────────────────────────────────────────────────────

/// Loads the controller configuration.
///
/// Implementations MUST run [`ControllerConfig::validate`] before
/// returning; an invalid file is an error, never silently clamped.
pub trait ConfigPort {
    fn load(&self) -> Result<ControllerConfig, ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No config file on the filesystem.
    NotFound,
    /// The file is not valid JSON or a key has the wrong type.
    Corrupted,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the filesystem.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
