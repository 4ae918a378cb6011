//! Report rendering and the outbound queue.
//!
//! [`render`] turns an [`AppEvent`] into the topic/payload pair the
//! operators' dashboards expect.  The [`Outbox`] is the controller's
//! [`EventSink`]: it logs every event, renders it, and keeps the result in
//! a bounded FIFO until the transport is connected.

use core::fmt::Write as _;

use heapless::Deque;
use log::{info, warn};

use crate::config::{ControllerConfig, Variant};
use crate::error::TransportError;

use super::commands::Sensor;
use super::events::AppEvent;
use super::ports::{EventSink, TransportPort};

/// Reports kept while the broker is unreachable.
pub const OUTBOX_CAPACITY: usize = 32;

pub type Payload = heapless::String<128>;

/// Logical destination of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    /// `resp_pub`: lifecycle strings, diagnostics, status, zone snapshots.
    Response,
    /// Raw probe readings.
    Reading(Sensor),
    /// `<reading topic>/moving_average`.
    Average(Sensor),
}

/// A rendered report awaiting publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub topic: Topic,
    pub payload: Payload,
}

/// Concrete topic strings, resolved once from configuration.
#[derive(Debug, Clone)]
pub struct Topics {
    response: String,
    ph: String,
    orp: String,
    ph_average: String,
    orp_average: String,
}

impl Topics {
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self {
            response: config.resp_pub.clone(),
            ph: config.ph_topic_pub.clone(),
            orp: config.orp_topic_pub.clone(),
            ph_average: format!("{}/moving_average", config.ph_topic_pub),
            orp_average: format!("{}/moving_average", config.orp_topic_pub),
        }
    }

    pub fn resolve(&self, topic: Topic) -> &str {
        match topic {
            Topic::Response => &self.response,
            Topic::Reading(Sensor::Ph) => &self.ph,
            Topic::Reading(Sensor::Orp) => &self.orp,
            Topic::Average(Sensor::Ph) => &self.ph_average,
            Topic::Average(Sensor::Orp) => &self.orp_average,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Rendering
// ───────────────────────────────────────────────────────────────

/// Wire form of an event, or `None` if this variant does not publish it.
///
/// Dosing controllers announce pump transitions as `<label>:on|off`;
/// irrigation controllers publish the full `zone<i>:<bool>` snapshot
/// after every change instead.
pub fn render(event: &AppEvent, variant: Variant) -> Option<Outbound> {
    let mut payload = Payload::new();
    let topic = match (event, variant) {
        (AppEvent::Online, _) => {
            payload.push_str("online").ok()?;
            Topic::Response
        }
        (AppEvent::ActuationStarted { label, .. }, Variant::Dosing) => {
            write!(payload, "{label}:on").ok()?;
            Topic::Response
        }
        (
            AppEvent::ActuationEnded { label, .. } | AppEvent::ActuatorReleased { label, .. },
            Variant::Dosing,
        ) => {
            write!(payload, "{label}:off").ok()?;
            Topic::Response
        }
        (AppEvent::Snapshot(snapshot), Variant::Irrigation) => {
            for (i, state) in snapshot.iter().enumerate() {
                if i > 0 {
                    payload.push(',').ok()?;
                }
                write!(payload, "{}:{}", state.label, state.engaged).ok()?;
            }
            Topic::Response
        }
        (
            AppEvent::ActuationStarted { .. }
            | AppEvent::ActuationEnded { .. }
            | AppEvent::ActuatorReleased { .. },
            Variant::Irrigation,
        )
        | (AppEvent::Snapshot(_), Variant::Dosing) => return None,
        (AppEvent::Reading { sensor, value }, _) => {
            write_reading(&mut payload, *value).ok()?;
            Topic::Reading(*sensor)
        }
        (AppEvent::Average { sensor, value }, _) => {
            write_reading(&mut payload, *value).ok()?;
            Topic::Average(*sensor)
        }
        (AppEvent::Calibration { sensor, phase }, _) => {
            write!(payload, "cal:{}:{}", sensor.index(), phase.as_str()).ok()?;
            Topic::Response
        }
        (AppEvent::Rssi(rssi), _) => {
            write!(payload, "RSSI: {}", rssi.unwrap_or(UNKNOWN_RSSI)).ok()?;
            Topic::Response
        }
        (AppEvent::Temperature(celsius), _) => {
            payload.push_str("temp: ").ok()?;
            write_reading(&mut payload, *celsius).ok()?;
            Topic::Response
        }
        (AppEvent::TemperatureError(_), _) => {
            payload.push_str("temp sensor error").ok()?;
            Topic::Response
        }
        (AppEvent::UnknownCommand, _) => {
            payload.push_str("unknown command").ok()?;
            Topic::Response
        }
        (AppEvent::Diagnostic(diag), _) => {
            write!(payload, "error: {diag}").ok()?;
            Topic::Response
        }
    };
    Some(Outbound { topic, payload })
}

/// Reported in place of an RSSI when the configured network is not visible.
pub const UNKNOWN_RSSI: i32 = -199;

/// Whole numbers keep one decimal (`7.0`), everything else prints in its
/// shortest round-trip form (`8.888`).
fn write_reading(out: &mut Payload, value: f32) -> core::fmt::Result {
    if value.is_finite() && value.fract() == 0.0 {
        write!(out, "{value:.1}")
    } else {
        write!(out, "{value}")
    }
}

// ───────────────────────────────────────────────────────────────
// Outbox
// ───────────────────────────────────────────────────────────────

/// Bounded FIFO of rendered reports.  When full, the oldest report is
/// dropped to make room.
pub struct Outbox {
    variant: Variant,
    pending: Deque<Outbound, OUTBOX_CAPACITY>,
    dropped: u32,
}

impl Outbox {
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            pending: Deque::new(),
            dropped: 0,
        }
    }

    /// Publish everything pending, oldest first.  A report is only
    /// removed once the broker accepted it.
    pub fn flush(
        &mut self,
        transport: &mut impl TransportPort,
        topics: &Topics,
    ) -> Result<usize, TransportError> {
        let mut sent = 0;
        while let Some(next) = self.pending.front() {
            transport.publish(topics.resolve(next.topic), &next.payload)?;
            self.pending.pop_front();
            sent += 1;
        }
        Ok(sent)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Reports discarded because the outbox was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &Outbound> {
        self.pending.iter()
    }
}

impl EventSink for Outbox {
    fn emit(&mut self, event: &AppEvent) {
        let Some(report) = render(event, self.variant) else {
            info!("EVENT | {:?}", event);
            return;
        };
        info!("EVENT | {:?} -> {}", report.topic, report.payload);
        if self.pending.is_full() {
            self.pending.pop_front();
            self.dropped += 1;
            warn!("outbox full; oldest report dropped ({} so far)", self.dropped);
        }
        let _ = self.pending.push_back(report);
    }
}
