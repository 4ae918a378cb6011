//! Periodic probe reporting.
//!
//! Every `report_interval` the reporter reads pH then ORP, publishes each
//! raw value and feeds the probe's moving-average window.  The calibration
//! sequencer samples through the same [`sample_probe`] path.

use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::error::FilterError;

use super::commands::Sensor;
use super::events::{AppEvent, Diagnostic};
use super::filter::MovingAverageWindow;
use super::ports::{EventSink, SensorPort};

/// Published in place of a reading when the probe did not answer.
pub const SENTINEL_READING: f32 = 8.888;

/// One moving-average window per chemistry probe.
#[derive(Debug, Clone)]
pub struct ProbeFilters {
    ph: MovingAverageWindow,
    orp: MovingAverageWindow,
}

impl ProbeFilters {
    pub fn new(ph_window: usize, orp_window: usize) -> Result<Self, FilterError> {
        Ok(Self {
            ph: MovingAverageWindow::new(ph_window)?,
            orp: MovingAverageWindow::new(orp_window)?,
        })
    }

    pub fn window(&self, sensor: Sensor) -> &MovingAverageWindow {
        match sensor {
            Sensor::Ph => &self.ph,
            Sensor::Orp => &self.orp,
        }
    }

    pub fn window_mut(&mut self, sensor: Sensor) -> &mut MovingAverageWindow {
        match sensor {
            Sensor::Ph => &mut self.ph,
            Sensor::Orp => &mut self.orp,
        }
    }
}

/// Read one probe and publish the reading plus the updated average.
///
/// A failed read publishes [`SENTINEL_READING`] and a diagnostic.  The
/// sentinel is kept out of the window; the last valid average, if any, is
/// published again.  Returns the valid reading.
pub fn sample_probe(
    sensor: Sensor,
    probes: &mut impl SensorPort,
    filters: &mut ProbeFilters,
    sink: &mut impl EventSink,
) -> Option<f32> {
    match probes.read(sensor) {
        Ok(value) => {
            let average = filters.window_mut(sensor).push(value);
            debug!("{}: {} (avg {})", sensor.label(), value, average);
            sink.emit(&AppEvent::Reading { sensor, value });
            sink.emit(&AppEvent::Average {
                sensor,
                value: average,
            });
            Some(value)
        }
        Err(error) => {
            warn!("{} read failed: {}", sensor.label(), error);
            sink.emit(&AppEvent::Reading {
                sensor,
                value: SENTINEL_READING,
            });
            sink.emit(&AppEvent::Diagnostic(Diagnostic::Sensor { sensor, error }));
            if let Some(average) = filters.window(sensor).average() {
                sink.emit(&AppEvent::Average {
                    sensor,
                    value: average,
                });
            }
            None
        }
    }
}

/// Fixed-cadence scheduler for the periodic probe report.
pub struct SensorReporter {
    period: Duration,
    next_due: Instant,
}

impl SensorReporter {
    /// The first report fires `startup_delay` after `now`.
    pub fn new(now: Instant, startup_delay: Duration, period: Duration) -> Self {
        Self {
            period,
            next_due: now + startup_delay,
        }
    }

    pub fn next_due(&self) -> Instant {
        self.next_due
    }

    /// Report every probe if due.  `skip` names a probe owned by a
    /// calibration session this tick.
    pub fn tick(
        &mut self,
        now: Instant,
        skip: Option<Sensor>,
        probes: &mut impl SensorPort,
        filters: &mut ProbeFilters,
        sink: &mut impl EventSink,
    ) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = now + self.period;
        for sensor in Sensor::ALL {
            if skip == Some(sensor) {
                debug!("{} under calibration; skipped", sensor.label());
                continue;
            }
            sample_probe(sensor, probes, filters, sink);
        }
        true
    }
}
