//! Calibration sequencer.
//!
//! ```text
//!   Calibrate ──▶ Sampling ──┬── done received ──▶ Finished  (finalize sent)
//!                            └── deadline hit  ──▶ TimedOut  (no finalize)
//! ```
//!
//! While `Sampling`, the probe is read every `interval` and each value is
//! published and filtered like a periodic reading.  The operator watches
//! the readings settle and answers with `done`.  At most one session runs
//! at a time; both terminal states release it.

use std::time::{Duration, Instant};

use log::{info, warn};

use crate::error::CalibrationError;

use super::commands::Sensor;
use super::events::{AppEvent, CalibrationPhase, Diagnostic};
use super::ports::{EventSink, SensorPort};
use super::reporter::{ProbeFilters, sample_probe};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    Sampling,
    Finished,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationSession {
    pub sensor: Sensor,
    pub interval: Duration,
    pub started_at: Instant,
    pub deadline: Instant,
    next_sample: Instant,
    done_requested: bool,
    pub state: CalibrationState,
}

impl CalibrationSession {
    pub fn done_requested(&self) -> bool {
        self.done_requested
    }
}

pub struct CalibrationSequencer {
    timeout: Duration,
    session: Option<CalibrationSession>,
    last: Option<CalibrationSession>,
}

impl CalibrationSequencer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            session: None,
            last: None,
        }
    }

    /// Open a session.  Rejected without side effects if one is running.
    pub fn begin(
        &mut self,
        now: Instant,
        sensor: Sensor,
        interval: Duration,
        sink: &mut impl EventSink,
    ) -> Result<(), CalibrationError> {
        if let Some(running) = &self.session {
            return Err(if running.sensor == sensor {
                CalibrationError::AlreadyRunning(sensor)
            } else {
                CalibrationError::Busy {
                    running: running.sensor,
                }
            });
        }
        self.session = Some(CalibrationSession {
            sensor,
            interval,
            started_at: now,
            deadline: now + self.timeout,
            next_sample: now,
            done_requested: false,
            state: CalibrationState::Sampling,
        });
        info!(
            "calibration of {} started (every {:?}, timeout {:?})",
            sensor.label(),
            interval,
            self.timeout
        );
        sink.emit(&AppEvent::Calibration {
            sensor,
            phase: CalibrationPhase::Start,
        });
        Ok(())
    }

    /// Latch the operator's `done` for the running session.
    pub fn request_done(&mut self, sensor: Sensor) -> Result<(), CalibrationError> {
        match &mut self.session {
            Some(s) if s.sensor == sensor => {
                s.done_requested = true;
                Ok(())
            }
            _ => Err(CalibrationError::NotRunning(sensor)),
        }
    }

    /// Advance the session, if any.  Returns the terminal state reached
    /// on this tick.
    pub fn tick(
        &mut self,
        now: Instant,
        probes: &mut impl SensorPort,
        filters: &mut ProbeFilters,
        sink: &mut impl EventSink,
    ) -> Option<CalibrationState> {
        let session = self.session.as_mut()?;
        let sensor = session.sensor;

        if now >= session.next_sample {
            session.next_sample = now + session.interval;
            sample_probe(sensor, probes, filters, sink);
        }

        let outcome = if session.done_requested {
            if let Err(error) = probes.send_command(sensor, sensor.finalize_command()) {
                warn!("{} finalize failed: {}", sensor.label(), error);
                sink.emit(&AppEvent::Diagnostic(Diagnostic::Sensor { sensor, error }));
            }
            info!("calibration of {} finished", sensor.label());
            sink.emit(&AppEvent::Calibration {
                sensor,
                phase: CalibrationPhase::End,
            });
            CalibrationState::Finished
        } else if now >= session.deadline {
            warn!("calibration of {} timed out", sensor.label());
            sink.emit(&AppEvent::Calibration {
                sensor,
                phase: CalibrationPhase::Timeout,
            });
            CalibrationState::TimedOut
        } else {
            return None;
        };

        session.state = outcome;
        self.last = self.session.take();
        Some(outcome)
    }

    pub fn session(&self) -> Option<&CalibrationSession> {
        self.session.as_ref()
    }

    /// The most recently terminated session, in its terminal state.
    pub fn last_session(&self) -> Option<&CalibrationSession> {
        self.last.as_ref()
    }

    /// Probe owned by the running session.
    pub fn active_sensor(&self) -> Option<Sensor> {
        self.session.map(|s| s.sensor)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SensorError;

    #[derive(Default)]
    struct Probes {
        reads: usize,
        commands: Vec<(Sensor, String)>,
    }

    impl SensorPort for Probes {
        fn read(&mut self, _: Sensor) -> Result<f32, SensorError> {
            self.reads += 1;
            Ok(7.0)
        }
        fn send_command(&mut self, sensor: Sensor, command: &str) -> Result<(), SensorError> {
            self.commands.push((sensor, command.to_owned()));
            Ok(())
        }
        fn read_temperature(&mut self) -> Result<f32, SensorError> {
            Err(SensorError::NotPresent)
        }
    }

    #[derive(Default)]
    struct Recorder(Vec<AppEvent>);

    impl EventSink for Recorder {
        fn emit(&mut self, event: &AppEvent) {
            self.0.push(event.clone());
        }
    }

    impl Recorder {
        fn phases(&self) -> Vec<CalibrationPhase> {
            self.0
                .iter()
                .filter_map(|e| match e {
                    AppEvent::Calibration { phase, .. } => Some(*phase),
                    _ => None,
                })
                .collect()
        }
    }

    fn setup() -> (CalibrationSequencer, Probes, ProbeFilters, Recorder) {
        (
            CalibrationSequencer::new(Duration::from_secs(300)),
            Probes::default(),
            ProbeFilters::new(5, 5).unwrap(),
            Recorder::default(),
        )
    }

    #[test]
    fn samples_on_interval() {
        let (mut cal, mut probes, mut filters, mut rec) = setup();
        let t0 = Instant::now();
        cal.begin(t0, Sensor::Ph, Duration::from_secs(10), &mut rec).unwrap();

        cal.tick(t0, &mut probes, &mut filters, &mut rec);
        cal.tick(t0 + Duration::from_secs(5), &mut probes, &mut filters, &mut rec);
        cal.tick(t0 + Duration::from_secs(10), &mut probes, &mut filters, &mut rec);
        assert_eq!(probes.reads, 2);
        assert_eq!(filters.window(Sensor::Ph).len(), 2);
    }

    #[test]
    fn done_sends_finalize_and_releases() {
        let (mut cal, mut probes, mut filters, mut rec) = setup();
        let t0 = Instant::now();
        cal.begin(t0, Sensor::Orp, Duration::from_secs(10), &mut rec).unwrap();
        cal.tick(t0, &mut probes, &mut filters, &mut rec);
        cal.request_done(Sensor::Orp).unwrap();

        let outcome = cal.tick(t0 + Duration::from_secs(1), &mut probes, &mut filters, &mut rec);
        assert_eq!(outcome, Some(CalibrationState::Finished));
        assert_eq!(probes.commands, [(Sensor::Orp, "cal,225".to_owned())]);
        assert!(cal.session().is_none());
        assert_eq!(cal.last_session().unwrap().state, CalibrationState::Finished);
        assert_eq!(rec.phases(), [CalibrationPhase::Start, CalibrationPhase::End]);
    }

    #[test]
    fn timeout_fires_once_without_finalize() {
        let (mut cal, mut probes, mut filters, mut rec) = setup();
        let t0 = Instant::now();
        cal.begin(t0, Sensor::Ph, Duration::from_secs(30), &mut rec).unwrap();

        assert_eq!(cal.tick(t0 + Duration::from_secs(299), &mut probes, &mut filters, &mut rec), None);
        assert_eq!(
            cal.tick(t0 + Duration::from_secs(300), &mut probes, &mut filters, &mut rec),
            Some(CalibrationState::TimedOut)
        );
        assert_eq!(cal.tick(t0 + Duration::from_secs(400), &mut probes, &mut filters, &mut rec), None);

        assert!(probes.commands.is_empty());
        assert_eq!(rec.phases(), [CalibrationPhase::Start, CalibrationPhase::Timeout]);
    }

    #[test]
    fn second_session_is_rejected() {
        let (mut cal, _, _, mut rec) = setup();
        let t0 = Instant::now();
        cal.begin(t0, Sensor::Ph, Duration::from_secs(10), &mut rec).unwrap();
        let before = *cal.session().unwrap();

        assert_eq!(
            cal.begin(t0, Sensor::Ph, Duration::from_secs(1), &mut rec),
            Err(CalibrationError::AlreadyRunning(Sensor::Ph))
        );
        assert_eq!(
            cal.begin(t0, Sensor::Orp, Duration::from_secs(1), &mut rec),
            Err(CalibrationError::Busy { running: Sensor::Ph })
        );
        assert_eq!(*cal.session().unwrap(), before);
        assert_eq!(rec.phases(), [CalibrationPhase::Start]);
    }

    #[test]
    fn done_without_session_is_rejected() {
        let (mut cal, _, _, mut rec) = setup();
        assert_eq!(cal.request_done(Sensor::Ph), Err(CalibrationError::NotRunning(Sensor::Ph)));
        cal.begin(Instant::now(), Sensor::Ph, Duration::from_secs(1), &mut rec).unwrap();
        assert_eq!(cal.request_done(Sensor::Orp), Err(CalibrationError::NotRunning(Sensor::Orp)));
    }
}
