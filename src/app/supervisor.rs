//! Actuation supervisor — at most one running actuation, system-wide.
//!
//! ```text
//!            pop Water/On, engage
//!   ┌──────┐ ────────────────────▶ ┌────────┐
//!   │ Idle │                       │ Active │
//!   └──────┘ ◀──────────────────── └────────┘
//!            time-up | stop: all outputs off
//! ```
//!
//! No preemption and no overlap: commands arriving while Active wait in
//! the queue.  Both exits from Active drive *every* output off before the
//! [`RunningActuation`] is dropped.  The queue is only popped while Idle,
//! one element per tick.

use std::time::{Duration, Instant};

use log::{info, warn};

use crate::error::QueueError;

use super::actuator::ActuatorBank;
use super::commands::{ActuatorId, Command, CommandKind};
use super::events::{AppEvent, EndReason};
use super::ports::{ActuatorPort, EventSink};
use super::queue::CommandQueue;

/// The one actuation currently driving an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunningActuation {
    pub actuator: ActuatorId,
    pub started_at: Instant,
    pub duration: Duration,
}

impl RunningActuation {
    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started_at) >= self.duration
    }

    #[cfg(test)]
    pub fn remaining(&self, now: Instant) -> Duration {
        self.duration
            .saturating_sub(now.saturating_duration_since(self.started_at))
    }
}

pub struct ActuationSupervisor {
    bank: ActuatorBank,
    queue: CommandQueue,
    running: Option<RunningActuation>,
    stop_requested: bool,
}

impl ActuationSupervisor {
    pub fn new(bank: ActuatorBank) -> Self {
        Self {
            bank,
            queue: CommandQueue::new(),
            running: None,
            stop_requested: false,
        }
    }

    // ── Intake ────────────────────────────────────────────────

    /// Queue an actuation command behind whatever is running.
    pub fn enqueue(&mut self, cmd: Command) -> Result<(), QueueError> {
        self.queue.enqueue(cmd)
    }

    /// Latch a stop; honoured at the start of the next tick.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    // ── Per-tick ──────────────────────────────────────────────

    /// Boot safety: drive every output off before the first tick.
    pub fn release_all(&mut self, out: &mut impl ActuatorPort) {
        self.bank.disengage_all(out);
    }

    /// Advance the state machine by one tick.
    pub fn tick(&mut self, now: Instant, out: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        if self.stop_requested {
            self.stop_requested = false;
            self.stop(out, sink);
            return;
        }

        if let Some(run) = self.running {
            if run.is_due(now) {
                self.finish(run, EndReason::TimeUp, out, sink);
            }
            return;
        }

        if let Ok(cmd) = self.queue.pop_front() {
            self.dispatch(now, &cmd, out, sink);
        }
    }

    fn stop(&mut self, out: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        let dropped = self.queue.len();
        self.queue.clear();
        match self.running {
            Some(run) => self.finish(run, EndReason::Stopped, out, sink),
            None => {
                self.bank.disengage_all(out);
                sink.emit(&AppEvent::Snapshot(self.bank.snapshot()));
            }
        }
        info!("stop: all outputs off, {} queued command(s) dropped", dropped);
    }

    fn finish(
        &mut self,
        run: RunningActuation,
        reason: EndReason,
        out: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        self.bank.disengage_all(out);
        self.running = None;
        info!("actuator {} off ({:?})", run.actuator, reason);
        sink.emit(&AppEvent::ActuationEnded {
            actuator: run.actuator,
            label: self.bank.label_of(run.actuator),
            reason,
        });
        sink.emit(&AppEvent::Snapshot(self.bank.snapshot()));
    }

    fn dispatch(
        &mut self,
        now: Instant,
        cmd: &Command,
        out: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        match cmd.kind {
            CommandKind::Water { zone: actuator, duration } | CommandKind::On { actuator, duration } => {
                if let Err(fault) = self.bank.engage(actuator, out) {
                    warn!("'{}' rejected: {}", cmd.raw, fault);
                    sink.emit(&fault.into());
                    return;
                }
                self.running = Some(RunningActuation {
                    actuator,
                    started_at: now,
                    duration,
                });
                info!("actuator {} on for {:?} ('{}')", actuator, duration, cmd.raw);
                sink.emit(&AppEvent::ActuationStarted {
                    actuator,
                    label: self.bank.label_of(actuator),
                    duration,
                });
                sink.emit(&AppEvent::Snapshot(self.bank.snapshot()));
            }
            CommandKind::Off { actuator } => {
                if let Err(fault) = self.bank.disengage(actuator, out) {
                    warn!("'{}' rejected: {}", cmd.raw, fault);
                    sink.emit(&fault.into());
                    return;
                }
                sink.emit(&AppEvent::ActuatorReleased {
                    actuator,
                    label: self.bank.label_of(actuator),
                });
                sink.emit(&AppEvent::Snapshot(self.bank.snapshot()));
            }
            CommandKind::Calibrate { .. }
            | CommandKind::Done { .. }
            | CommandKind::Stop
            | CommandKind::Status => {
                warn!("'{}' is not an actuation command; ignored", cmd.raw);
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn is_active(&self) -> bool {
        self.running.is_some()
    }

    pub fn running(&self) -> Option<&RunningActuation> {
        self.running.as_ref()
    }

    pub fn bank(&self) -> &ActuatorBank {
        &self.bank
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
}
