//! Controller — the hexagonal core.
//!
//! [`Controller`] is the whole mutable state of the device: the actuation
//! supervisor (actuators + queue), the calibration sequencer, the probe
//! filters, the periodic reporter, the connectivity monitor and the
//! outbox.  It is owned by the main loop and advanced by [`Controller::tick`];
//! there are no globals.  All I/O flows through port traits injected at
//! call sites, so the whole controller runs against mock adapters.
//!
//! ```text
//!  TransportPort ──▶ handle_message ──▶ ┌─────────────────────────┐
//!                                       │       Controller        │ ──▶ Outbox ──▶ TransportPort
//!  SensorPort ──────────────────────▶   │ Supervisor · Calibration│
//!  ActuatorPort ◀────────────────────── │ Reporter · Connectivity │
//!                                       └─────────────────────────┘
//! ```

use std::time::Instant;

use log::{info, warn};

use crate::config::{ControllerConfig, Variant};
use crate::error::{Error, ParseError, TransportError};

use super::actuator::ActuatorBank;
use super::calibration::CalibrationSequencer;
use super::commands::{Command, CommandKind};
use super::connectivity::{ConnectivityMonitor, LinkStatus};
use super::events::AppEvent;
use super::parser::CommandParser;
use super::ports::{ActuatorPort, EventSink, LinkPort, SensorPort, TransportPort};
use super::report::{Outbox, Topics};
use super::reporter::{ProbeFilters, SensorReporter};
use super::supervisor::ActuationSupervisor;

/// Inbound messages handled per [`Controller::poll`].
pub const MAX_MESSAGES_PER_CYCLE: usize = 8;

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

pub struct Controller {
    variant: Variant,
    parser: CommandParser,
    supervisor: ActuationSupervisor,
    calibration: CalibrationSequencer,
    filters: ProbeFilters,
    /// Only dosing controllers carry chemistry probes.
    reporter: Option<SensorReporter>,
    monitor: ConnectivityMonitor,
    outbox: Outbox,
    topics: Topics,
    status_requested: bool,
}

impl Controller {
    /// Build the controller from a validated configuration.
    ///
    /// Does **not** touch hardware; call [`start`](Self::start) next.
    pub fn new(config: &ControllerConfig, now: Instant) -> Result<Self, Error> {
        let filters = ProbeFilters::new(config.ph_ma_window, config.orp_ma_window)?;
        let bank = ActuatorBank::from_layout(&config.actuator_layout());
        if bank.is_empty() {
            return Err(Error::Config("no actuators configured"));
        }
        let reporter = match config.variant {
            Variant::Dosing => Some(SensorReporter::new(
                now,
                config.startup_delay(),
                config.report_period(),
            )),
            Variant::Irrigation => None,
        };

        Ok(Self {
            variant: config.variant,
            parser: CommandParser::from_config(config),
            supervisor: ActuationSupervisor::new(bank),
            calibration: CalibrationSequencer::new(config.calibration_ceiling()),
            filters,
            reporter,
            monitor: ConnectivityMonitor::new(
                now,
                config.keepalive(),
                config.reconnect_backoff(),
                &config.topic_sub,
            ),
            outbox: Outbox::new(config.variant),
            topics: Topics::from_config(config),
            status_requested: false,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive every output off and announce `online`.
    pub fn start(&mut self, hw: &mut impl ActuatorPort) {
        hw.all_off();
        self.supervisor.release_all(hw);
        self.outbox.emit(&AppEvent::Online);
        info!(
            "controller started ({:?}, {} actuator(s))",
            self.variant,
            self.supervisor.bank().len()
        );
    }

    /// Connect to the broker and subscribe to the command topic.
    pub fn connect(&mut self, now: Instant, net: &mut impl TransportPort) -> Result<(), TransportError> {
        self.monitor.establish(now, net)
    }

    /// Fail-safe path before a restart: every output off, bank and pins.
    pub fn shutdown(&mut self, hw: &mut impl ActuatorPort) {
        self.supervisor.release_all(hw);
        hw.all_off();
        warn!("controller shut down; all outputs off");
    }

    // ── Message intake ────────────────────────────────────────

    /// Parse one inbound message and route it.
    ///
    /// `stop` and `status` are latched for the next tick, calibration
    /// commands go to the sequencer, actuation commands to the queue.
    /// Nothing here touches hardware.
    pub fn handle_message(&mut self, now: Instant, payload: &[u8]) {
        let text = core::str::from_utf8(payload).map_err(|_| ParseError::Empty);
        let cmd = match text.and_then(|t| self.parser.parse(t)) {
            Ok(cmd) => cmd,
            Err(e) => {
                warn!("ignoring {:?}: {}", String::from_utf8_lossy(payload), e);
                self.outbox.emit(&AppEvent::UnknownCommand);
                return;
            }
        };
        self.dispatch(now, cmd);
    }

    fn dispatch(&mut self, now: Instant, cmd: Command) {
        info!("command '{}'", cmd.raw);
        match cmd.kind {
            CommandKind::Stop => self.supervisor.request_stop(),
            CommandKind::Status => self.status_requested = true,
            CommandKind::Calibrate { sensor, interval } => {
                if let Err(e) = self.calibration.begin(now, sensor, interval, &mut self.outbox) {
                    warn!("'{}' rejected: {}", cmd.raw, e);
                    self.outbox.emit(&e.into());
                }
            }
            CommandKind::Done { sensor } => {
                if let Err(e) = self.calibration.request_done(sensor) {
                    warn!("'{}' rejected: {}", cmd.raw, e);
                    self.outbox.emit(&e.into());
                }
            }
            CommandKind::Water { .. } | CommandKind::On { .. } | CommandKind::Off { .. } => {
                let raw = cmd.raw.clone();
                if let Err(e) = self.supervisor.enqueue(cmd) {
                    warn!("'{}' dropped: {}", raw, e);
                    self.outbox.emit(&e.into());
                }
            }
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// One pass of the main loop: drain inbound messages, then
    /// [`tick`](Self::tick).
    ///
    /// At most [`MAX_MESSAGES_PER_CYCLE`] messages are taken per pass so a
    /// flood on the command topic cannot starve the actuation timers.
    pub fn poll(
        &mut self,
        now: Instant,
        hw: &mut (impl ActuatorPort + SensorPort),
        net: &mut (impl TransportPort + LinkPort),
    ) -> Result<(), TransportError> {
        for _ in 0..MAX_MESSAGES_PER_CYCLE {
            let Some(payload) = net.check_message() else {
                break;
            };
            self.handle_message(now, &payload);
        }
        self.tick(now, hw, net)
    }

    /// Run one cooperative control cycle:
    /// status → actuation → calibration → periodic report → connectivity
    /// → flush reports.
    ///
    /// `hw` satisfies **both** [`SensorPort`] and [`ActuatorPort`] and
    /// `net` both [`TransportPort`] and [`LinkPort`], which keeps the port
    /// boundary explicit without double mutable borrows.
    ///
    /// Only transport failures escape; the caller answers them with a
    /// delayed restart.
    pub fn tick(
        &mut self,
        now: Instant,
        hw: &mut (impl ActuatorPort + SensorPort),
        net: &mut (impl TransportPort + LinkPort),
    ) -> Result<(), TransportError> {
        // 1. Out-of-band status
        if core::mem::take(&mut self.status_requested) {
            self.report_status(hw, net);
        }

        // 2. Actuation
        self.supervisor.tick(now, hw, &mut self.outbox);

        // 3. Calibration
        self.calibration.tick(now, hw, &mut self.filters, &mut self.outbox);

        // 4. Periodic probe report
        if let Some(reporter) = &mut self.reporter {
            reporter.tick(
                now,
                self.calibration.active_sensor(),
                hw,
                &mut self.filters,
                &mut self.outbox,
            );
        }

        // 5. Keepalive / reconnect
        let status = self.monitor.tick(now, net)?;
        if status == LinkStatus::Reconnected {
            info!("{} report(s) waiting to be flushed", self.outbox.len());
        }

        // 6. Publish
        if net.is_connected() {
            self.outbox.flush(net, &self.topics)?;
        }
        Ok(())
    }

    fn report_status(&mut self, hw: &mut impl SensorPort, net: &mut impl LinkPort) {
        match self.variant {
            Variant::Dosing => {
                self.outbox.emit(&AppEvent::Rssi(net.rssi()));
                match hw.read_temperature() {
                    Ok(celsius) => self.outbox.emit(&AppEvent::Temperature(celsius)),
                    Err(e) => {
                        warn!("temperature read failed: {}", e);
                        self.outbox.emit(&AppEvent::TemperatureError(e));
                    }
                }
            }
            Variant::Irrigation => {
                self.outbox
                    .emit(&AppEvent::Snapshot(self.supervisor.bank().snapshot()));
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn supervisor(&self) -> &ActuationSupervisor {
        &self.supervisor
    }

    pub fn calibration(&self) -> &CalibrationSequencer {
        &self.calibration
    }

    pub fn filters(&self) -> &ProbeFilters {
        &self.filters
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn outages(&self) -> u32 {
        self.monitor.outages()
    }
}
