//! Mock hardware adapter for integration tests.
//!
//! Records every output write so tests can assert on the full actuation
//! history without touching real GPIO, and serves scripted probe values.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use aquactl::adapters::mqtt::{MqttSettings, MqttTransport};
use aquactl::adapters::network::Network;
use aquactl::adapters::wifi::WifiLink;
use aquactl::app::commands::{ActuatorId, Sensor};
use aquactl::app::ports::{ActuatorPort, SensorPort};
use aquactl::app::service::Controller;
use aquactl::config::ControllerConfig;
use aquactl::error::{SensorError, TransportError};

// ── Output call record ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum OutputCall {
    Set { id: u8, on: bool },
    AllOff,
}

// ── MockHardware ──────────────────────────────────────────────

#[derive(Default)]
pub struct MockHardware {
    pub calls: Vec<OutputCall>,
    levels: HashMap<u8, bool>,
    ph: VecDeque<Result<f32, SensorError>>,
    orp: VecDeque<Result<f32, SensorError>>,
    pub temperature: Option<f32>,
    pub probe_commands: Vec<(Sensor, String)>,
    pub reads: Vec<Sensor>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue probe answers; once exhausted, reads time out.
    pub fn script(&mut self, sensor: Sensor, values: &[Result<f32, SensorError>]) {
        let queue = match sensor {
            Sensor::Ph => &mut self.ph,
            Sensor::Orp => &mut self.orp,
        };
        queue.extend(values.iter().copied());
    }

    pub fn is_on(&self, id: u8) -> bool {
        self.levels.get(&id).copied().unwrap_or(false)
    }

    /// Ids currently driven high.
    pub fn high(&self) -> Vec<u8> {
        let mut ids: Vec<u8> = self
            .levels
            .iter()
            .filter_map(|(id, on)| on.then_some(*id))
            .collect();
        ids.sort_unstable();
        ids
    }
}

impl ActuatorPort for MockHardware {
    fn set_output(&mut self, id: ActuatorId, on: bool) {
        self.calls.push(OutputCall::Set { id: id.0, on });
        self.levels.insert(id.0, on);
    }

    fn all_off(&mut self) {
        self.calls.push(OutputCall::AllOff);
        for level in self.levels.values_mut() {
            *level = false;
        }
    }
}

impl SensorPort for MockHardware {
    fn read(&mut self, sensor: Sensor) -> Result<f32, SensorError> {
        self.reads.push(sensor);
        let queue = match sensor {
            Sensor::Ph => &mut self.ph,
            Sensor::Orp => &mut self.orp,
        };
        queue.pop_front().unwrap_or(Err(SensorError::Timeout))
    }

    fn send_command(&mut self, sensor: Sensor, command: &str) -> Result<(), SensorError> {
        self.probe_commands.push((sensor, command.to_owned()));
        Ok(())
    }

    fn read_temperature(&mut self) -> Result<f32, SensorError> {
        self.temperature.ok_or(SensorError::NotPresent)
    }
}

// ── Simulated network ─────────────────────────────────────────

pub type SimNet = Network<MqttTransport, WifiLink>;

pub fn sim_net(config: &ControllerConfig) -> SimNet {
    Network::new(
        MqttTransport::new(MqttSettings::from_config(config)),
        WifiLink::connect("poolhouse", "hunter2hunter2").unwrap(),
    )
}

/// Payloads published on `topic`, in order.
#[allow(dead_code)]
pub fn published_on(net: &SimNet, topic: &str) -> Vec<String> {
    net.transport()
        .published()
        .iter()
        .filter(|(t, _)| t == topic)
        .map(|(_, p)| p.clone())
        .collect()
}

// ── Test rig ──────────────────────────────────────────────────

/// A booted controller wired to mock hardware and the simulated network.
pub struct Rig {
    pub controller: Controller,
    pub hw: MockHardware,
    pub net: SimNet,
    pub t0: Instant,
}

#[allow(dead_code)]
impl Rig {
    pub fn boot(config: &ControllerConfig) -> Self {
        let t0 = Instant::now();
        let mut controller = Controller::new(config, t0).unwrap();
        let mut hw = MockHardware::new();
        let mut net = sim_net(config);
        controller.start(&mut hw);
        controller.connect(t0, &mut net).unwrap();
        Self {
            controller,
            hw,
            net,
            t0,
        }
    }

    /// Deliver a message on the command topic.
    pub fn send(&mut self, message: &str) {
        self.net.transport_mut().inject(message.as_bytes());
    }

    /// Run one loop pass `secs` after boot.
    pub fn at(&mut self, secs: u64) -> Result<(), TransportError> {
        self.at_ms(secs * 1000)
    }

    pub fn at_ms(&mut self, ms: u64) -> Result<(), TransportError> {
        let now = self.t0 + Duration::from_millis(ms);
        self.controller.poll(now, &mut self.hw, &mut self.net)
    }

    pub fn published(&self, topic: &str) -> Vec<String> {
        published_on(&self.net, topic)
    }

    pub fn responses(&self) -> Vec<String> {
        self.published("pool/resp")
    }
}
