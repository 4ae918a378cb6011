//! MQTT client adapter.
//!
//! Implements [`TransportPort`] on top of the ESP-IDF MQTT client.  The
//! connection's event stream is pumped by a dedicated `mqtt-rx` thread that
//! tracks the session state and forwards complete messages into the static
//! [`INBOUND`](super::channels::INBOUND) channel.  The control loop drains
//! that channel with [`TransportPort::check_message`].
//!
//! The `offline` last-will is registered on the command topic, so
//! dashboards see the controller drop even when it dies without warning.
//!
//! esp-mqtt reconnects by itself after a broker or WiFi outage.  Every
//! `Connected` event bumps the session generation, which is how the
//! connectivity monitor learns that the command topic needs resubscribing.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client`.
//! - **all other targets**: an in-memory broker for host-side tests, with
//!   helpers to inject messages and inspect publications.

use core::time::Duration;

use log::{info, warn};

use crate::app::ports::{InboundPayload, TransportPort};
use crate::config::ControllerConfig;
use crate::error::TransportError;

#[cfg(target_os = "espidf")]
use std::sync::Arc;
#[cfg(target_os = "espidf")]
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EspMqttConnection, EventPayload, LwtConfiguration,
    MqttClientConfiguration, QoS,
};

/// Payload published on the command topic when the session dies.
pub const LAST_WILL: &str = "offline";

/// How long [`TransportPort::connect`] waits for the broker's CONNACK.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Broker endpoint and session parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttSettings {
    pub url: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub will_topic: String,
    pub keepalive: Duration,
}

impl MqttSettings {
    pub fn from_config(config: &ControllerConfig) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_owned());
        Self {
            url: config.broker_url(),
            client_id: config.hostname.clone(),
            username: non_empty(&config.mqtt_username),
            password: non_empty(&config.mqtt_pw),
            will_topic: config.topic_sub.clone(),
            keepalive: config.keepalive(),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Transport
// ───────────────────────────────────────────────────────────────

pub struct MqttTransport {
    settings: MqttSettings,
    #[cfg(target_os = "espidf")]
    client: Option<EspMqttClient<'static>>,
    #[cfg(target_os = "espidf")]
    connected: Arc<AtomicBool>,
    #[cfg(target_os = "espidf")]
    generation: Arc<AtomicU32>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimBroker,
}

impl MqttTransport {
    pub fn new(settings: MqttSettings) -> Self {
        Self {
            settings,
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(target_os = "espidf")]
            connected: Arc::new(AtomicBool::new(false)),
            #[cfg(target_os = "espidf")]
            generation: Arc::new(AtomicU32::new(0)),
            #[cfg(not(target_os = "espidf"))]
            sim: SimBroker::default(),
        }
    }

    pub fn settings(&self) -> &MqttSettings {
        &self.settings
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn open_session(&mut self) -> Result<(), TransportError> {
        // Dropping the old client ends its receive thread.
        self.client = None;
        self.connected.store(false, Ordering::Release);
        let stale = super::channels::drain();
        if stale > 0 {
            warn!("MQTT: discarded {} message(s) from the previous session", stale);
        }

        let s = &self.settings;
        let conf = MqttClientConfiguration {
            client_id: Some(s.client_id.as_str()),
            username: s.username.as_deref(),
            password: s.password.as_deref(),
            keep_alive_interval: Some(s.keepalive),
            lwt: Some(LwtConfiguration {
                topic: &s.will_topic,
                payload: LAST_WILL.as_bytes(),
                qos: QoS::AtLeastOnce,
                retain: false,
            }),
            ..Default::default()
        };
        let (client, conn) = EspMqttClient::new(&s.url, &conf).map_err(|e| {
            warn!("MQTT: client creation failed: {e:?}");
            TransportError::ConnectFailed
        })?;
        spawn_receiver(conn, Arc::clone(&self.connected), Arc::clone(&self.generation))?;
        self.client = Some(client);

        let deadline = std::time::Instant::now() + CONNECT_TIMEOUT;
        while !self.connected.load(Ordering::Acquire) {
            if std::time::Instant::now() >= deadline {
                warn!("MQTT: no CONNACK from {} within {:?}", s.url, CONNECT_TIMEOUT);
                return Err(TransportError::ConnectFailed);
            }
            std::thread::sleep(Duration::from_millis(100));
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn open_session(&mut self) -> Result<(), TransportError> {
        if self.sim.refuse_connect {
            warn!("MQTT(sim): connection refused");
            return Err(TransportError::ConnectFailed);
        }
        self.sim.begin_session();
        Ok(())
    }
}

impl TransportPort for MqttTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        info!(
            "MQTT: connecting to {} as '{}'",
            self.settings.url, self.settings.client_id
        );
        self.open_session()?;
        info!("MQTT: connected");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn is_connected(&self) -> bool {
        self.client.is_some() && self.connected.load(Ordering::Acquire)
    }

    #[cfg(not(target_os = "espidf"))]
    fn is_connected(&self) -> bool {
        self.sim.connected
    }

    #[cfg(target_os = "espidf")]
    fn session_generation(&self) -> u32 {
        self.generation.load(Ordering::Acquire)
    }

    #[cfg(not(target_os = "espidf"))]
    fn session_generation(&self) -> u32 {
        self.sim.sessions
    }

    #[cfg(target_os = "espidf")]
    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        let client = self.client.as_mut().ok_or(TransportError::NotConnected)?;
        client.subscribe(topic, QoS::AtMostOnce).map_err(|e| {
            warn!("MQTT: subscribe '{topic}' failed: {e:?}");
            TransportError::SubscribeFailed
        })?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        if !self.sim.connected {
            return Err(TransportError::NotConnected);
        }
        self.sim.subscriptions.push(topic.to_owned());
        self.sim.subscribed = true;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), TransportError> {
        let client = self.client.as_mut().ok_or(TransportError::NotConnected)?;
        client
            .publish(topic, QoS::AtMostOnce, false, payload.as_bytes())
            .map_err(|e| {
                warn!("MQTT: publish to '{topic}' failed: {e:?}");
                TransportError::PublishFailed
            })?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), TransportError> {
        if !self.sim.connected {
            return Err(TransportError::NotConnected);
        }
        if self.sim.fail_publish {
            return Err(TransportError::PublishFailed);
        }
        self.sim.published.push((topic.to_owned(), payload.to_owned()));
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn check_message(&mut self) -> Option<InboundPayload> {
        super::channels::take()
    }

    #[cfg(not(target_os = "espidf"))]
    fn check_message(&mut self) -> Option<InboundPayload> {
        self.sim.inbound.pop_front()
    }

    fn reconnect(&mut self) -> Result<(), TransportError> {
        info!("MQTT: re-establishing session");
        self.open_session()
    }

    /// The ESP-IDF client sends PINGREQ on its own `keep_alive_interval`;
    /// this only confirms the session is still up.
    fn ping(&mut self) -> Result<(), TransportError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(TransportError::PingFailed)
        }
    }
}

#[cfg(target_os = "espidf")]
fn spawn_receiver(
    mut conn: EspMqttConnection,
    connected: Arc<AtomicBool>,
    generation: Arc<AtomicU32>,
) -> Result<(), TransportError> {
    std::thread::Builder::new()
        .name("mqtt-rx".into())
        .stack_size(12 * 1024)
        .spawn(move || {
            loop {
                match conn.next() {
                    Ok(event) => match event.payload() {
                        EventPayload::Connected(_) => {
                            let n = generation.fetch_add(1, Ordering::AcqRel) + 1;
                            connected.store(true, Ordering::Release);
                            info!("MQTT: session {n} up");
                        }
                        EventPayload::Disconnected => {
                            connected.store(false, Ordering::Release);
                            warn!("MQTT: session down");
                        }
                        EventPayload::Received {
                            topic: Some(topic),
                            data,
                            details,
                            ..
                        } => {
                            if !matches!(details, Details::Complete) {
                                warn!("MQTT: ignoring fragmented message on '{topic}'");
                                continue;
                            }
                            super::channels::deliver(data);
                        }
                        _ => {}
                    },
                    Err(e) => {
                        connected.store(false, Ordering::Release);
                        info!("MQTT: receive loop ended ({e:?})");
                        break;
                    }
                }
            }
        })
        .map(|_| ())
        .map_err(|e| {
            warn!("MQTT: failed to spawn receive thread: {e}");
            TransportError::ConnectFailed
        })
}

// ───────────────────────────────────────────────────────────────
// Host simulation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
struct SimBroker {
    connected: bool,
    /// Cleared with every new session, as a clean-session broker does.
    subscribed: bool,
    refuse_connect: bool,
    fail_publish: bool,
    sessions: u32,
    inbound: std::collections::VecDeque<InboundPayload>,
    published: Vec<(String, String)>,
    subscriptions: Vec<String>,
}

#[cfg(not(target_os = "espidf"))]
impl SimBroker {
    fn begin_session(&mut self) {
        self.connected = true;
        self.subscribed = false;
        self.sessions += 1;
    }
}

#[cfg(not(target_os = "espidf"))]
impl MqttTransport {
    /// Queue a message as if the broker delivered it on the command topic.
    /// Without a live subscription the broker has nowhere to route it.
    pub fn inject(&mut self, payload: &[u8]) {
        if !(self.sim.connected && self.sim.subscribed) {
            warn!("MQTT(sim): no subscriber; message lost");
            return;
        }
        match InboundPayload::from_slice(payload) {
            Ok(p) => self.sim.inbound.push_back(p),
            Err(()) => warn!("MQTT(sim): dropping oversized message"),
        }
    }

    /// Everything published so far, as `(topic, payload)`.
    pub fn published(&self) -> &[(String, String)] {
        &self.sim.published
    }

    pub fn take_published(&mut self) -> Vec<(String, String)> {
        core::mem::take(&mut self.sim.published)
    }

    pub fn subscriptions(&self) -> &[String] {
        &self.sim.subscriptions
    }

    /// Sessions opened, counting the first connect.
    pub fn sessions(&self) -> u32 {
        self.sim.sessions
    }

    /// Simulate the broker closing the session.
    pub fn drop_session(&mut self) {
        self.sim.connected = false;
    }

    /// Simulate the client library re-establishing the session by itself,
    /// without a call to `reconnect`.
    pub fn restore_session(&mut self) {
        self.sim.begin_session();
    }

    pub fn set_refuse_connect(&mut self, refuse: bool) {
        self.sim.refuse_connect = refuse;
    }

    pub fn set_fail_publish(&mut self, fail: bool) {
        self.sim.fail_publish = fail;
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
