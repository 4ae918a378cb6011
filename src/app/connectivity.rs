//! Connectivity monitor: keepalive cadence and reconnect discipline.
//!
//! Reconnects are attempted only when the link layer reports up, and at
//! most once per `reconnect_interval`, so a dead WiFi never turns into a
//! busy loop.  A session the client library restored on its own is noticed
//! through the transport's session generation and resubscribed as well.
//! Any hard transport error is returned to the caller, which
//! restarts the device rather than retrying in place.
//!
//! Running actuations are not touched here.  They stay bounded by their
//! own timers on the local clock while the broker is unreachable.

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::error::TransportError;

use super::ports::{LinkPort, TransportPort};

/// Result of one monitor tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Connected; nothing to do.
    Connected,
    /// Connected and a keepalive probe went out.
    Pinged,
    /// The session was re-established and the command topic resubscribed.
    Reconnected,
    /// Disconnected; waiting for the reconnect backoff to expire.
    Backoff,
    /// Disconnected and the link layer is down; nothing attempted.
    LinkDown,
}

pub struct ConnectivityMonitor {
    keepalive: Duration,
    backoff: Duration,
    subscribe_topic: String,
    last_ping: Instant,
    last_attempt: Option<Instant>,
    connected: bool,
    /// Session generation the current subscription belongs to.
    generation: u32,
    outages: u32,
}

impl ConnectivityMonitor {
    pub fn new(now: Instant, keepalive: Duration, backoff: Duration, subscribe_topic: &str) -> Self {
        Self {
            keepalive,
            backoff,
            subscribe_topic: subscribe_topic.to_owned(),
            last_ping: now,
            last_attempt: None,
            connected: false,
            generation: 0,
            outages: 0,
        }
    }

    /// Initial connect and subscription at boot.
    pub fn establish(
        &mut self,
        now: Instant,
        transport: &mut impl TransportPort,
    ) -> Result<(), TransportError> {
        transport.connect()?;
        transport.subscribe(&self.subscribe_topic)?;
        self.connected = true;
        self.generation = transport.session_generation();
        self.last_ping = now;
        info!("connected; subscribed to '{}'", self.subscribe_topic);
        Ok(())
    }

    /// `net` is both the broker session and the link layer beneath it.
    pub fn tick(
        &mut self,
        now: Instant,
        net: &mut (impl TransportPort + LinkPort),
    ) -> Result<LinkStatus, TransportError> {
        if !net.is_connected() {
            if self.connected {
                self.connected = false;
                self.outages += 1;
                warn!("broker connection lost (outage #{})", self.outages);
            }
            if !net.is_link_up() {
                debug!("link down; reconnect deferred");
                return Ok(LinkStatus::LinkDown);
            }
            if let Some(at) = self.last_attempt {
                if now.saturating_duration_since(at) < self.backoff {
                    return Ok(LinkStatus::Backoff);
                }
            }
            self.last_attempt = Some(now);
            info!("link up; reconnecting to broker");
            net.reconnect()?;
            net.subscribe(&self.subscribe_topic)?;
            self.connected = true;
            self.generation = net.session_generation();
            self.last_ping = now;
            info!("reconnected after {} outage(s)", self.outages);
            return Ok(LinkStatus::Reconnected);
        }

        let generation = net.session_generation();
        if generation != self.generation {
            if self.connected {
                // The drop happened between two ticks.
                self.outages += 1;
            }
            info!(
                "session {} restored by the client; resubscribing to '{}'",
                generation, self.subscribe_topic
            );
            net.subscribe(&self.subscribe_topic)?;
            self.connected = true;
            self.generation = generation;
            self.last_ping = now;
            return Ok(LinkStatus::Reconnected);
        }

        self.connected = true;
        if now.saturating_duration_since(self.last_ping) > self.keepalive {
            net.ping()?;
            self.last_ping = now;
            return Ok(LinkStatus::Pinged);
        }
        Ok(LinkStatus::Connected)
    }

    /// Broker outages seen since boot.
    pub fn outages(&self) -> u32 {
        self.outages
    }

    pub fn last_ping(&self) -> Instant {
        self.last_ping
    }
}
