//! Network adapter: the broker session together with the link beneath it.
//!
//! [`Controller::tick`](crate::app::service::Controller::tick) needs one
//! value that is both a [`TransportPort`] and a [`LinkPort`]; this pairs
//! the MQTT client with the WiFi station.

use crate::app::ports::{InboundPayload, LinkPort, TransportPort};
use crate::error::TransportError;

pub struct Network<T, L> {
    transport: T,
    link: L,
}

impl<T: TransportPort, L: LinkPort> Network<T, L> {
    pub fn new(transport: T, link: L) -> Self {
        Self { transport, link }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}

impl<T: TransportPort, L> TransportPort for Network<T, L> {
    fn connect(&mut self) -> Result<(), TransportError> {
        self.transport.connect()
    }

    fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    fn session_generation(&self) -> u32 {
        self.transport.session_generation()
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        self.transport.subscribe(topic)
    }

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), TransportError> {
        self.transport.publish(topic, payload)
    }

    fn check_message(&mut self) -> Option<InboundPayload> {
        self.transport.check_message()
    }

    fn reconnect(&mut self) -> Result<(), TransportError> {
        self.transport.reconnect()
    }

    fn ping(&mut self) -> Result<(), TransportError> {
        self.transport.ping()
    }
}

impl<T, L: LinkPort> LinkPort for Network<T, L> {
    fn is_link_up(&self) -> bool {
        self.link.is_link_up()
    }

    fn rssi(&mut self) -> Option<i32> {
        self.link.rssi()
    }
}
