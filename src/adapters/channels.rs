//! Inbound message channel.
//!
//! Uses an `embassy-sync` bounded channel to bridge the MQTT receive
//! thread with the synchronous control loop, without heap allocation.
//!
//! ```text
//! ┌──────────────┐  InboundPayload  ┌──────────────┐
//! │  mqtt-rx     │─────────────────▶│ Control Loop │
//! │  (thread)    │                  │ (main task)  │
//! └──────────────┘                  └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::ports::InboundPayload;

/// Messages buffered between two control ticks.
pub const INBOUND_DEPTH: usize = 8;

/// Receive thread → control loop.
pub static INBOUND: Channel<CriticalSectionRawMutex, InboundPayload, INBOUND_DEPTH> = Channel::new();

/// Queue one received payload.  Oversized or overflowing messages are
/// dropped with a warning; the receive thread never blocks.
pub fn deliver(data: &[u8]) -> bool {
    let Ok(payload) = InboundPayload::from_slice(data) else {
        warn!("dropping oversized inbound message ({} bytes)", data.len());
        return false;
    };
    if INBOUND.try_send(payload).is_err() {
        warn!("inbound channel full; message dropped");
        return false;
    }
    true
}

/// Next queued payload, if any.
pub fn take() -> Option<InboundPayload> {
    INBOUND.try_receive().ok()
}

/// Discard anything still queued (used when a session is replaced).
pub fn drain() -> usize {
    let mut n = 0;
    while INBOUND.try_receive().is_ok() {
        n += 1;
    }
    n
}
