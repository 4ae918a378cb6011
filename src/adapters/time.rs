//! Monotonic clock adapter.
//!
//! Implements [`ClockPort`] for the control loop.  `std::time::Instant` is
//! backed by the ESP-IDF high-resolution timer on the device, so the same
//! code serves both targets; the loop's sleep yields to FreeRTOS there.

use std::time::{Duration, Instant};

use crate::app::ports::ClockPort;

/// Wall-time clock for the running controller.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
