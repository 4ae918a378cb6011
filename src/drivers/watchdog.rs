//! Task Watchdog Timer (TWDT) driver.
//!
//! Wraps the ESP-IDF TWDT API to reset the device if the control loop
//! stalls for longer than the configured timeout.  A probe transaction is
//! bounded well below it, so only a genuine hang trips the watchdog.
//!
//! The control loop must call `feed()` on every tick.

use core::time::Duration;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

pub struct Watchdog {
    timeout: Duration,
    #[cfg(target_os = "espidf")]
    subscribed: bool,
    #[cfg(not(target_os = "espidf"))]
    feeds: u64,
}

impl Watchdog {
    /// Initialise and subscribe the current task to the TWDT.
    pub fn new(timeout: Duration) -> Self {
        #[cfg(target_os = "espidf")]
        {
            let timeout_ms = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
            // SAFETY: plain FFI calls on the current task; the config lives
            // for the duration of the call.
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK as i32 {
                    log::warn!(
                        "TWDT reconfigure returned {} (may already be configured)",
                        ret
                    );
                }

                let ret = esp_task_wdt_add(core::ptr::null_mut());
                let subscribed = ret == ESP_OK as i32;
                if subscribed {
                    info!("Watchdog: subscribed ({:?} timeout, panic on trigger)", timeout);
                } else {
                    log::warn!("Watchdog: failed to subscribe ({})", ret);
                }

                Self { timeout, subscribed }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("Watchdog(sim): {:?} timeout, not enforced", timeout);
            Self { timeout, feeds: 0 }
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Feed the watchdog. Must be called at least once per timeout.
    #[cfg(target_os = "espidf")]
    pub fn feed(&mut self) {
        if self.subscribed {
            // SAFETY: resets the TWDT entry of the subscribed current task.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn feed(&mut self) {
        self.feeds += 1;
    }

    /// Feeds seen so far (sim only).
    #[cfg(not(target_os = "espidf"))]
    pub fn feeds(&self) -> u64 {
        self.feeds
    }
}
