//! Device lifecycle: delayed restart.

use std::time::Duration;

use log::warn;

/// Pause, then reboot the SoC.  Never returns on the device.
#[cfg(target_os = "espidf")]
pub fn restart_after(delay: Duration) -> ! {
    warn!("restarting in {:?}", delay);
    std::thread::sleep(delay);
    // SAFETY: esp_restart has no preconditions; it does not return.
    unsafe { esp_idf_svc::sys::esp_restart() }
}

/// Host builds have nothing to reboot; the process exits instead.
#[cfg(not(target_os = "espidf"))]
pub fn restart_after(delay: Duration) -> ! {
    warn!("restart requested after {:?} (sim: exiting)", delay);
    std::thread::sleep(delay);
    std::process::exit(1)
}
