//! WiFi station-mode adapter.
//!
//! Implements [`LinkPort`]: the connectivity monitor asks it whether the
//! link is up before trying the broker again, and `status` reports its
//! signal strength.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::BlockingWifi` over `EspWifi`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! The ESP-IDF driver re-associates on its own after a drop; this adapter
//! only observes it.

use core::fmt;
use log::{info, warn};

use crate::app::ports::LinkPort;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    nvs::EspDefaultNvsPartition,
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
        }
    }
}

impl std::error::Error for ConnectivityError {}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() {
        return Err(ConnectivityError::NoCredentials);
    }
    if ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi link
// ───────────────────────────────────────────────────────────────

pub struct WifiLink {
    ssid: heapless::String<32>,
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim_link_up: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_rssi: Option<i32>,
}

impl WifiLink {
    /// Bring the station up and block until the netif has an address.
    #[cfg(target_os = "espidf")]
    pub fn connect(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        ssid: &str,
        password: &str,
    ) -> anyhow::Result<Self> {
        validate_ssid(ssid)?;
        validate_password(password)?;

        let esp_wifi = EspWifi::new(modem, sys_loop.clone(), Some(nvs))?;
        let mut wifi = BlockingWifi::wrap(esp_wifi, sys_loop)?;
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: password
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method: if password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPAWPA2Personal
            },
            ..Default::default()
        }))?;

        info!("WiFi: connecting to '{}'", ssid);
        wifi.start()?;
        wifi.connect()?;
        wifi.wait_netif_up()?;

        let ip = wifi.wifi().sta_netif().get_ip_info()?;
        info!("WiFi: connected, ip {}", ip.ip);

        Ok(Self {
            ssid: heapless::String::try_from(ssid).map_err(|_| ConnectivityError::InvalidSsid)?,
            wifi,
        })
    }

    /// Simulated station, associated from the start.
    #[cfg(not(target_os = "espidf"))]
    pub fn connect(ssid: &str, password: &str) -> Result<Self, ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        info!("WiFi(sim): connected to '{}'", ssid);
        Ok(Self {
            ssid: heapless::String::try_from(ssid).map_err(|_| ConnectivityError::InvalidSsid)?,
            sim_link_up: true,
            sim_rssi: Some(-60),
        })
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_is_up(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_up(&self) -> bool {
        self.sim_link_up
    }

    #[cfg(target_os = "espidf")]
    fn platform_rssi(&mut self) -> Option<i32> {
        let mut ap_info = esp_idf_svc::sys::wifi_ap_record_t::default();
        // SAFETY: `ap_info` is a valid, writable record for the duration of the call.
        let ret = unsafe { esp_idf_svc::sys::esp_wifi_sta_get_ap_info(&mut ap_info) };
        if ret != esp_idf_svc::sys::ESP_OK as i32 {
            return None;
        }
        Some(i32::from(ap_info.rssi))
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_rssi(&mut self) -> Option<i32> {
        if self.sim_link_up { self.sim_rssi } else { None }
    }
}

#[cfg(not(target_os = "espidf"))]
impl WifiLink {
    pub fn sim_set_link(&mut self, up: bool) {
        self.sim_link_up = up;
    }

    pub fn sim_set_rssi(&mut self, rssi: Option<i32>) {
        self.sim_rssi = rssi;
    }
}

impl LinkPort for WifiLink {
    fn is_link_up(&self) -> bool {
        self.platform_is_up()
    }

    fn rssi(&mut self) -> Option<i32> {
        let rssi = self.platform_rssi();
        if rssi.is_none() {
            warn!("WiFi: '{}' not visible; RSSI unknown", self.ssid);
        }
        rssi
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
