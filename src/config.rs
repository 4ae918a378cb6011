//! Controller configuration parameters
//!
//! Loaded at boot from `conf.txt` (JSON) on the device flash filesystem.
//! Field names match the keys already deployed on existing controllers;
//! every key is optional and falls back to [`ControllerConfig::default`].
//! Integer keys accept both JSON numbers and quoted strings, since older
//! files store everything as text.

use core::fmt::Write as _;
use core::str::FromStr;
use core::time::Duration;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::app::actuator::{ActuatorSpec, Label};
use crate::app::commands::ActuatorId;
use crate::app::filter::MAX_WINDOW;
use crate::app::ports::ConfigError;

/// Upper bound on configured outputs (dosing pumps or irrigation zones).
pub const MAX_ACTUATORS: usize = 8;

/// Which set of outputs this controller drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Two peristaltic pumps plus pH/ORP probes.
    #[default]
    Dosing,
    /// Solenoid valves, one per zone.
    Irrigation,
}

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub variant: Variant,

    // --- Topics ---
    /// Command topic; also carries the `offline` last-will.
    pub topic_sub: String,
    /// Raw pH readings; the average goes to `<topic>/moving_average`.
    pub ph_topic_pub: String,
    pub orp_topic_pub: String,
    /// Lifecycle strings, diagnostics, status and zone snapshots.
    pub resp_pub: String,

    // --- Broker ---
    pub mqtt_server: String,
    #[serde(deserialize_with = "lenient_int")]
    pub mqtt_port: u16,
    pub mqtt_username: String,
    pub mqtt_pw: String,
    /// Keepalive probe cadence (seconds)
    #[serde(deserialize_with = "lenient_int")]
    pub keepalive_interval: u32,
    /// Network hostname, also used as the MQTT client id.
    pub hostname: String,

    // --- WiFi ---
    pub ssid: String,
    pub password: String,

    // --- Probes ---
    #[serde(deserialize_with = "lenient_int")]
    pub ph_uart_port: u8,
    #[serde(deserialize_with = "lenient_int")]
    pub ph_tx: u8,
    #[serde(deserialize_with = "lenient_int")]
    pub ph_rx: u8,
    #[serde(deserialize_with = "lenient_int")]
    pub orp_uart_port: u8,
    #[serde(deserialize_with = "lenient_int")]
    pub orp_tx: u8,
    #[serde(deserialize_with = "lenient_int")]
    pub orp_rx: u8,
    /// Samples in the pH moving-average window (1..=64)
    #[serde(deserialize_with = "lenient_int")]
    pub ph_ma_window: usize,
    #[serde(deserialize_with = "lenient_int")]
    pub orp_ma_window: usize,
    /// DS18B20 1-Wire data pin
    #[serde(deserialize_with = "lenient_int")]
    pub ds_pin: u8,
    /// Upper bound on one probe transaction (milliseconds)
    #[serde(deserialize_with = "lenient_int")]
    pub sensor_read_timeout_ms: u32,

    // --- Outputs ---
    #[serde(deserialize_with = "lenient_int")]
    pub pump_1_pin: u8,
    #[serde(deserialize_with = "lenient_int")]
    pub pump_2_pin: u8,
    /// Actuator id of the pH pump (driven through `pump_1_pin`)
    #[serde(deserialize_with = "lenient_int")]
    pub ph_pump: u8,
    /// Actuator id of the ORP pump (driven through `pump_2_pin`)
    #[serde(deserialize_with = "lenient_int")]
    pub orp_pump: u8,
    /// Irrigation valve GPIOs; zone `i` (1-based) drives `zone_pins[i-1]`.
    pub zone_pins: Vec<u8>,
    /// Actuator ids that are wired but administratively disabled.
    pub disabled_actuators: Vec<u8>,

    // --- Timing ---
    /// Periodic pH/ORP report cadence (seconds)
    #[serde(deserialize_with = "lenient_int")]
    pub report_interval: u32,
    /// Delay between `online` and the first periodic report (seconds)
    #[serde(deserialize_with = "lenient_int")]
    pub startup_report_delay: u32,
    /// Calibration session ceiling (seconds)
    #[serde(deserialize_with = "lenient_int")]
    pub calibration_timeout: u32,
    /// Control loop sleep between ticks (milliseconds)
    #[serde(deserialize_with = "lenient_int")]
    pub control_loop_interval_ms: u32,
    /// Pause before restarting after a fatal transport error (seconds)
    #[serde(deserialize_with = "lenient_int")]
    pub restart_delay: u32,
    /// Minimum spacing between broker reconnect attempts (seconds)
    #[serde(deserialize_with = "lenient_int")]
    pub reconnect_interval: u32,
    /// Task watchdog timeout (seconds)
    #[serde(deserialize_with = "lenient_int")]
    pub watchdog_timeout: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            variant: Variant::Dosing,

            // Topics
            topic_sub: "pool/cmd".into(),
            ph_topic_pub: "pool/ph".into(),
            orp_topic_pub: "pool/orp".into(),
            resp_pub: "pool/resp".into(),

            // Broker
            mqtt_server: "192.168.1.10".into(),
            mqtt_port: 1883,
            mqtt_username: String::new(),
            mqtt_pw: String::new(),
            keepalive_interval: 60,
            hostname: "aquactl".into(),

            // WiFi
            ssid: String::new(),
            password: String::new(),

            // Probes
            ph_uart_port: 1,
            ph_tx: 10,
            ph_rx: 9,
            orp_uart_port: 2,
            orp_tx: 17,
            orp_rx: 16,
            ph_ma_window: 10,
            orp_ma_window: 10,
            ds_pin: 4,
            sensor_read_timeout_ms: 1500, // EZO answers `R` within ~900 ms

            // Outputs
            pump_1_pin: 32,
            pump_2_pin: 33,
            ph_pump: 1,
            orp_pump: 2,
            zone_pins: Vec::new(),
            disabled_actuators: Vec::new(),

            // Timing
            report_interval: 60,
            startup_report_delay: 5,
            calibration_timeout: 300,
            control_loop_interval_ms: 100, // 10 Hz
            restart_delay: 5,
            reconnect_interval: 5,
            watchdog_timeout: 30,
        }
    }
}

impl ControllerConfig {
    /// Reject values that would break a runtime invariant.  Called once at
    /// boot; a failure is fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for window in [self.ph_ma_window, self.orp_ma_window] {
            if !(1..=MAX_WINDOW).contains(&window) {
                return Err(ConfigError::ValidationFailed(
                    "moving-average window must be 1..=64",
                ));
            }
        }
        if self.topic_sub.is_empty() {
            return Err(ConfigError::ValidationFailed("topic_sub is empty"));
        }
        if self.keepalive_interval == 0 {
            return Err(ConfigError::ValidationFailed("keepalive_interval is zero"));
        }
        if self.report_interval == 0 {
            return Err(ConfigError::ValidationFailed("report_interval is zero"));
        }
        if self.control_loop_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "control_loop_interval_ms is zero",
            ));
        }
        if self.calibration_timeout == 0 {
            return Err(ConfigError::ValidationFailed("calibration_timeout is zero"));
        }
        match self.variant {
            Variant::Dosing if self.ph_pump == self.orp_pump => {
                return Err(ConfigError::ValidationFailed(
                    "ph_pump and orp_pump share an id",
                ));
            }
            Variant::Irrigation if self.zone_pins.len() > MAX_ACTUATORS => {
                return Err(ConfigError::ValidationFailed("too many irrigation zones"));
            }
            Variant::Irrigation if self.zone_pins.is_empty() => {
                return Err(ConfigError::ValidationFailed("no irrigation zones"));
            }
            Variant::Irrigation
                if self
                    .zone_pins
                    .iter()
                    .enumerate()
                    .any(|(i, pin)| self.zone_pins[..i].contains(pin)) =>
            {
                return Err(ConfigError::ValidationFailed(
                    "two irrigation zones share a pin",
                ));
            }
            _ => {}
        }
        Ok(())
    }

    /// The actuator table for the configured variant.
    pub fn actuator_layout(&self) -> heapless::Vec<ActuatorSpec, MAX_ACTUATORS> {
        let mut layout = heapless::Vec::new();
        match self.variant {
            Variant::Dosing => {
                let pumps = [
                    (self.ph_pump, self.pump_1_pin, "ph"),
                    (self.orp_pump, self.pump_2_pin, "orp"),
                ];
                for (id, pin, label) in pumps {
                    let label = Label::try_from(label).unwrap_or_default();
                    let _ = layout.push(self.spec(id, pin, label));
                }
            }
            Variant::Irrigation => {
                for (i, &pin) in self.zone_pins.iter().take(MAX_ACTUATORS).enumerate() {
                    let id = (i + 1) as u8;
                    let mut label = Label::new();
                    let _ = write!(label, "zone{id}");
                    let _ = layout.push(self.spec(id, pin, label));
                }
            }
        }
        layout
    }

    fn spec(&self, id: u8, pin: u8, label: Label) -> ActuatorSpec {
        ActuatorSpec {
            id: ActuatorId(id),
            pin,
            label,
            active: !self.disabled_actuators.contains(&id),
        }
    }

    // ── Typed accessors ───────────────────────────────────────

    pub fn report_period(&self) -> Duration {
        Duration::from_secs(self.report_interval.into())
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_report_delay.into())
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval.into())
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval.into())
    }

    pub fn calibration_ceiling(&self) -> Duration {
        Duration::from_secs(self.calibration_timeout.into())
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.control_loop_interval_ms.into())
    }

    pub fn sensor_timeout(&self) -> Duration {
        Duration::from_millis(self.sensor_read_timeout_ms.into())
    }

    pub fn restart_pause(&self) -> Duration {
        Duration::from_secs(self.restart_delay.into())
    }

    /// `mqtt://host:port`
    pub fn broker_url(&self) -> String {
        format!("mqtt://{}:{}", self.mqtt_server, self.mqtt_port)
    }
}

/// Accept `60` as well as `"60"`.
fn lenient_int<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + TryFrom<u64>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => T::try_from(n).map_err(|_| D::Error::custom("integer out of range")),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom("expected an integer")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = ControllerConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.calibration_ceiling(), Duration::from_secs(300));
        assert!(c.tick_period() < c.report_period());
        assert!(c.sensor_timeout() < c.report_period());
    }

    #[test]
    fn serde_roundtrip() {
        let c = ControllerConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: ControllerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c, c2);
    }

    #[test]
    fn legacy_conf_txt_with_quoted_numbers() {
        let json = r#"{
            "topic_sub": "pool/in", "ph_topic_pub": "pool/ph", "orp_topic_pub": "pool/orp",
            "resp_pub": "pool/out", "report_interval": "30", "mqtt_server": "10.0.0.2",
            "mqtt_port": "1883", "mqtt_username": "u", "mqtt_pw": "p", "ssid": "net",
            "password": "pw", "keepalive_interval": "120", "hostname": "pool",
            "ph_uart_port": "1", "ph_tx": "25", "ph_rx": "26", "orp_uart_port": "2",
            "orp_tx": "17", "orp_rx": "16", "ph_ma_window": "5", "orp_ma_window": 8,
            "pump_1_pin": "32", "pump_2_pin": "33", "ph_pump": "1", "orp_pump": "2",
            "ds_pin": "4"
        }"#;
        let c: ControllerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(c.report_interval, 30);
        assert_eq!(c.keepalive_interval, 120);
        assert_eq!(c.ph_ma_window, 5);
        assert_eq!(c.orp_ma_window, 8);
        assert_eq!(c.ph_tx, 25);
        // Keys absent from the file keep their defaults.
        assert_eq!(c.calibration_timeout, 300);
        assert_eq!(c.variant, Variant::Dosing);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn non_numeric_text_is_rejected() {
        let err = serde_json::from_str::<ControllerConfig>(r#"{"mqtt_port": "abc"}"#);
        assert!(err.is_err());
        let err = serde_json::from_str::<ControllerConfig>(r#"{"ph_tx": 300}"#);
        assert!(err.is_err());
    }

    #[test]
    fn window_bounds_enforced() {
        let mut c = ControllerConfig::default();
        c.ph_ma_window = 0;
        assert!(matches!(c.validate(), Err(ConfigError::ValidationFailed(_))));
        c.ph_ma_window = MAX_WINDOW + 1;
        assert!(c.validate().is_err());
        c.ph_ma_window = MAX_WINDOW;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn dosing_layout_maps_pumps_to_pins() {
        let mut c = ControllerConfig::default();
        c.disabled_actuators = vec![2];
        let layout = c.actuator_layout();
        assert_eq!(layout.len(), 2);
        assert_eq!(layout[0].id, ActuatorId(1));
        assert_eq!(layout[0].pin, 32);
        assert_eq!(layout[0].label.as_str(), "ph");
        assert!(layout[0].active);
        assert_eq!(layout[1].label.as_str(), "orp");
        assert!(!layout[1].active);
    }

    #[test]
    fn irrigation_layout_numbers_zones_from_one() {
        let c = ControllerConfig {
            variant: Variant::Irrigation,
            zone_pins: vec![12, 13, 14],
            ..ControllerConfig::default()
        };
        assert!(c.validate().is_ok());
        let layout = c.actuator_layout();
        let ids: Vec<u8> = layout.iter().map(|s| s.id.0).collect();
        assert_eq!(ids, [1, 2, 3]);
        assert_eq!(layout[2].label.as_str(), "zone3");
        assert_eq!(layout[2].pin, 14);
    }

    #[test]
    fn irrigation_needs_zones_within_limit() {
        let mut c = ControllerConfig {
            variant: Variant::Irrigation,
            ..ControllerConfig::default()
        };
        assert!(c.validate().is_err());
        c.zone_pins = (0..=MAX_ACTUATORS as u8).collect();
        assert!(c.validate().is_err());
    }

    #[test]
    fn irrigation_zones_need_distinct_pins() {
        let mut c = ControllerConfig {
            variant: Variant::Irrigation,
            zone_pins: vec![12, 13, 12],
            ..ControllerConfig::default()
        };
        assert_eq!(
            c.validate(),
            Err(ConfigError::ValidationFailed("two irrigation zones share a pin"))
        );
        c.zone_pins = vec![12, 13, 14];
        assert!(c.validate().is_ok());
    }

    #[test]
    fn duplicate_pump_ids_rejected() {
        let c = ControllerConfig {
            orp_pump: 1,
            ..ControllerConfig::default()
        };
        assert!(c.validate().is_err());
    }
}
