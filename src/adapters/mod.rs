//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements                 | Connects to                 |
//! |---------------|----------------------------|-----------------------------|
//! | `config_file` | ConfigPort                 | `conf.txt` on SPIFFS        |
//! | `gpio`        | ActuatorPort               | Pump / valve output pins    |
//! | `hardware`    | ActuatorPort + SensorPort  | Outputs and probe bank      |
//! | `mqtt`        | TransportPort              | ESP-IDF MQTT client         |
//! | `network`     | TransportPort + LinkPort   | MQTT session over WiFi      |
//! | `time`        | ClockPort                  | Monotonic system timer      |
//! | `wifi`        | LinkPort                   | ESP-IDF WiFi STA            |
//!
//! `channels` carries inbound messages from the MQTT receive thread to
//! the control loop; `system` owns the restart path.

pub mod channels;
pub mod config_file;
pub mod gpio;
pub mod hardware;
pub mod mqtt;
pub mod network;
pub mod system;
pub mod time;
pub mod wifi;
