//! aquactl Firmware — Main Entry Point
//!
//! Hexagonal architecture driven by a single cooperative control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  Hardware          Network          ConfigFile    SystemClock  │
//! │  (PinBank+Probes)  (Mqtt+WifiLink)  (conf.txt)    (ClockPort)  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Controller (pure logic)                   │    │
//! │  │  Supervisor · Calibration · Reporter · Connectivity    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Watchdog · delayed restart on fatal transport errors          │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::{error, info, warn};

use esp_idf_hal::delay::Ets;
use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, Output, PinDriver};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::prelude::Peripherals;
use esp_idf_hal::uart::{self, Uart, UartDriver};
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use aquactl::adapters::config_file::ConfigFile;
use aquactl::adapters::gpio::PinBank;
use aquactl::adapters::hardware::Hardware;
use aquactl::adapters::mqtt::{MqttSettings, MqttTransport};
use aquactl::adapters::network::Network;
use aquactl::adapters::system::restart_after;
use aquactl::adapters::time::SystemClock;
use aquactl::adapters::wifi::WifiLink;
use aquactl::app::ports::{ActuatorPort, ClockPort, ConfigPort, SensorPort};
use aquactl::app::service::Controller;
use aquactl::config::{ControllerConfig, Variant};
use aquactl::drivers::watchdog::Watchdog;
use aquactl::sensors::ds18b20::Ds18b20;
use aquactl::sensors::ezo::EzoProbe;
use aquactl::sensors::{NoProbes, ProbeBank};

/// Pause before rebooting when boot itself fails.
const BOOT_FAILURE_PAUSE: Duration = Duration::from_secs(5);

/// EZO circuits ship at 9600 baud.
const EZO_BAUD: u32 = 9600;

type Outputs = PinBank<PinDriver<'static, AnyOutputPin, Output>>;
type Net = Network<MqttTransport, WifiLink>;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  aquactl v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = match ConfigFile::mount().and_then(|file| file.load()) {
        Ok(config) => config,
        Err(e) => {
            error!("configuration unusable: {}; restarting", e);
            restart_after(BOOT_FAILURE_PAUSE);
        }
    };

    // ── 3. Peripherals and link ───────────────────────────────
    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let outputs = build_outputs(&config)?;

    let link = match WifiLink::connect(
        peripherals.modem,
        sys_loop,
        nvs,
        &config.ssid,
        &config.password,
    ) {
        Ok(link) => link,
        Err(e) => {
            error!("WiFi bring-up failed: {:#}", e);
            restart_after(config.restart_pause());
        }
    };
    let net = Network::new(MqttTransport::new(MqttSettings::from_config(&config)), link);

    // ── 4. Variant-specific hardware, then run ────────────────
    match config.variant {
        Variant::Dosing => {
            let (ph_uart, orp_uart) = if config.ph_uart_port == 2 {
                (
                    open_uart(peripherals.uart2, config.ph_tx, config.ph_rx)?,
                    open_uart(peripherals.uart1, config.orp_tx, config.orp_rx)?,
                )
            } else {
                (
                    open_uart(peripherals.uart1, config.ph_tx, config.ph_rx)?,
                    open_uart(peripherals.uart2, config.orp_tx, config.orp_rx)?,
                )
            };
            let timeout = config.sensor_timeout();
            // SAFETY: the pin number comes from configuration and is not
            // claimed by any other driver.
            let ds_pin = unsafe { AnyIOPin::new(i32::from(config.ds_pin)) };
            let thermometer = match PinDriver::input_output_od(ds_pin) {
                Ok(pin) => Some(Ds18b20::new(pin, Ets)),
                Err(e) => {
                    warn!("DS18B20 pin {} unavailable: {:?}", config.ds_pin, e);
                    None
                }
            };
            let probes = ProbeBank::new(
                EzoProbe::new("ph", ph_uart, timeout),
                EzoProbe::new("orp", orp_uart, timeout),
                thermometer,
            );
            run(&config, Hardware::new(outputs, probes), net)
        }
        Variant::Irrigation => run(&config, Hardware::new(outputs, NoProbes), net),
    }
}

// ── Control loop ──────────────────────────────────────────────

fn run<S: SensorPort>(config: &ControllerConfig, mut hw: Hardware<Outputs, S>, mut net: Net) -> ! {
    let mut clock = SystemClock::new();
    let mut watchdog = Watchdog::new(Duration::from_secs(config.watchdog_timeout.into()));

    let mut controller = match Controller::new(config, clock.now()) {
        Ok(c) => c,
        Err(e) => {
            error!("controller init failed: {}", e);
            hw.all_off();
            restart_after(config.restart_pause());
        }
    };
    controller.start(&mut hw);

    if let Err(e) = controller.connect(clock.now(), &mut net) {
        error!("broker unreachable: {}", e);
        controller.shutdown(&mut hw);
        restart_after(config.restart_pause());
    }

    info!("System ready. Entering control loop.");
    let period = config.tick_period();
    loop {
        if let Err(e) = controller.poll(clock.now(), &mut hw, &mut net) {
            error!("transport failure: {}; restarting", e);
            controller.shutdown(&mut hw);
            restart_after(config.restart_pause());
        }
        watchdog.feed();
        clock.sleep(period);
    }
}

// ── Peripheral construction ───────────────────────────────────

fn build_outputs(config: &ControllerConfig) -> Result<Outputs> {
    let mut bank = PinBank::new();
    for spec in config.actuator_layout() {
        // SAFETY: each configured output pin is claimed exactly once here.
        let pin = unsafe { AnyOutputPin::new(i32::from(spec.pin)) };
        let driver = PinDriver::output(pin)
            .with_context(|| format!("output pin {} for {}", spec.pin, spec.label))?;
        bank.attach(spec.id, driver)
            .map_err(|_| anyhow!("actuator {} configured twice", spec.id))?;
        info!("actuator {} ({}) on GPIO{}{}", spec.id, spec.label, spec.pin,
            if spec.active { "" } else { " [disabled]" });
    }
    Ok(bank)
}

fn open_uart<U: Uart>(
    uart: impl Peripheral<P = U> + 'static,
    tx: u8,
    rx: u8,
) -> Result<UartDriver<'static>> {
    // SAFETY: probe pins come from configuration and are used by this
    // UART only.
    let (tx_pin, rx_pin) = unsafe { (AnyIOPin::new(i32::from(tx)), AnyIOPin::new(i32::from(rx))) };
    let config = uart::config::Config::default().baudrate(Hertz(EZO_BAUD));
    UartDriver::new(
        uart,
        tx_pin,
        rx_pin,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &config,
    )
    .with_context(|| format!("UART tx={} rx={}", tx, rx))
}
