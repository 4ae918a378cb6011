//! Dosing controller: pump timing, periodic probe reports, calibration
//! sessions and status requests.

use aquactl::app::commands::Sensor;
use aquactl::config::ControllerConfig;
use aquactl::error::SensorError;

use crate::mock_hw::Rig;

fn boot() -> Rig {
    Rig::boot(&ControllerConfig::default())
}

fn reads_of(rig: &Rig, sensor: Sensor) -> usize {
    rig.hw.reads.iter().filter(|s| **s == sensor).count()
}

// ── Pumps ─────────────────────────────────────────────────────

#[test]
fn ph_pump_runs_for_seconds() {
    let mut rig = boot();
    rig.send("ph:on:30");
    rig.at(0).unwrap();
    assert_eq!(rig.hw.high(), vec![1]);
    assert_eq!(rig.responses(), vec!["online", "ph:on"]);

    rig.at(29).unwrap();
    assert_eq!(rig.hw.high(), vec![1]);
    rig.at(30).unwrap();
    assert!(rig.hw.high().is_empty());
    assert_eq!(rig.responses().last().map(String::as_str), Some("ph:off"));
}

#[test]
fn generic_on_addresses_pump_by_id() {
    let mut rig = boot();
    rig.send("on:2:3");
    rig.at(0).unwrap();
    assert_eq!(rig.hw.high(), vec![2]);
    assert!(rig.responses().contains(&"orp:on".to_owned()));
}

#[test]
fn second_pump_waits_for_the_first() {
    let mut rig = boot();
    rig.send("ph:on:10");
    rig.send("orp:on:10");
    rig.at(0).unwrap();
    assert_eq!(rig.hw.high(), vec![1]);

    rig.at(10).unwrap();
    assert!(rig.hw.high().is_empty());
    rig.at(11).unwrap();
    assert_eq!(rig.hw.high(), vec![2]);
    rig.at(21).unwrap();
    assert!(rig.hw.high().is_empty());
}

#[test]
fn off_is_queued_behind_running_work() {
    let mut rig = boot();
    rig.send("ph:on:10");
    rig.send("ph:off");
    rig.at(0).unwrap();
    rig.at(1).unwrap();
    assert_eq!(rig.hw.high(), vec![1], "off must not cut the run short");

    rig.at(10).unwrap();
    rig.at(11).unwrap();
    let offs = rig.responses().iter().filter(|r| *r == "ph:off").count();
    assert_eq!(offs, 2);
}

#[test]
fn stop_turns_off_both_pumps() {
    let mut rig = boot();
    rig.send("orp:on:60");
    rig.send("ph:on:60");
    rig.at(0).unwrap();
    rig.send("stop");
    rig.at(2).unwrap();
    assert!(rig.hw.high().is_empty());
    assert_eq!(rig.controller.supervisor().queue_len(), 0);
    assert_eq!(rig.responses().last().map(String::as_str), Some("orp:off"));
}

// ── Periodic report ───────────────────────────────────────────

#[test]
fn first_report_after_startup_delay() {
    let mut rig = boot();
    rig.hw.script(Sensor::Ph, &[Ok(7.0), Ok(7.5)]);
    rig.hw.script(Sensor::Orp, &[Ok(650.5), Ok(651.5)]);

    rig.at(4).unwrap();
    assert!(rig.hw.reads.is_empty());

    rig.at(5).unwrap();
    assert_eq!(rig.published("pool/ph"), vec!["7.0"]);
    assert_eq!(rig.published("pool/ph/moving_average"), vec!["7.0"]);
    assert_eq!(rig.published("pool/orp"), vec!["650.5"]);
    assert_eq!(rig.published("pool/orp/moving_average"), vec!["650.5"]);

    // Next one a full report interval later.
    rig.at(64).unwrap();
    assert_eq!(reads_of(&rig, Sensor::Ph), 1);
    rig.at(65).unwrap();
    assert_eq!(rig.published("pool/ph"), vec!["7.0", "7.5"]);
    assert_eq!(rig.published("pool/ph/moving_average"), vec!["7.0", "7.25"]);
    assert_eq!(rig.published("pool/orp/moving_average"), vec!["650.5", "651.0"]);
}

#[test]
fn silent_probe_reports_sentinel_and_keeps_average() {
    let mut rig = boot();
    rig.hw.script(Sensor::Ph, &[Ok(7.5), Err(SensorError::Timeout)]);
    rig.hw.script(Sensor::Orp, &[Ok(700.0), Ok(700.0)]);

    rig.at(5).unwrap();
    rig.at(65).unwrap();

    assert_eq!(rig.published("pool/ph"), vec!["7.5", "8.888"]);
    // The sentinel never enters the window.
    assert_eq!(rig.published("pool/ph/moving_average"), vec!["7.5", "7.5"]);
    assert!(rig
        .responses()
        .contains(&"error: ph sensor read timed out".to_owned()));
    assert_eq!(rig.controller.filters().window(Sensor::Ph).len(), 1);
}

#[test]
fn no_average_before_first_valid_reading() {
    let mut rig = boot();
    rig.at(5).unwrap();
    assert_eq!(rig.published("pool/ph"), vec!["8.888"]);
    assert_eq!(rig.published("pool/orp"), vec!["8.888"]);
    assert!(rig.published("pool/ph/moving_average").is_empty());
}

// ── Calibration ───────────────────────────────────────────────

#[test]
fn ph_calibration_samples_until_done() {
    let mut rig = boot();
    rig.hw.script(Sensor::Ph, &[Ok(6.9), Ok(7.0), Ok(7.0)]);
    rig.hw.script(Sensor::Orp, &[Ok(640.0)]);

    rig.send("ph:cal:10");
    rig.at(0).unwrap();
    assert_eq!(rig.responses(), vec!["online", "cal:1:start"]);
    assert_eq!(reads_of(&rig, Sensor::Ph), 1);

    // The periodic report leaves the probe under calibration alone.
    rig.at(5).unwrap();
    assert_eq!(reads_of(&rig, Sensor::Ph), 1);
    assert_eq!(reads_of(&rig, Sensor::Orp), 1);

    rig.at(10).unwrap();
    rig.at(20).unwrap();
    assert_eq!(reads_of(&rig, Sensor::Ph), 3);
    assert_eq!(rig.published("pool/ph"), vec!["6.9", "7.0", "7.0"]);

    rig.send("ph:done");
    rig.at(22).unwrap();
    assert_eq!(
        rig.hw.probe_commands,
        vec![(Sensor::Ph, "Cal,mid,7.00".to_owned())]
    );
    assert_eq!(rig.responses().last().map(String::as_str), Some("cal:1:end"));
    assert!(rig.controller.calibration().session().is_none());

    // Back on the periodic schedule.
    rig.at(65).unwrap();
    assert_eq!(reads_of(&rig, Sensor::Ph), 4);
}

#[test]
fn orp_calibration_times_out_without_finalize() {
    let mut rig = boot();
    rig.send("cal:2:30");
    rig.at(0).unwrap();
    assert!(rig.responses().contains(&"cal:2:start".to_owned()));

    rig.at(299).unwrap();
    assert!(rig.controller.calibration().session().is_some());
    rig.at(300).unwrap();

    assert_eq!(rig.responses().last().map(String::as_str), Some("cal:2:timeout"));
    assert!(rig.hw.probe_commands.is_empty());
    assert!(rig.controller.calibration().session().is_none());

    // A late done has nothing to finish.
    rig.send("orp:done");
    rig.at(301).unwrap();
    assert_eq!(
        rig.responses().last().map(String::as_str),
        Some("error: no calibration running for orp")
    );
    assert!(rig.hw.probe_commands.is_empty());
}

#[test]
fn one_calibration_at_a_time() {
    let mut rig = boot();
    rig.send("ph:cal:10");
    rig.send("orp:cal:10");
    rig.send("ph:cal:5");
    rig.at(0).unwrap();

    let responses = rig.responses();
    assert!(responses.contains(&"error: calibration of ph in progress".to_owned()));
    assert!(responses.contains(&"error: calibration of ph already running".to_owned()));
    assert_eq!(
        rig.controller.calibration().active_sensor(),
        Some(Sensor::Ph)
    );
}

#[test]
fn calibration_does_not_block_pumps() {
    let mut rig = boot();
    rig.send("orp:cal:10");
    rig.send("ph:on:5");
    rig.at(0).unwrap();
    assert_eq!(rig.hw.high(), vec![1]);
    rig.at(5).unwrap();
    assert!(rig.hw.high().is_empty());
    assert!(rig.controller.calibration().session().is_some());
}

// ── Status ────────────────────────────────────────────────────

#[test]
fn status_reports_rssi_and_temperature() {
    let mut rig = boot();
    rig.hw.temperature = Some(24.5);
    rig.send("status");
    rig.at(1).unwrap();
    assert_eq!(rig.responses(), vec!["online", "RSSI: -60", "temp: 24.5"]);
}

#[test]
fn status_without_thermometer() {
    let mut rig = boot();
    rig.net.link_mut().sim_set_rssi(Some(-71));
    rig.send("status");
    rig.at(1).unwrap();
    assert_eq!(
        rig.responses(),
        vec!["online", "RSSI: -71", "temp sensor error"]
    );
}
