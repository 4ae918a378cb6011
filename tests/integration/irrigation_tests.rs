//! Irrigation controller: zone valves driven through the full
//! message → queue → supervisor → outputs → snapshot pipeline.

use aquactl::config::{ControllerConfig, Variant};

use crate::mock_hw::{OutputCall, Rig};

const ALL_DRY: &str = "zone1:false,zone2:false,zone3:false";

fn irrigation() -> ControllerConfig {
    ControllerConfig {
        variant: Variant::Irrigation,
        zone_pins: vec![12, 13, 14],
        ..ControllerConfig::default()
    }
}

fn boot() -> Rig {
    Rig::boot(&irrigation())
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boot_drives_outputs_off_and_announces_online() {
    let mut rig = boot();
    assert_eq!(rig.hw.calls.first(), Some(&OutputCall::AllOff));
    assert!(rig.hw.high().is_empty());

    rig.at(0).unwrap();
    assert_eq!(rig.responses(), vec!["online"]);
}

// ── Timed watering ────────────────────────────────────────────

#[test]
fn water_runs_for_whole_minutes() {
    let mut rig = boot();
    rig.send("water:1:5");
    rig.at(0).unwrap();

    assert_eq!(rig.hw.high(), vec![1]);
    assert_eq!(
        rig.responses(),
        vec!["online", "zone1:true,zone2:false,zone3:false"]
    );

    // Five minutes, not five seconds.
    rig.at(5).unwrap();
    rig.at(299).unwrap();
    assert_eq!(rig.hw.high(), vec![1]);

    rig.at(300).unwrap();
    assert!(rig.hw.high().is_empty());
    assert_eq!(rig.responses().last().map(String::as_str), Some(ALL_DRY));
    assert!(!rig.controller.supervisor().is_active());
}

#[test]
fn fractional_minutes_are_honoured() {
    let mut rig = boot();
    rig.send("water:2:0.5");
    rig.at(0).unwrap();
    rig.at(29).unwrap();
    assert_eq!(rig.hw.high(), vec![2]);
    rig.at(30).unwrap();
    assert!(rig.hw.high().is_empty());
}

#[test]
fn queued_zones_run_one_after_another() {
    let mut rig = boot();
    rig.send("water:1:1");
    rig.send("water:3:2");
    rig.at(0).unwrap();

    assert_eq!(rig.hw.high(), vec![1]);
    assert_eq!(rig.controller.supervisor().queue_len(), 1);

    // Zone 1 ends on one tick, zone 3 starts on the next.
    rig.at(60).unwrap();
    assert!(rig.hw.high().is_empty());
    rig.at_ms(60_100).unwrap();
    assert_eq!(rig.hw.high(), vec![3]);

    rig.at(179).unwrap();
    assert_eq!(rig.hw.high(), vec![3]);
    rig.at(181).unwrap();
    assert!(rig.hw.high().is_empty());

    assert_eq!(
        rig.responses(),
        vec![
            "online",
            "zone1:true,zone2:false,zone3:false",
            ALL_DRY,
            "zone1:false,zone2:false,zone3:true",
            ALL_DRY,
        ]
    );
}

#[test]
fn never_more_than_one_zone_open() {
    let mut rig = boot();
    for zone in [1, 2, 3, 1] {
        rig.send(&format!("water:{zone}:1"));
    }
    for secs in 0..=300 {
        rig.at(secs).unwrap();
        assert!(rig.hw.high().len() <= 1, "overlap at {secs}s: {:?}", rig.hw.high());
    }
}

// ── Stop ──────────────────────────────────────────────────────

#[test]
fn stop_closes_everything_and_clears_the_queue() {
    let mut rig = boot();
    rig.send("water:2:10");
    rig.send("water:3:10");
    rig.at(0).unwrap();
    assert_eq!(rig.hw.high(), vec![2]);

    rig.send("STOP");
    rig.at(20).unwrap();
    assert!(rig.hw.high().is_empty());
    assert_eq!(rig.controller.supervisor().queue_len(), 0);

    // Nothing left to start.
    rig.at(21).unwrap();
    rig.at(700).unwrap();
    assert!(rig.hw.high().is_empty());
    assert_eq!(rig.responses().last().map(String::as_str), Some(ALL_DRY));
}

#[test]
fn stop_while_idle_still_reports() {
    let mut rig = boot();
    rig.at(0).unwrap();
    rig.send("stop");
    rig.at(1).unwrap();
    assert_eq!(rig.responses(), vec!["online", ALL_DRY]);
}

// ── Status and rejects ────────────────────────────────────────

#[test]
fn status_publishes_zone_snapshot() {
    let mut rig = boot();
    rig.send("water:3:1");
    rig.at(0).unwrap();
    rig.send("status");
    rig.at(1).unwrap();
    assert_eq!(
        rig.responses().last().map(String::as_str),
        Some("zone1:false,zone2:false,zone3:true")
    );
}

#[test]
fn unknown_keyword_is_reported_and_ignored() {
    let mut rig = boot();
    rig.send("bogus:1:2");
    rig.send("water:1");
    rig.at(0).unwrap();
    assert_eq!(
        rig.responses(),
        vec!["online", "unknown command", "unknown command"]
    );
    assert!(rig.hw.high().is_empty());
}

#[test]
fn dosing_keywords_are_not_understood() {
    let mut rig = boot();
    rig.send("ph:on:10");
    rig.at(0).unwrap();
    assert_eq!(rig.responses(), vec!["online", "unknown command"]);
}

#[test]
fn calibration_keywords_are_not_understood() {
    let mut rig = boot();
    rig.send("cal:1:10");
    rig.send("done:1");
    rig.at(0).unwrap();
    assert_eq!(
        rig.responses(),
        vec!["online", "unknown command", "unknown command"]
    );
    assert!(rig.hw.reads.is_empty());
    assert!(rig.controller.calibration().session().is_none());
}

#[test]
fn unconfigured_zone_is_rejected() {
    let mut rig = boot();
    rig.send("water:9:1");
    rig.send("water:1:1");
    rig.at(0).unwrap();
    assert_eq!(rig.responses()[1], "error: unknown actuator 9");

    // The next command still runs.
    rig.at(1).unwrap();
    assert_eq!(rig.hw.high(), vec![1]);
}
