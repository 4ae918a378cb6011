//! Broker outages, reconnects and fatal transport errors.

use aquactl::app::commands::Sensor;
use aquactl::config::ControllerConfig;
use aquactl::error::TransportError;

use crate::mock_hw::Rig;

fn boot() -> Rig {
    Rig::boot(&ControllerConfig::default())
}

#[test]
fn boot_subscribes_to_command_topic() {
    let rig = boot();
    assert_eq!(rig.net.transport().subscriptions(), ["pool/cmd"]);
    assert_eq!(rig.net.transport().sessions(), 1);
    assert_eq!(rig.controller.outages(), 0);
}

#[test]
fn dropped_session_is_reestablished_and_resubscribed() {
    let mut rig = boot();
    rig.at(0).unwrap();

    rig.net.transport_mut().drop_session();
    rig.at(1).unwrap();

    assert_eq!(rig.net.transport().sessions(), 2);
    assert_eq!(rig.net.transport().subscriptions(), ["pool/cmd", "pool/cmd"]);
    assert_eq!(rig.controller.outages(), 1);

    // Commands flow again on the new session.
    rig.send("status");
    rig.at(2).unwrap();
    assert!(rig.responses().contains(&"RSSI: -60".to_owned()));
}

#[test]
fn session_restored_by_the_client_is_resubscribed() {
    let mut rig = boot();
    rig.at(0).unwrap();

    // WiFi drops; the monitor sees it and waits for the link.
    rig.net.transport_mut().drop_session();
    rig.net.link_mut().sim_set_link(false);
    rig.at(1).unwrap();

    // The client library comes back on its own before the next pass.
    rig.net.link_mut().sim_set_link(true);
    rig.net.transport_mut().restore_session();
    rig.at(2).unwrap();

    assert_eq!(rig.net.transport().subscriptions(), ["pool/cmd", "pool/cmd"]);
    assert_eq!(rig.controller.outages(), 1);

    rig.send("status");
    rig.at(3).unwrap();
    assert!(rig.responses().contains(&"RSSI: -60".to_owned()));
}

#[test]
fn session_bounce_between_passes_is_resubscribed() {
    let mut rig = boot();
    rig.at(0).unwrap();

    rig.net.transport_mut().drop_session();
    rig.net.transport_mut().restore_session();
    rig.at(1).unwrap();

    assert_eq!(rig.net.transport().subscriptions(), ["pool/cmd", "pool/cmd"]);
    rig.send("ph:on:5");
    rig.at(2).unwrap();
    assert_eq!(rig.hw.high(), vec![1]);
}

#[test]
fn reports_wait_out_a_link_outage() {
    let mut rig = boot();
    rig.hw.script(Sensor::Ph, &[Ok(7.25)]);
    rig.hw.script(Sensor::Orp, &[Ok(612.0)]);
    rig.at(0).unwrap();

    rig.net.transport_mut().drop_session();
    rig.net.link_mut().sim_set_link(false);
    rig.at(5).unwrap();
    assert!(rig.published("pool/ph").is_empty());
    assert!(!rig.controller.outbox().is_empty());
    assert_eq!(rig.net.transport().sessions(), 1, "no attempt while the link is down");

    rig.net.link_mut().sim_set_link(true);
    rig.at(6).unwrap();
    assert_eq!(rig.published("pool/ph"), vec!["7.25"]);
    assert_eq!(rig.published("pool/orp"), vec!["612.0"]);
    assert!(rig.controller.outbox().is_empty());
}

#[test]
fn actuation_ends_on_time_while_offline() {
    let mut rig = boot();
    rig.send("ph:on:20");
    rig.at(0).unwrap();
    assert_eq!(rig.hw.high(), vec![1]);

    rig.net.transport_mut().drop_session();
    rig.net.link_mut().sim_set_link(false);
    rig.at(10).unwrap();
    rig.at(20).unwrap();
    assert!(rig.hw.high().is_empty());
    assert!(!rig.responses().contains(&"ph:off".to_owned()));

    rig.net.link_mut().sim_set_link(true);
    rig.at(21).unwrap();
    assert!(rig.responses().contains(&"ph:off".to_owned()));
    assert_eq!(rig.controller.outages(), 1);
}

#[test]
fn refused_reconnect_is_fatal() {
    let mut rig = boot();
    rig.at(0).unwrap();
    rig.net.transport_mut().drop_session();
    rig.net.transport_mut().set_refuse_connect(true);
    assert_eq!(rig.at(1), Err(TransportError::ConnectFailed));
}

#[test]
fn failed_publish_is_fatal_and_keeps_the_report() {
    let mut rig = boot();
    rig.net.transport_mut().set_fail_publish(true);
    assert_eq!(rig.at(0), Err(TransportError::PublishFailed));
    assert_eq!(rig.controller.outbox().len(), 1);

    // Shutdown before restart leaves every output off.
    rig.send("ph:on:60");
    let _ = rig.at(1);
    assert_eq!(rig.hw.high(), vec![1]);
    rig.controller.shutdown(&mut rig.hw);
    assert!(rig.hw.high().is_empty());
}

#[test]
fn message_burst_is_drained_over_several_passes() {
    let mut rig = boot();
    for _ in 0..10 {
        rig.send("bogus");
    }
    rig.at(0).unwrap();
    assert_eq!(
        rig.responses().iter().filter(|r| *r == "unknown command").count(),
        aquactl::app::service::MAX_MESSAGES_PER_CYCLE
    );
    rig.at(1).unwrap();
    assert_eq!(
        rig.responses().iter().filter(|r| *r == "unknown command").count(),
        10
    );
}
