//! Fuzz target: `CommandParser::parse` and `Controller::handle_message`
//!
//! Feeds arbitrary bytes through the inbound message path.  Parsing must
//! never panic, accepted commands must keep their text within bounds, and
//! handling a message must never touch an output.
//!
//! cargo fuzz run fuzz_command_parser

#![no_main]

use std::time::Instant;

use aquactl::app::commands::{ActuatorId, MAX_RAW_LEN};
use aquactl::app::parser::CommandParser;
use aquactl::app::service::Controller;
use aquactl::config::ControllerConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = core::str::from_utf8(data) {
        for parser in [
            CommandParser::new(ActuatorId(1), ActuatorId(2)),
            CommandParser::generic(),
        ] {
            if let Ok(cmd) = parser.parse(text) {
                assert!(cmd.raw.len() <= MAX_RAW_LEN);
                assert!(!cmd.raw.is_empty(), "accepted command without text");
            }
        }
    }

    // Messages are only queued or latched; the outbox absorbs any flood.
    let config = ControllerConfig::default();
    let now = Instant::now();
    if let Ok(mut controller) = Controller::new(&config, now) {
        controller.handle_message(now, data);
        assert!(!controller.supervisor().is_active());
        assert!(controller.supervisor().queue_len() <= 1);
    }
});
