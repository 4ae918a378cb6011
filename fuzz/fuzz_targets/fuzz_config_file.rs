//! Fuzz target: `ConfigFile::parse`
//!
//! Arbitrary `conf.txt` contents must either load into a configuration
//! that passes validation or be rejected; never panic.
//!
//! cargo fuzz run fuzz_config_file

#![no_main]

use aquactl::adapters::config_file::ConfigFile;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = ConfigFile::parse(text) {
        assert!(config.validate().is_ok());
        assert!(!config.actuator_layout().is_empty());
    }
});
