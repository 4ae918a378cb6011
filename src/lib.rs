//! aquactl firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module; host builds get
//! simulation backends instead.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;

pub mod adapters;
pub mod drivers;
pub mod sensors;

mod esp_link_shims;
