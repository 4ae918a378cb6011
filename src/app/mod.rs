//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the actuation rules of the controller: command
//! parsing and queueing, the single-active-actuation supervisor, the
//! calibration sequencer, probe filtering and the keepalive/reconnect
//! discipline.  All interaction with hardware and the broker happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod actuator;
pub mod calibration;
pub mod commands;
pub mod connectivity;
pub mod events;
pub mod filter;
pub mod parser;
pub mod ports;
pub mod queue;
pub mod report;
pub mod reporter;
pub mod service;
pub mod supervisor;
