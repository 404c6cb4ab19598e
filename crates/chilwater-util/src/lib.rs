//! Shared utilities for chilwater
//!
//! This crate provides:
//! - ID types (PumpNr, SensorNr, ControllerNr)
//! - Time utilities (mockable wall clock, monotonic time, daily windows)
//! - Default paths for the configuration file
//! - MCP3008 channel numbers

mod channel;
mod ids;
mod paths;
mod time;

pub use channel::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
