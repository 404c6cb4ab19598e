//! Hardware boundary for chilwater
//!
//! This crate defines the interface between the orchestration core and the
//! physical sensors and pumps. It contains no platform code itself; the
//! Raspberry Pi implementation lives in `chilwater-hw-linux` and an in-memory
//! implementation for tests and simulation lives in [`mock`].

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
