//! Orchestration core of chilwater
//!
//! This crate is the heart of the irrigation controller, containing:
//! - Rule evaluation (inside which window, at most once per day, for how long)
//! - Sensor polling loops publishing the latest reading
//! - The Pumper, turning requested seconds into pump start/stop transitions
//! - Controllers binding a sensor and a pump to a set of rules
//! - The System, building every loop from a validated setup and shutting
//!   them down in order
//!
//! Every loop is a tokio task ticking at a fixed interval. Each entity guards
//! its state with its own mutex and never holds it while calling into another
//! entity.

mod controller;
mod error;
mod lifecycle;
mod pumper;
mod rule;
mod sensor;
mod system;

pub use controller::*;
pub use error::*;
pub use lifecycle::LoopControl;
pub use pumper::*;
pub use rule::*;
pub use sensor::*;
pub use system::*;
