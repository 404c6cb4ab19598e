//! Shared types for chilwater
//!
//! This crate defines the vocabulary shared by the configuration, the core
//! and any presentation layer sitting on top of the daemon:
//! - Loop states and comparators
//! - Read-only views of sensors, pumps, controllers and rules
//! - Versioning of the status snapshot

mod types;

pub use types::*;

/// Current version of the status snapshot layout
pub const API_VERSION: u32 = 1;
