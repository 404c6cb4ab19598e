//! Loop lifecycle shared by sensors, controllers and the pumper
//!
//! STOPPED --run()--> RUNNING --stop() seen on the next tick--> STOPPED.
//! The final STOPPED is terminal: a stopped entity is never restarted.

use chilwater_api::LoopState;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};

/// Outcome of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stop,
}

#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: LoopState,
    started: bool,
    stop_requested: bool,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            state: LoopState::Stopped,
            started: false,
            stop_requested: false,
        }
    }

    /// Enter RUNNING. Returns false if the loop was already started once.
    pub(crate) fn begin(&mut self) -> bool {
        if self.started {
            return false;
        }
        self.started = true;
        self.state = LoopState::Running;
        true
    }

    pub(crate) fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Called once per tick with the entity lock held
    pub(crate) fn observe_stop(&mut self) -> bool {
        if self.stop_requested {
            self.state = LoopState::Stopped;
        }
        self.stop_requested
    }

    pub(crate) fn state(&self) -> LoopState {
        self.state
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fixed-rate ticker; a late tick delays the following ones instead of
/// bursting to catch up
pub(crate) fn ticker(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions() {
        let mut lc = Lifecycle::new();
        assert_eq!(lc.state(), LoopState::Stopped);

        assert!(lc.begin());
        assert_eq!(lc.state(), LoopState::Running);
        assert!(!lc.observe_stop());

        lc.request_stop();
        assert_eq!(lc.state(), LoopState::Running);
        assert!(lc.observe_stop());
        assert_eq!(lc.state(), LoopState::Stopped);

        assert!(!lc.begin());
        assert_eq!(lc.state(), LoopState::Stopped);
    }
}
