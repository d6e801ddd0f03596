//! Auto-refresh polling decisions
//!
//! The timer itself lives in the engine; this only decides when it should
//! run: while at least one tracked row is in a non-terminal state.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshDecision {
    Arm,
    Disarm,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoRefresh {
    interval: Duration,
    armed: bool,
}

impl AutoRefresh {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            armed: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Update the armed flag for the latest dataset
    pub fn evaluate(&mut self, has_pending: bool) -> RefreshDecision {
        match (has_pending, self.armed) {
            (true, false) => {
                self.armed = true;
                RefreshDecision::Arm
            }
            (false, true) => {
                self.armed = false;
                RefreshDecision::Disarm
            }
            _ => RefreshDecision::Unchanged,
        }
    }

    /// Panel closed: always disarm
    pub fn teardown(&mut self) -> RefreshDecision {
        self.armed = false;
        RefreshDecision::Disarm
    }
}
