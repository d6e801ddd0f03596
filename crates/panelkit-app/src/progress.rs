//! Long-running operation tracking
//!
//! `Idle -> Started -> Progressing -> Completed | Failed`. Progress is split
//! into named phases; within one phase the percentage never goes down, and a
//! new phase may start again from zero.

use panelkit_core::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub enum OperationState {
    Idle,
    Started,
    Progressing {
        phase: String,
        percent: f64,
        step: String,
    },
    Completed {
        message: Option<String>,
    },
    Failed {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationTracker {
    operation: Option<String>,
    state: OperationState,
}

impl Default for OperationTracker {
    fn default() -> Self {
        Self {
            operation: None,
            state: OperationState::Idle,
        }
    }
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &OperationState {
        &self.state
    }

    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    /// Started or Progressing
    pub fn is_busy(&self) -> bool {
        matches!(
            self.state,
            OperationState::Started | OperationState::Progressing { .. }
        )
    }

    pub fn percent(&self) -> Option<f64> {
        match &self.state {
            OperationState::Progressing { percent, .. } => Some(*percent),
            _ => None,
        }
    }

    /// Begin tracking `operation`. Refused while another operation is busy.
    pub fn start(&mut self, operation: &str) -> bool {
        if self.is_busy() {
            debug!(
                "Not starting '{}': '{}' is still running",
                operation,
                self.operation.as_deref().unwrap_or_default()
            );
            return false;
        }
        self.operation = Some(operation.to_string());
        self.state = OperationState::Started;
        true
    }

    /// While busy only the running operation is followed
    fn tracks(&self, operation: &str) -> bool {
        match &self.operation {
            Some(current) if self.is_busy() => current == operation,
            _ => true,
        }
    }

    /// Apply a progress report; returns whether it changed the state
    pub fn progress(&mut self, operation: &str, phase: &str, percent: f64, step: &str) -> bool {
        if !self.tracks(operation) {
            debug!("Ignoring progress for untracked operation '{}'", operation);
            return false;
        }
        let percent = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };

        if let OperationState::Progressing {
            phase: current_phase,
            percent: current,
            ..
        } = &self.state
        {
            if current_phase == phase && percent < *current {
                trace!(
                    "Ignoring regressing progress {} < {} in phase '{}'",
                    percent,
                    current,
                    phase
                );
                return false;
            }
        }

        self.operation = Some(operation.to_string());
        self.state = OperationState::Progressing {
            phase: phase.to_string(),
            percent,
            step: step.to_string(),
        };
        true
    }

    pub fn complete(&mut self, operation: &str, message: Option<String>) -> bool {
        if !self.tracks(operation) {
            return false;
        }
        self.operation = Some(operation.to_string());
        self.state = OperationState::Completed { message };
        true
    }

    pub fn fail(&mut self, operation: &str, message: impl Into<String>) -> bool {
        if !self.tracks(operation) {
            return false;
        }
        self.operation = Some(operation.to_string());
        self.state = OperationState::Failed {
            message: message.into(),
        };
        true
    }

    /// Back to Idle
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
