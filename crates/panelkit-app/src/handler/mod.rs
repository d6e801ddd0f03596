//! Handler module - TEA update function and event handlers
//!
//! Organized into submodules:
//! - `update`: Main update() function and message dispatch
//! - `host`: Inbound host event handling
//! - `user`: User action handlers
//! - `send`: Single-flight gate in front of every outbound request

pub(crate) mod host;
pub(crate) mod send;
pub(crate) mod update;
pub(crate) mod user;

#[cfg(test)]
mod tests;

use std::time::Duration;

use panelkit_core::PanelRequest;

use crate::message::Message;

// Re-export main entry point
pub use update::update;

/// Actions that the event loop should perform after update
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateAction {
    /// Put a request on the host channel (already registered as in flight)
    Send(PanelRequest),

    /// Start polling with `RefreshTick` messages
    StartRefreshTimer { interval: Duration },

    StopRefreshTimer,
}

/// Result of processing a message
#[derive(Debug, Default)]
pub struct UpdateResult {
    /// Optional follow-up message to process
    pub message: Option<Message>,
    /// Optional action for the event loop to perform
    pub action: Option<UpdateAction>,
}

impl UpdateResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn message(msg: Message) -> Self {
        Self {
            message: Some(msg),
            action: None,
        }
    }

    pub fn action(action: UpdateAction) -> Self {
        Self {
            message: None,
            action: Some(action),
        }
    }

    /// Attach a follow-up message to this result
    pub fn then(mut self, msg: Message) -> Self {
        self.message = Some(msg);
        self
    }
}
