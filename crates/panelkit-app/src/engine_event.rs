//! Domain events emitted by the Engine for external consumers
//!
//! Events are broadcast after each message processing cycle via
//! `Engine::subscribe()`, so subscribers see a consistent view of changes.

use crate::progress::OperationState;
use crate::state::{LoadState, Notice};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A request was put on the host channel
    RequestSent { command: String, summary: String },

    LoadChanged { view: String, load: LoadState },

    /// Visible rows or paging changed
    DataChanged {
        view: String,
        rows: usize,
        records_total: u64,
        page_number: u32,
    },

    NoticeShown(Notice),

    OperationChanged {
        operation: String,
        state: OperationState,
    },

    /// Auto-refresh polling started or stopped
    PollingChanged { active: bool },

    /// The panel was torn down
    Closed { view: String },

    /// The engine is shutting down
    Shutdown,
}

impl EngineEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            EngineEvent::RequestSent { .. } => "request_sent",
            EngineEvent::LoadChanged { .. } => "load_changed",
            EngineEvent::DataChanged { .. } => "data_changed",
            EngineEvent::NoticeShown(_) => "notice",
            EngineEvent::OperationChanged { .. } => "operation_changed",
            EngineEvent::PollingChanged { .. } => "polling_changed",
            EngineEvent::Closed { .. } => "closed",
            EngineEvent::Shutdown => "shutdown",
        }
    }
}
