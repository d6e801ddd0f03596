//! Message types for a panel (TEA pattern)

use panelkit_core::{ChangeRequestAction, HostEvent};

/// All possible messages a panel reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // ─────────────────────────────────────────────────────────
    // Inbound
    // ─────────────────────────────────────────────────────────
    /// Raw line from the host channel, not yet parsed
    HostLine(String),

    /// Parsed host event
    Host(HostEvent),

    // ─────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────
    /// Panel shown; announce readiness and wait for the first dataset
    Open,

    /// Panel closed; drop pending requests and stop polling
    Teardown,

    // ─────────────────────────────────────────────────────────
    // Table
    // ─────────────────────────────────────────────────────────
    ApplyFilter { column: String, needle: String },
    ClearFilter,
    /// Sort by a column; repeating the current column flips direction
    Sort { column: String },
    SetPage(u32),
    NextPage,
    PrevPage,
    /// Toggle selection of the row whose key column equals this value
    ToggleSelect(String),

    // ─────────────────────────────────────────────────────────
    // Name entry
    // ─────────────────────────────────────────────────────────
    NameInput(String),
    SubmitName,

    // ─────────────────────────────────────────────────────────
    // Host operations
    // ─────────────────────────────────────────────────────────
    ReviewChangeRequest {
        action: ChangeRequestAction,
        code: String,
        reason: Option<String>,
    },
    ApplyAllChangeRequests { request_code: String },
    /// Export the selected rows, or every visible row when nothing is selected
    ExportCsv,
    AddFabricationRequest { description: String },
    CancelFabrication { code: String },
    DownloadResults { code: String },

    // ─────────────────────────────────────────────────────────
    // Story mapping
    // ─────────────────────────────────────────────────────────
    /// Parse a story's text into a page-name suggestion (nothing is saved)
    SuggestPageForStory { story_code: String },
    /// Save the suggestion, or the user's override when given
    ConfirmStoryMapping { page_name: Option<String> },
    DiscardStorySuggestion,

    DismissNotice,

    // ─────────────────────────────────────────────────────────
    // Timers
    // ─────────────────────────────────────────────────────────
    /// Auto-refresh interval elapsed
    RefreshTick,

    /// Periodic housekeeping (request timeouts)
    Tick,

    /// Re-check whether polling should run after new data
    EvaluateRefresh,
}

impl Message {
    /// Whether this message came from the host rather than the user or a timer
    pub fn is_inbound(&self) -> bool {
        matches!(self, Message::HostLine(_) | Message::Host(_))
    }
}
