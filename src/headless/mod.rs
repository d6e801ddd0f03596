//! Headless mode - NDJSON event output for scripted panels
//!
//! Runs one panel against the in-memory reference host and prints what the
//! panel does as newline-delimited JSON on stdout. User actions are read
//! from stdin, one JSON object per line.
//!
//! # Example Output
//!
//! ```json
//! {"event":"panel_opened","view":"Workflows","timestamp":1704700001000}
//! {"event":"request_sent","command":"webviewReady","summary":"webviewReady","timestamp":1704700001001}
//! {"event":"data","view":"Workflows","rows":[["Approve","..."]],"records_total":1,"page_label":"Page 1 of 1","timestamp":1704700001002}
//! ```

pub mod runner;

use chrono::Utc;
use serde::Serialize;
use std::io::{self, Write};
use tracing::error;

use panelkit_app::{EngineEvent, LoadState, NoticeLevel, OperationState, TableBody, TableView};

/// Events emitted in headless mode
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    PanelOpened { view: String, timestamp: i64 },

    RequestSent {
        command: String,
        summary: String,
        timestamp: i64,
    },

    LoadChanged {
        view: String,
        state: String,
        message: Option<String>,
        timestamp: i64,
    },

    /// Rows as currently rendered
    Data {
        view: String,
        rows: Vec<Vec<String>>,
        records_total: u64,
        page_label: String,
        timestamp: i64,
    },

    Notice {
        level: String,
        text: String,
        timestamp: i64,
    },

    Operation {
        operation: String,
        state: String,
        percent: Option<f64>,
        message: Option<String>,
        timestamp: i64,
    },

    Polling { active: bool, timestamp: i64 },

    Closed { view: String, timestamp: i64 },

    Error {
        message: String,
        fatal: bool,
        timestamp: i64,
    },
}

impl HeadlessEvent {
    /// Emit this event to stdout as JSON
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }
        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }

    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    // ─────────────────────────────────────────────────────────
    // Convenience constructors
    // ─────────────────────────────────────────────────────────

    pub fn panel_opened(view: &str) -> Self {
        Self::PanelOpened {
            view: view.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn data(view: &str, table: &TableView, records_total: u64) -> Self {
        let rows = match &table.body {
            TableBody::Rows(rows) => rows.iter().map(|r| r.cells.clone()).collect(),
            _ => Vec::new(),
        };
        Self::Data {
            view: view.to_string(),
            rows,
            records_total,
            page_label: table.pager.label.clone(),
            timestamp: Self::now(),
        }
    }

    pub fn error(message: String, fatal: bool) -> Self {
        Self::Error {
            message,
            fatal,
            timestamp: Self::now(),
        }
    }

    /// Translate an engine event; `None` for events with no headless form
    ///
    /// Data changes need the rendered table, so they are built by the
    /// runner with [`HeadlessEvent::data`].
    pub fn from_engine(event: &EngineEvent) -> Option<Self> {
        let timestamp = Self::now();
        let event = match event {
            EngineEvent::RequestSent { command, summary } => Self::RequestSent {
                command: command.clone(),
                summary: summary.clone(),
                timestamp,
            },
            EngineEvent::LoadChanged { view, load } => {
                let (state, message) = match load {
                    LoadState::NotRequested => ("not_requested", None),
                    LoadState::Loading => ("loading", None),
                    LoadState::Loaded => ("loaded", None),
                    LoadState::Failed(message) => ("failed", Some(message.clone())),
                };
                Self::LoadChanged {
                    view: view.clone(),
                    state: state.to_string(),
                    message,
                    timestamp,
                }
            }
            EngineEvent::NoticeShown(notice) => Self::Notice {
                level: level_name(notice.level).to_string(),
                text: notice.text.clone(),
                timestamp,
            },
            EngineEvent::OperationChanged { operation, state } => {
                let (name, percent, message) = match state {
                    OperationState::Idle => ("idle", None, None),
                    OperationState::Started => ("started", None, None),
                    OperationState::Progressing { percent, step, .. } => {
                        ("progressing", Some(*percent), Some(step.clone()))
                    }
                    OperationState::Completed { message } => ("completed", None, message.clone()),
                    OperationState::Failed { message } => {
                        ("failed", None, Some(message.clone()))
                    }
                };
                Self::Operation {
                    operation: operation.clone(),
                    state: name.to_string(),
                    percent,
                    message,
                    timestamp,
                }
            }
            EngineEvent::PollingChanged { active } => Self::Polling {
                active: *active,
                timestamp,
            },
            EngineEvent::Closed { view } => Self::Closed {
                view: view.clone(),
                timestamp,
            },
            EngineEvent::DataChanged { .. } | EngineEvent::Shutdown => return None,
        };
        Some(event)
    }
}

fn level_name(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => "success",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    }
}
