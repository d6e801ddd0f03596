//! Typed command catalog for both directions of the panel/host channel
//!
//! Building an envelope from a typed value lives here; parsing envelopes back
//! into typed values is done by the host crate's protocol module.

use serde_json::{json, Map, Value};

use crate::envelope::{view_prefix, Envelope};
use crate::types::{ChangeRequestAction, Item, PageRequest};

// ─────────────────────────────────────────────────────────
// Panel → Host
// ─────────────────────────────────────────────────────────

/// Requests a panel sends to its host
#[derive(Debug, Clone, PartialEq)]
pub enum PanelRequest {
    /// Panel finished loading and wants its first dataset
    WebviewReady { view: String },

    /// Request one page of a view's dataset with host-side ordering
    RequestPage { view: String, page: PageRequest },

    /// Approve, reject or apply a single change request
    ChangeRequest {
        action: ChangeRequestAction,
        request_code: String,
        code: String,
        reason: Option<String>,
    },

    /// Apply every approved, unprocessed change request of a request code
    ApplyAllChangeRequests { request_code: String },

    ExportToCsv {
        items: Vec<Item>,
        export_type: String,
    },

    /// Ask the host for a semantic verdict on a name (payload is `{field: value}`)
    ValidateName { field: String, value: String },

    /// Create an item in a view, named by `field`
    AddItem {
        view: String,
        field: String,
        name: String,
    },

    AddFabricationRequest { description: String },

    /// Only honored by the host while the request is still queued
    CancelFabricationRequest { code: String },

    DownloadFabricationResults { code: String },

    /// User-confirmed mapping of a story to a page
    SaveStoryPageMapping {
        story_code: String,
        page_name: String,
    },

    /// Host-bound command with no typed counterpart
    Unknown {
        command: String,
        payload: Map<String, Value>,
    },
}

impl PanelRequest {
    /// The wire command for this request
    pub fn command(&self) -> String {
        match self {
            PanelRequest::WebviewReady { view } => format!("{}WebviewReady", view_prefix(view)),
            PanelRequest::RequestPage { view, .. } => format!("request{}Page", view),
            PanelRequest::ChangeRequest { action, .. } => action.command().to_string(),
            PanelRequest::ApplyAllChangeRequests { .. } => "applyAllChangeRequests".to_string(),
            PanelRequest::ExportToCsv { .. } => "exportToCSV".to_string(),
            PanelRequest::ValidateName { .. } => "validateName".to_string(),
            PanelRequest::AddItem { view, .. } => format!("add{}Item", view),
            PanelRequest::AddFabricationRequest { .. } => "addFabricationRequest".to_string(),
            PanelRequest::CancelFabricationRequest { .. } => {
                "cancelFabricationRequest".to_string()
            }
            PanelRequest::DownloadFabricationResults { .. } => {
                "downloadFabricationResults".to_string()
            }
            PanelRequest::SaveStoryPageMapping { .. } => "saveUserStoryPageMapping".to_string(),
            PanelRequest::Unknown { command, .. } => command.clone(),
        }
    }

    /// Whether the host mutates model or file state for this request
    ///
    /// The panel treats its cache as stale from the moment a mutating request
    /// is sent until the next full dataset arrives.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            PanelRequest::ChangeRequest { .. }
                | PanelRequest::ApplyAllChangeRequests { .. }
                | PanelRequest::AddItem { .. }
                | PanelRequest::AddFabricationRequest { .. }
                | PanelRequest::CancelFabricationRequest { .. }
                | PanelRequest::SaveStoryPageMapping { .. }
        )
    }

    /// View addressed by this request, when the command carries one
    pub fn view(&self) -> Option<&str> {
        match self {
            PanelRequest::WebviewReady { view }
            | PanelRequest::RequestPage { view, .. }
            | PanelRequest::AddItem { view, .. } => Some(view),
            _ => None,
        }
    }

    pub fn to_envelope(&self) -> Envelope {
        let env = Envelope::new(self.command());
        match self {
            PanelRequest::WebviewReady { .. } => env,
            PanelRequest::RequestPage { page, .. } => {
                let (column, descending) = match &page.sort {
                    Some(sort) => (sort.column.clone(), sort.direction.is_descending()),
                    None => (String::new(), false),
                };
                env.with("pageNumber", page.page_number)
                    .with("itemCountPerPage", page.page_size)
                    .with("orderByColumnName", column)
                    .with("orderByDescending", descending)
            }
            PanelRequest::ChangeRequest {
                request_code,
                code,
                reason,
                ..
            } => {
                let env = env
                    .with("requestCode", request_code.as_str())
                    .with("changeRequestCode", code.as_str());
                match reason {
                    Some(reason) => env.with("reason", reason.as_str()),
                    None => env,
                }
            }
            PanelRequest::ApplyAllChangeRequests { request_code } => {
                env.with("requestCode", request_code.as_str())
            }
            PanelRequest::ExportToCsv { items, export_type } => env
                .with(
                    "items",
                    Value::Array(items.iter().cloned().map(Value::Object).collect()),
                )
                .with("exportType", export_type.as_str()),
            PanelRequest::ValidateName { field, value } => env.with(field.as_str(), value.as_str()),
            PanelRequest::AddItem { field, name, .. } => env.with(field.as_str(), name.as_str()),
            PanelRequest::AddFabricationRequest { description } => {
                env.with("description", description.as_str())
            }
            PanelRequest::CancelFabricationRequest { code }
            | PanelRequest::DownloadFabricationResults { code } => env.with("code", code.as_str()),
            PanelRequest::SaveStoryPageMapping {
                story_code,
                page_name,
            } => env
                .with("storyCode", story_code.as_str())
                .with("pageName", page_name.as_str()),
            PanelRequest::Unknown { payload, .. } => Envelope {
                command: env.command,
                payload: payload.clone(),
            },
        }
    }

    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        match self {
            PanelRequest::WebviewReady { view } => format!("{} ready", view),
            PanelRequest::RequestPage { view, page } => {
                format!("{} page {} ({} per page)", view, page.page_number, page.page_size)
            }
            PanelRequest::ChangeRequest { action, code, .. } => {
                format!("{:?} change request {}", action, code)
            }
            PanelRequest::ApplyAllChangeRequests { request_code } => {
                format!("Apply all change requests of {}", request_code)
            }
            PanelRequest::ExportToCsv { items, export_type } => {
                format!("Export {} {} rows", items.len(), export_type)
            }
            PanelRequest::ValidateName { field, value } => format!("Validate {}={}", field, value),
            PanelRequest::AddItem { view, name, .. } => format!("Add {} to {}", name, view),
            PanelRequest::AddFabricationRequest { .. } => "Add fabrication request".to_string(),
            PanelRequest::CancelFabricationRequest { code } => format!("Cancel {}", code),
            PanelRequest::DownloadFabricationResults { code } => {
                format!("Download results of {}", code)
            }
            PanelRequest::SaveStoryPageMapping {
                story_code,
                page_name,
            } => format!("Map {} to {}", story_code, page_name),
            PanelRequest::Unknown { command, .. } => format!("Unknown request: {}", command),
        }
    }
}

// ─────────────────────────────────────────────────────────
// Host → Panel
// ─────────────────────────────────────────────────────────

/// Events a host delivers to a panel
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A full dataset (or page of one) for a view
    SetData {
        view: String,
        items: Vec<Item>,
        records_total: u64,
        page_number: Option<u32>,
        page_size: Option<u32>,
    },

    /// Settles the request command named by `operation`
    OperationComplete { operation: Option<String> },

    CsvExportReady { csv_content: String, filename: String },

    /// Incremental progress of a long-running operation
    Progress {
        operation: String,
        phase: String,
        percent: f64,
        step: String,
    },

    Completed {
        operation: String,
        message: Option<String>,
    },

    Error { operation: String, message: String },

    ModelValidationSetError { message: String },

    NameValidation { is_valid: bool, message: String },

    /// A change request was auto-rejected because the model moved on
    ChangeRequestConflict { code: String, reason: String },

    /// Panel-bound command with no typed counterpart
    Unknown {
        command: String,
        payload: Map<String, Value>,
    },
}

impl HostEvent {
    pub fn command(&self) -> String {
        match self {
            HostEvent::SetData { view, .. } => format!("set{}Data", view),
            HostEvent::OperationComplete { .. } => "operationComplete".to_string(),
            HostEvent::CsvExportReady { .. } => "csvExportReady".to_string(),
            HostEvent::Progress { operation, .. } => format!("{}Progress", operation),
            HostEvent::Completed { operation, .. } => format!("{}Completed", operation),
            HostEvent::Error { operation, .. } => format!("{}Error", operation),
            HostEvent::ModelValidationSetError { .. } => "modelValidationSetError".to_string(),
            HostEvent::NameValidation { .. } => "nameValidation".to_string(),
            HostEvent::ChangeRequestConflict { .. } => "changeRequestConflict".to_string(),
            HostEvent::Unknown { command, .. } => command.clone(),
        }
    }

    /// An error event for a request command, e.g. `requestPagesPage` -> `requestPagesPageError`
    pub fn error_for(request_command: &str, message: impl Into<String>) -> Self {
        HostEvent::Error {
            operation: request_command.to_string(),
            message: message.into(),
        }
    }

    pub fn complete(operation: impl Into<String>) -> Self {
        HostEvent::OperationComplete {
            operation: Some(operation.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            HostEvent::Error { .. } | HostEvent::ModelValidationSetError { .. }
        )
    }

    pub fn to_envelope(&self) -> Envelope {
        let env = Envelope::new(self.command());
        match self {
            HostEvent::SetData {
                items,
                records_total,
                page_number,
                page_size,
                ..
            } => {
                let mut env = env
                    .with(
                        "items",
                        Value::Array(items.iter().cloned().map(Value::Object).collect()),
                    )
                    .with("recordsTotal", *records_total);
                if let Some(n) = page_number {
                    env = env.with("pageNumber", *n);
                }
                if let Some(size) = page_size {
                    env = env.with("itemCountPerPage", *size);
                }
                env
            }
            HostEvent::OperationComplete { operation } => match operation {
                Some(op) => env.with("operation", op.as_str()),
                None => env,
            },
            HostEvent::CsvExportReady {
                csv_content,
                filename,
            } => env
                .with("csvContent", csv_content.as_str())
                .with("filename", filename.as_str()),
            HostEvent::Progress {
                phase,
                percent,
                step,
                ..
            } => env
                .with("phase", phase.as_str())
                .with("percent", json!(percent))
                .with("stepDetail", step.as_str()),
            HostEvent::Completed { message, .. } => match message {
                Some(m) => env.with("message", m.as_str()),
                None => env,
            },
            HostEvent::Error { message, .. } | HostEvent::ModelValidationSetError { message } => {
                env.with("message", message.as_str())
            }
            HostEvent::NameValidation { is_valid, message } => env
                .with("isValid", *is_valid)
                .with("message", message.as_str()),
            HostEvent::ChangeRequestConflict { code, reason } => env
                .with("code", code.as_str())
                .with("reason", reason.as_str()),
            HostEvent::Unknown { payload, .. } => Envelope {
                command: env.command,
                payload: payload.clone(),
            },
        }
    }

    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        match self {
            HostEvent::SetData {
                view,
                items,
                records_total,
                ..
            } => format!("{}: {} of {} rows", view, items.len(), records_total),
            HostEvent::OperationComplete { operation } => match operation {
                Some(op) => format!("{} complete", op),
                None => "Operation complete".to_string(),
            },
            HostEvent::CsvExportReady { filename, .. } => format!("CSV ready: {}", filename),
            HostEvent::Progress {
                operation,
                phase,
                percent,
                ..
            } => format!("{} {}: {:.0}%", operation, phase, percent),
            HostEvent::Completed { operation, .. } => format!("{} completed", operation),
            HostEvent::Error { operation, message } => format!("{} failed: {}", operation, message),
            HostEvent::ModelValidationSetError { message } => {
                format!("Model validation error: {}", message)
            }
            HostEvent::NameValidation { is_valid, message } => {
                if *is_valid {
                    "Name is valid".to_string()
                } else {
                    format!("Name rejected: {}", message)
                }
            }
            HostEvent::ChangeRequestConflict { code, reason } => format!("{}: {}", code, reason),
            HostEvent::Unknown { command, .. } => format!("Unknown event: {}", command),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SortSpec;

    #[test]
    fn test_page_request_envelope_fields() {
        let req = PanelRequest::RequestPage {
            view: "Workflows".to_string(),
            page: PageRequest {
                page_number: 2,
                page_size: 25,
                sort: Some(SortSpec::descending("name")),
            },
        };
        let env = req.to_envelope();
        assert_eq!(env.command, "requestWorkflowsPage");
        assert_eq!(env.get_u64("pageNumber"), Some(2));
        assert_eq!(env.get_u64("itemCountPerPage"), Some(25));
        assert_eq!(env.get_str("orderByColumnName"), Some("name"));
        assert_eq!(env.get_bool("orderByDescending"), Some(true));
    }

    #[test]
    fn test_webview_ready_command_is_lower_camel() {
        let req = PanelRequest::WebviewReady {
            view: "UserStories".to_string(),
        };
        assert_eq!(req.command(), "userStoriesWebviewReady");
        assert!(req.to_envelope().payload.is_empty());
    }

    #[test]
    fn test_validate_name_payload_is_single_field() {
        let req = PanelRequest::ValidateName {
            field: "flowName".to_string(),
            value: "process".to_string(),
        };
        let env = req.to_envelope();
        assert_eq!(env.payload.len(), 1);
        assert_eq!(env.get_str("flowName"), Some("process"));
    }

    #[test]
    fn test_mutating_requests() {
        assert!(PanelRequest::AddFabricationRequest {
            description: "x".to_string()
        }
        .is_mutating());
        assert!(!PanelRequest::WebviewReady {
            view: "Pages".to_string()
        }
        .is_mutating());
        assert!(!PanelRequest::ExportToCsv {
            items: vec![],
            export_type: "Pages".to_string()
        }
        .is_mutating());
    }

    #[test]
    fn test_set_data_envelope() {
        let event = HostEvent::SetData {
            view: "Pages".to_string(),
            items: vec![],
            records_total: 0,
            page_number: Some(1),
            page_size: None,
        };
        let env = event.to_envelope();
        assert_eq!(env.command, "setPagesData");
        assert_eq!(env.get_u64("recordsTotal"), Some(0));
        assert!(env.get("itemCountPerPage").is_none());
    }

    #[test]
    fn test_error_for_request_command() {
        let event = HostEvent::error_for("exportToCSV", "disk full");
        assert_eq!(event.command(), "exportToCSVError");
        assert!(event.is_error());
    }
}
