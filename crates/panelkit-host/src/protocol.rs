//! Envelope codec for the panel/host channel
//!
//! Each direction has its own parser. A command that belongs to the other
//! namespace is a protocol violation and is reported as
//! [`Error::WrongDirection`]; a well-formed command that matches no catalog
//! entry parses to the `Unknown` variant so the receiver can log and drop it.

use serde_json::Value;

use panelkit_core::envelope::{match_pattern, CommandPattern};
use panelkit_core::prelude::*;
use panelkit_core::types::{ChangeRequestAction, Item, PageRequest, SortDirection, SortSpec};
use panelkit_core::{Direction, Envelope, HostEvent, PanelRequest};

pub fn encode_request(request: &PanelRequest) -> String {
    request.to_envelope().to_json()
}

pub fn encode_event(event: &HostEvent) -> String {
    event.to_envelope().to_json()
}

// ─────────────────────────────────────────────────────────
// Host side: parse panel requests
// ─────────────────────────────────────────────────────────

/// Parse a line a panel sent to the host
pub fn parse_panel_request(line: &str) -> Result<PanelRequest> {
    let env = Envelope::parse(line)?;
    panel_request_from_envelope(env)
}

pub fn panel_request_from_envelope(env: Envelope) -> Result<PanelRequest> {
    check_direction(&env, Direction::ToHost)?;

    if let Some(action) = ChangeRequestAction::from_command(&env.command) {
        return Ok(PanelRequest::ChangeRequest {
            action,
            request_code: env.require_str("requestCode")?.to_string(),
            code: env.require_str("changeRequestCode")?.to_string(),
            reason: env
                .get_str("reason")
                .filter(|r| !r.trim().is_empty())
                .map(str::to_string),
        });
    }

    let request = match env.command.as_str() {
        "applyAllChangeRequests" => PanelRequest::ApplyAllChangeRequests {
            request_code: env.require_str("requestCode")?.to_string(),
        },
        "exportToCSV" => PanelRequest::ExportToCsv {
            items: items_field(&env, "items")?,
            export_type: env.get_str("exportType").unwrap_or("export").to_string(),
        },
        "validateName" => {
            let (field, value) = single_string_field(&env)?;
            PanelRequest::ValidateName { field, value }
        }
        "addFabricationRequest" => PanelRequest::AddFabricationRequest {
            description: env.get_str("description").unwrap_or_default().to_string(),
        },
        "cancelFabricationRequest" => PanelRequest::CancelFabricationRequest {
            code: env.require_str("code")?.to_string(),
        },
        "downloadFabricationResults" => PanelRequest::DownloadFabricationResults {
            code: env.require_str("code")?.to_string(),
        },
        "saveUserStoryPageMapping" => PanelRequest::SaveStoryPageMapping {
            story_code: env.require_str("storyCode")?.to_string(),
            page_name: env.require_str("pageName")?.to_string(),
        },
        _ => match match_pattern(&env.command) {
            Some(CommandPattern::WebviewReady { view }) => PanelRequest::WebviewReady { view },
            Some(CommandPattern::RequestPage { view }) => PanelRequest::RequestPage {
                view: view.to_string(),
                page: page_request(&env),
            },
            Some(CommandPattern::AddItem { view }) => {
                let (field, name) = single_string_field(&env)?;
                PanelRequest::AddItem {
                    view: view.to_string(),
                    field,
                    name,
                }
            }
            _ => PanelRequest::Unknown {
                command: env.command.clone(),
                payload: env.payload.clone(),
            },
        },
    };
    Ok(request)
}

fn page_request(env: &Envelope) -> PageRequest {
    let page_number = env.get_u64("pageNumber").unwrap_or(1).max(1) as u32;
    let page_size = env.get_u64("itemCountPerPage").unwrap_or(10).max(1) as u32;
    let sort = env
        .get_str("orderByColumnName")
        .filter(|c| !c.is_empty())
        .map(|column| SortSpec {
            column: column.to_string(),
            direction: if env.get_bool("orderByDescending").unwrap_or(false) {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            },
        });
    PageRequest {
        page_number,
        page_size,
        sort,
    }
}

/// Payloads shaped `{ <field>: "<value>" }`
fn single_string_field(env: &Envelope) -> Result<(String, String)> {
    let mut fields = env.payload.iter();
    match (fields.next(), fields.next()) {
        (Some((field, Value::String(value))), None) => Ok((field.clone(), value.clone())),
        _ => Err(Error::payload(
            &env.command,
            "expected exactly one string field",
        )),
    }
}

fn items_field(env: &Envelope, key: &str) -> Result<Vec<Item>> {
    match env.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| match v {
                Value::Object(map) => Ok(map.clone()),
                _ => Err(Error::payload(&env.command, format!("'{key}' must hold objects"))),
            })
            .collect(),
        Some(_) => Err(Error::payload(&env.command, format!("'{key}' must be an array"))),
    }
}

// ─────────────────────────────────────────────────────────
// Panel side: parse host events
// ─────────────────────────────────────────────────────────

/// Parse a line the host delivered to a panel
pub fn parse_host_event(line: &str) -> Result<HostEvent> {
    let env = Envelope::parse(line)?;
    host_event_from_envelope(env)
}

pub fn host_event_from_envelope(env: Envelope) -> Result<HostEvent> {
    check_direction(&env, Direction::ToPanel)?;

    let event = match env.command.as_str() {
        "operationComplete" => HostEvent::OperationComplete {
            operation: env.get_str("operation").map(str::to_string),
        },
        "csvExportReady" => HostEvent::CsvExportReady {
            csv_content: env.require_str("csvContent")?.to_string(),
            filename: env.get_str("filename").unwrap_or("export.csv").to_string(),
        },
        "modelValidationSetError" => HostEvent::ModelValidationSetError {
            message: message_field(&env),
        },
        "nameValidation" => HostEvent::NameValidation {
            is_valid: env.get_bool("isValid").unwrap_or(false),
            message: env.get_str("message").unwrap_or_default().to_string(),
        },
        "changeRequestConflict" => HostEvent::ChangeRequestConflict {
            code: env.require_str("code")?.to_string(),
            reason: env.get_str("reason").unwrap_or_default().to_string(),
        },
        _ => match match_pattern(&env.command) {
            Some(CommandPattern::SetData { view }) => {
                let items = items_field(&env, "items")?;
                let records_total = env
                    .get_u64("recordsTotal")
                    .unwrap_or(items.len() as u64);
                HostEvent::SetData {
                    view: view.to_string(),
                    records_total,
                    page_number: env.get_u64("pageNumber").map(|n| n as u32),
                    page_size: env.get_u64("itemCountPerPage").map(|n| n as u32),
                    items,
                }
            }
            Some(CommandPattern::Progress { operation }) => HostEvent::Progress {
                operation: operation.to_string(),
                phase: env.get_str("phase").unwrap_or(operation).to_string(),
                percent: env
                    .get("percent")
                    .and_then(percent_value)
                    .unwrap_or(0.0),
                step: env.get_str("stepDetail").unwrap_or_default().to_string(),
            },
            Some(CommandPattern::Completed { operation }) => HostEvent::Completed {
                operation: operation.to_string(),
                message: env.get_str("message").map(str::to_string),
            },
            Some(CommandPattern::Error { operation }) => HostEvent::Error {
                operation: operation.to_string(),
                message: message_field(&env),
            },
            _ => HostEvent::Unknown {
                command: env.command.clone(),
                payload: env.payload.clone(),
            },
        },
    };
    Ok(event)
}

fn message_field(env: &Envelope) -> String {
    env.get_str("message")
        .or_else(|| env.get_str("error"))
        .unwrap_or("Unknown error")
        .to_string()
}

fn percent_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    }
}

fn check_direction(env: &Envelope, expected: Direction) -> Result<()> {
    match env.direction() {
        Some(direction) if direction != expected => {
            Err(Error::wrong_direction(&env.command, expected.label()))
        }
        _ => Ok(()),
    }
}
