//! User action and timer handlers

use panelkit_core::prelude::*;
use panelkit_core::{
    cell_text, extract_story_parts, is_pascal_case, suggest_page_name, ChangeRequestAction,
    JobStatus, PanelRequest, SortSpec,
};
use panelkit_host::DOWNLOAD_OPERATION;

use super::send::send_request;
use super::{UpdateAction, UpdateResult};
use crate::message::Message;
use crate::refresh::RefreshDecision;
use crate::state::{
    LoadState, NameValidation, NoticeLevel, PanelPhase, PanelState, StorySuggestion,
};
use crate::view::SortAuthority;

/// Row field carrying the request code of a change request
const REQUEST_CODE_FIELD: &str = "RequestCode";
const STORY_TEXT_FIELD: &str = "storyText";

// ─────────────────────────────────────────────────────────
// Lifecycle
// ─────────────────────────────────────────────────────────

pub(crate) fn handle_open(state: &mut PanelState) -> UpdateResult {
    if state.load != LoadState::Loaded {
        state.load = LoadState::Loading;
    }
    let request = PanelRequest::WebviewReady {
        view: state.schema.name.clone(),
    };
    send_request(state, request)
}

pub(crate) fn handle_teardown(state: &mut PanelState) -> UpdateResult {
    state.phase = PanelPhase::Closed;
    let dropped = state.flights.cancel_all();
    if !dropped.is_empty() {
        debug!("Closing '{}' with unanswered {:?}", state.schema.name, dropped);
    }
    state.operation.reset();
    state.refresh.teardown();
    UpdateResult::action(UpdateAction::StopRefreshTimer)
}

// ─────────────────────────────────────────────────────────
// Table
// ─────────────────────────────────────────────────────────

pub(crate) fn handle_apply_filter(
    state: &mut PanelState,
    column: &str,
    needle: &str,
) -> Result<UpdateResult> {
    match state.schema.column(column) {
        Some(def) if def.filterable => {}
        _ => {
            return Err(Error::validation(format!(
                "Column '{}' cannot be filtered",
                column
            )))
        }
    }
    if needle.trim().is_empty() {
        state.filters.remove(column);
    } else {
        state.filters.insert(column.to_string(), needle.to_string());
    }
    state.recompute_visible();
    Ok(UpdateResult::none())
}

pub(crate) fn handle_clear_filter(state: &mut PanelState) -> UpdateResult {
    state.filters.clear();
    state.recompute_visible();
    UpdateResult::none()
}

/// Sorting the same column again flips the direction
pub(crate) fn handle_sort(state: &mut PanelState, column: &str) -> Result<UpdateResult> {
    if state.schema.column(column).is_none() {
        return Err(Error::validation(format!("Unknown column '{}'", column)));
    }
    state.sort = Some(match state.sort.take() {
        Some(current) if current.column == column => SortSpec {
            direction: current.direction.toggle(),
            ..current
        },
        _ => SortSpec::ascending(column),
    });

    match state.schema.sort_authority {
        SortAuthority::Local => {
            state.recompute_visible();
            Ok(UpdateResult::none())
        }
        SortAuthority::Host => {
            let request = state.page_request(1);
            Ok(send_request(state, request))
        }
    }
}

pub(crate) fn handle_set_page(state: &mut PanelState, page: u32) -> UpdateResult {
    let page = state.pagination.clamp(page);
    let request = state.page_request(page);
    send_request(state, request)
}

pub(crate) fn handle_next_page(state: &PanelState) -> UpdateResult {
    if state.pagination.has_next() {
        UpdateResult::message(Message::SetPage(state.pagination.page_number + 1))
    } else {
        UpdateResult::none()
    }
}

pub(crate) fn handle_prev_page(state: &PanelState) -> UpdateResult {
    if state.pagination.has_prev() {
        UpdateResult::message(Message::SetPage(state.pagination.page_number - 1))
    } else {
        UpdateResult::none()
    }
}

pub(crate) fn handle_toggle_select(state: &mut PanelState, key: &str) -> Result<UpdateResult> {
    if state.find_row(key).is_none() {
        return Err(Error::validation(format!("No row '{}'", key)));
    }
    if !state.selection.remove(key) {
        state.selection.insert(key.to_string());
    }
    Ok(UpdateResult::none())
}

// ─────────────────────────────────────────────────────────
// Name entry
// ─────────────────────────────────────────────────────────

/// Cheap checks run here; anything that passes goes to the host for the verdict
pub(crate) fn handle_name_input(state: &mut PanelState, value: &str) -> Result<UpdateResult> {
    let Some(field) = state.schema.name_field.clone() else {
        return Err(Error::validation(format!(
            "{} does not accept new items",
            state.schema.title
        )));
    };
    let value = value.trim().to_string();
    state.name_form.input = value.clone();

    if let Some(problem) = state.schema.check_name(&value) {
        state.name_form.validation = NameValidation::Invalid(problem);
        return Ok(UpdateResult::none());
    }

    state.name_form.validation = NameValidation::Pending;
    let result = send_request(
        state,
        PanelRequest::ValidateName {
            field,
            value: value.clone(),
        },
    );
    if result.action.is_some() {
        state.name_form.checking = Some(value);
    }
    Ok(result)
}

pub(crate) fn handle_submit_name(state: &mut PanelState) -> Result<UpdateResult> {
    if !state.submit_enabled() {
        return Err(Error::validation("Name has not been accepted yet"));
    }
    let Some(field) = state.schema.name_field.clone() else {
        return Err(Error::validation("No name field"));
    };
    let request = PanelRequest::AddItem {
        view: state.schema.name.clone(),
        field,
        name: state.name_form.input.clone(),
    };
    Ok(send_request(state, request))
}

// ─────────────────────────────────────────────────────────
// Host operations
// ─────────────────────────────────────────────────────────

pub(crate) fn handle_review_change_request(
    state: &mut PanelState,
    action: ChangeRequestAction,
    code: &str,
    reason: Option<String>,
) -> Result<UpdateResult> {
    let row = state
        .find_row(code)
        .ok_or_else(|| Error::change_request(format!("No change request '{}'", code)))?;
    let request_code = cell_text(row.get(REQUEST_CODE_FIELD));
    if request_code.is_empty() {
        return Err(Error::change_request(format!(
            "Change request '{}' has no request code",
            code
        )));
    }
    let reason = reason.filter(|r| !r.trim().is_empty());
    let request = PanelRequest::ChangeRequest {
        action,
        request_code,
        code: code.to_string(),
        reason,
    };
    Ok(send_request(state, request))
}

pub(crate) fn handle_apply_all(state: &mut PanelState, request_code: &str) -> Result<UpdateResult> {
    if request_code.trim().is_empty() {
        return Err(Error::change_request("Request code is required"));
    }
    let request = PanelRequest::ApplyAllChangeRequests {
        request_code: request_code.to_string(),
    };
    Ok(send_request(state, request))
}

/// Selected rows if any, else every visible row
pub(crate) fn handle_export_csv(state: &mut PanelState) -> UpdateResult {
    let items = if state.selection.is_empty() {
        state.visible.clone()
    } else {
        state.selected_items()
    };
    if items.is_empty() {
        state.set_notice(NoticeLevel::Warning, "Nothing to export");
        return UpdateResult::none();
    }
    let request = PanelRequest::ExportToCsv {
        items,
        export_type: state.schema.name.clone(),
    };
    send_request(state, request)
}

pub(crate) fn handle_add_fabrication(
    state: &mut PanelState,
    description: &str,
) -> Result<UpdateResult> {
    let description = description.trim();
    if description.is_empty() {
        return Err(Error::validation("Description is required"));
    }
    let request = PanelRequest::AddFabricationRequest {
        description: description.to_string(),
    };
    Ok(send_request(state, request))
}

fn job_status(state: &PanelState, code: &str) -> Result<JobStatus> {
    let row = state
        .find_row(code)
        .ok_or_else(|| Error::validation(format!("No request '{}'", code)))?;
    let field = state.schema.status_field.as_deref().unwrap_or("status");
    let status = cell_text(row.get(field));
    JobStatus::parse(&status)
        .ok_or_else(|| Error::validation(format!("'{}' has unknown status '{}'", code, status)))
}

/// Only a job the host has not picked up yet can be cancelled
pub(crate) fn handle_cancel_fabrication(
    state: &mut PanelState,
    code: &str,
) -> Result<UpdateResult> {
    let status = job_status(state, code)?;
    if status != JobStatus::Queued {
        return Err(Error::validation(format!(
            "Only queued requests can be cancelled ({} is {})",
            code, status
        )));
    }
    let request = PanelRequest::CancelFabricationRequest {
        code: code.to_string(),
    };
    Ok(send_request(state, request))
}

pub(crate) fn handle_download(state: &mut PanelState, code: &str) -> Result<UpdateResult> {
    let status = job_status(state, code)?;
    if status != JobStatus::Completed {
        return Err(Error::validation(format!(
            "Results of {} are not ready ({})",
            code, status
        )));
    }
    if !state.operation.start(DOWNLOAD_OPERATION) {
        return Err(Error::validation("Another operation is still running"));
    }
    let request = PanelRequest::DownloadFabricationResults {
        code: code.to_string(),
    };
    Ok(send_request(state, request))
}

// ─────────────────────────────────────────────────────────
// Story mapping
// ─────────────────────────────────────────────────────────

/// Parse the story text into a suggestion. Nothing is sent.
pub(crate) fn handle_suggest_page(state: &mut PanelState, story_code: &str) -> Result<UpdateResult> {
    let row = state
        .find_row(story_code)
        .ok_or_else(|| Error::validation(format!("No story '{}'", story_code)))?;
    let parts = extract_story_parts(&cell_text(row.get(STORY_TEXT_FIELD)));
    let page_name = suggest_page_name(&parts);
    if page_name.is_empty() {
        state.set_notice(
            NoticeLevel::Info,
            format!("No page name could be suggested for {}", story_code),
        );
    }
    state.story = Some(StorySuggestion {
        story_code: story_code.to_string(),
        parts,
        page_name,
    });
    Ok(UpdateResult::none())
}

pub(crate) fn handle_confirm_mapping(
    state: &mut PanelState,
    page_name: Option<String>,
) -> Result<UpdateResult> {
    let suggestion = state
        .story
        .as_ref()
        .ok_or_else(|| Error::validation("No page suggestion to confirm"))?;
    let page_name = page_name
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| suggestion.page_name.clone());
    if page_name.is_empty() {
        return Err(Error::validation("Page name is required"));
    }
    if !is_pascal_case(&page_name) {
        return Err(Error::validation(format!(
            "Page name '{}' must be in PascalCase format",
            page_name
        )));
    }
    let request = PanelRequest::SaveStoryPageMapping {
        story_code: suggestion.story_code.clone(),
        page_name,
    };
    state.story = None;
    Ok(send_request(state, request))
}

// ─────────────────────────────────────────────────────────
// Timers
// ─────────────────────────────────────────────────────────

/// Re-request the current page while polling is armed
pub(crate) fn handle_refresh_tick(state: &mut PanelState) -> UpdateResult {
    if !state.refresh.is_armed() {
        return UpdateResult::none();
    }
    if state.flights.is_in_flight(&state.page_command()) {
        trace!("Skipping refresh: page request outstanding");
        return UpdateResult::none();
    }
    let request = state.page_request(state.pagination.page_number);
    send_request(state, request)
}

/// Turn requests that never got a reply into errors
pub(crate) fn handle_tick(state: &mut PanelState) -> UpdateResult {
    let Some(timeout) = state.request_timeout else {
        return UpdateResult::none();
    };
    for (command, age) in state.flights.expire(timeout) {
        let message = Error::timeout(&command, age.as_millis() as u64).to_string();

        if state.is_data_command(&command) && state.load == LoadState::Loading {
            state.load = LoadState::Failed(message.clone());
        }
        if state.operation.operation() == Some(command.as_str()) {
            state.operation.fail(&command, message.clone());
        }
        if command == "validateName" {
            state.name_form.checking = None;
            if state.name_form.validation == NameValidation::Pending {
                state.name_form.validation = NameValidation::Idle;
            }
        }
        state.set_notice(NoticeLevel::Error, message);
    }
    UpdateResult::none()
}

pub(crate) fn handle_evaluate_refresh(state: &mut PanelState) -> UpdateResult {
    let pending = state.has_pending_jobs();
    match state.refresh.evaluate(pending) {
        RefreshDecision::Arm => UpdateResult::action(UpdateAction::StartRefreshTimer {
            interval: state.refresh.interval(),
        }),
        RefreshDecision::Disarm => UpdateResult::action(UpdateAction::StopRefreshTimer),
        RefreshDecision::Unchanged => UpdateResult::none(),
    }
}
