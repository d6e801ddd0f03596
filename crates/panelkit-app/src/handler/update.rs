//! Main update function - handles state transitions (TEA pattern)

use panelkit_core::prelude::*;

use super::{host, user, UpdateResult};
use crate::message::Message;
use crate::state::{NoticeLevel, PanelState};

/// Process a message and update state
/// Returns optional follow-up message and/or action
pub fn update(state: &mut PanelState, message: Message) -> UpdateResult {
    if !state.is_open() {
        trace!("Panel '{}' is closed, dropping {:?}", state.schema.name, message);
        return UpdateResult::none();
    }

    let outcome = match message {
        Message::HostLine(line) => Ok(host::handle_line(&line)),
        Message::Host(event) => Ok(host::handle_event(state, event)),

        Message::Open => Ok(user::handle_open(state)),
        Message::Teardown => Ok(user::handle_teardown(state)),

        // ─────────────────────────────────────────────────────────
        // Table
        // ─────────────────────────────────────────────────────────
        Message::ApplyFilter { column, needle } => {
            user::handle_apply_filter(state, &column, &needle)
        }
        Message::ClearFilter => Ok(user::handle_clear_filter(state)),
        Message::Sort { column } => user::handle_sort(state, &column),
        Message::SetPage(page) => Ok(user::handle_set_page(state, page)),
        Message::NextPage => Ok(user::handle_next_page(state)),
        Message::PrevPage => Ok(user::handle_prev_page(state)),
        Message::ToggleSelect(key) => user::handle_toggle_select(state, &key),

        // ─────────────────────────────────────────────────────────
        // Name entry
        // ─────────────────────────────────────────────────────────
        Message::NameInput(value) => user::handle_name_input(state, &value),
        Message::SubmitName => user::handle_submit_name(state),

        // ─────────────────────────────────────────────────────────
        // Host operations
        // ─────────────────────────────────────────────────────────
        Message::ReviewChangeRequest {
            action,
            code,
            reason,
        } => user::handle_review_change_request(state, action, &code, reason),
        Message::ApplyAllChangeRequests { request_code } => {
            user::handle_apply_all(state, &request_code)
        }
        Message::ExportCsv => Ok(user::handle_export_csv(state)),
        Message::AddFabricationRequest { description } => {
            user::handle_add_fabrication(state, &description)
        }
        Message::CancelFabrication { code } => user::handle_cancel_fabrication(state, &code),
        Message::DownloadResults { code } => user::handle_download(state, &code),

        // ─────────────────────────────────────────────────────────
        // Story mapping
        // ─────────────────────────────────────────────────────────
        Message::SuggestPageForStory { story_code } => {
            user::handle_suggest_page(state, &story_code)
        }
        Message::ConfirmStoryMapping { page_name } => {
            user::handle_confirm_mapping(state, page_name)
        }
        Message::DiscardStorySuggestion => {
            state.story = None;
            Ok(UpdateResult::none())
        }

        Message::DismissNotice => {
            state.notice = None;
            Ok(UpdateResult::none())
        }

        // ─────────────────────────────────────────────────────────
        // Timers
        // ─────────────────────────────────────────────────────────
        Message::RefreshTick => Ok(user::handle_refresh_tick(state)),
        Message::Tick => Ok(user::handle_tick(state)),
        Message::EvaluateRefresh => Ok(user::handle_evaluate_refresh(state)),
    };

    outcome.unwrap_or_else(|e| {
        if e.is_recoverable() {
            warn!("{}: {}", state.schema.name, e);
        } else {
            error!("{}: {}", state.schema.name, e);
        }
        state.set_notice(NoticeLevel::Error, e.to_string());
        UpdateResult::none()
    })
}
