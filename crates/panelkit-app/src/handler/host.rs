//! Inbound host event handling

use panelkit_core::prelude::*;
use panelkit_core::{HostEvent, PanelRequest};
use panelkit_host::parse_host_event;

use super::send::{send_request, settle};
use super::{UpdateAction, UpdateResult};
use crate::message::Message;
use crate::state::{CsvExport, LoadState, NameValidation, NoticeLevel, PanelState};

const VALIDATE_NAME: &str = "validateName";
const EXPORT_CSV: &str = "exportToCSV";

/// Parse one raw line. Anything that does not parse as a panel-bound
/// envelope is logged and dropped.
pub(crate) fn handle_line(line: &str) -> UpdateResult {
    match parse_host_event(line) {
        Ok(event) => UpdateResult::message(Message::Host(event)),
        Err(e) => {
            warn!("Discarding inbound line: {}", e);
            UpdateResult::none()
        }
    }
}

pub(crate) fn handle_event(state: &mut PanelState, event: HostEvent) -> UpdateResult {
    trace!("← host: {}", event.summary());
    match event {
        HostEvent::SetData {
            view,
            items,
            records_total,
            page_number,
            page_size,
        } => {
            if view != state.schema.name {
                debug!("Ignoring data for '{}' in '{}' panel", view, state.schema.name);
                return UpdateResult::none();
            }
            let ready = state.ready_command();
            let answers_ready = state.flights.is_in_flight(&ready);
            state.apply_dataset(items, records_total, page_number, page_size);
            settle(state, &ready);

            let page = state.page_command();
            let mut action = settle(state, &page);
            // The first dataset comes in the host's default page size
            if answers_ready && action.is_none() && state.pagination.page_size != state.page_size
            {
                debug!(
                    "Re-requesting page 1 of '{}' at {} rows per page",
                    state.schema.name, state.page_size
                );
                let request = state.page_request(1);
                action = send_request(state, request).action;
            }
            UpdateResult {
                message: Some(Message::EvaluateRefresh),
                action,
            }
        }

        HostEvent::OperationComplete {
            operation: Some(operation),
        } => {
            if operation == state.add_command()
                && state.name_form.validation == NameValidation::Valid
            {
                state.name_form.clear();
            }
            let action = settle(state, &operation);
            if operation == VALIDATE_NAME {
                track_follow_up_check(state, &action);
            }
            UpdateResult {
                message: None,
                action,
            }
        }

        HostEvent::OperationComplete { operation: None } => {
            // Untagged completion: settle everything not answered by a
            // dataset or a verdict
            for command in state.flights.in_flight_commands() {
                if state.is_data_command(&command) || command == VALIDATE_NAME {
                    continue;
                }
                if let Some(next) = state.flights.settle(&command) {
                    warn!("Dropping queued '{}' after untagged completion", next.command());
                    state.flights.settle(&command);
                }
            }
            UpdateResult::none()
        }

        HostEvent::CsvExportReady {
            csv_content,
            filename,
        } => {
            let action = settle(state, EXPORT_CSV);
            state.set_notice(NoticeLevel::Success, format!("Exported {}", filename));
            state.last_export = Some(CsvExport {
                filename,
                content: csv_content,
            });
            UpdateResult {
                message: None,
                action,
            }
        }

        HostEvent::Progress {
            operation,
            phase,
            percent,
            step,
        } => {
            state.operation.progress(&operation, &phase, percent, &step);
            UpdateResult::none()
        }

        HostEvent::Completed { operation, message } => {
            let text = message
                .clone()
                .unwrap_or_else(|| format!("{} completed", operation));
            state.operation.complete(&operation, message);
            state.set_notice(NoticeLevel::Success, text);
            UpdateResult {
                message: None,
                action: settle(state, &operation),
            }
        }

        HostEvent::Error { operation, message } => {
            handle_operation_error(state, &operation, message)
        }

        HostEvent::ModelValidationSetError { message } => {
            state.name_form.validation = NameValidation::Rejected(message.clone());
            state.set_notice(NoticeLevel::Error, message);
            UpdateResult::none()
        }

        HostEvent::NameValidation { is_valid, message } => {
            let action = settle(state, VALIDATE_NAME);
            let checked = state.name_form.checking.take();
            if checked.as_deref() == Some(state.name_form.input.as_str()) {
                state.name_form.validation = if is_valid {
                    NameValidation::Valid
                } else {
                    NameValidation::Rejected(message)
                };
            } else {
                debug!("Ignoring verdict for {:?}: input has changed", checked);
            }
            track_follow_up_check(state, &action);
            UpdateResult {
                message: None,
                action,
            }
        }

        HostEvent::ChangeRequestConflict { code, reason } => {
            state.set_notice(NoticeLevel::Warning, format!("{}: {}", code, reason));
            UpdateResult::none()
        }

        HostEvent::Unknown { command, .. } => {
            warn!("Unhandled host command '{}'", command);
            UpdateResult::none()
        }
    }
}

/// `<x>Error`: show the message verbatim and restore the affected controls.
/// Held data stays as it was.
/// The command stays in flight until its `operationComplete`.
fn handle_operation_error(
    state: &mut PanelState,
    operation: &str,
    message: String,
) -> UpdateResult {
    if state.is_data_command(operation) && state.load == LoadState::Loading {
        state.load = LoadState::Failed(message.clone());
    }
    if state.operation.operation() == Some(operation) {
        state.operation.fail(operation, message.clone());
    }
    if operation == VALIDATE_NAME
        && state.name_form.checking.take().as_deref() == Some(state.name_form.input.as_str())
    {
        state.name_form.validation = NameValidation::Rejected(message.clone());
    }

    state.set_notice(NoticeLevel::Error, message);
    UpdateResult::none()
}

/// A queued name check just went out; its verdict is the one to wait for
fn track_follow_up_check(state: &mut PanelState, action: &Option<UpdateAction>) {
    if let Some(UpdateAction::Send(PanelRequest::ValidateName { value, .. })) = action {
        state.name_form.checking = Some(value.clone());
    }
}
