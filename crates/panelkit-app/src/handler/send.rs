//! Single-flight gate for outbound requests

use panelkit_core::prelude::*;
use panelkit_core::PanelRequest;
use panelkit_host::{Begin, FlightPolicy};

use super::{UpdateAction, UpdateResult};
use crate::state::PanelState;

/// Page requests and name checks keep only the newest follow-up; a second
/// click on anything else is dropped.
pub(crate) fn policy_for(request: &PanelRequest) -> FlightPolicy {
    match request {
        PanelRequest::RequestPage { .. } | PanelRequest::ValidateName { .. } => {
            FlightPolicy::QueueLatest
        }
        _ => FlightPolicy::Suppress,
    }
}

/// Register `request` and hand it to the event loop if nothing of the same
/// command is outstanding
pub(crate) fn send_request(state: &mut PanelState, request: PanelRequest) -> UpdateResult {
    match state.flights.begin(&request, policy_for(&request)) {
        Begin::Dispatch => UpdateResult::action(dispatch(state, request)),
        Begin::Queued => UpdateResult::none(),
        Begin::Suppressed => {
            debug!("Dropped '{}' while awaiting its reply", request.command());
            UpdateResult::none()
        }
    }
}

/// Mark `command` answered; returns the send action for its queued follow-up
pub(crate) fn settle(state: &mut PanelState, command: &str) -> Option<UpdateAction> {
    let next = state.flights.settle(command)?;
    Some(dispatch(state, next))
}

fn dispatch(state: &mut PanelState, request: PanelRequest) -> UpdateAction {
    if request.is_mutating() {
        state.cache_stale = true;
    }
    UpdateAction::Send(request)
}
