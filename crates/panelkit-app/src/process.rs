//! Message processing
//!
//! Runs the TEA update loop for one message and its follow-ups, dispatching
//! every resulting action.

use panelkit_core::PanelRequest;

use crate::actions::{handle_action, ActionContext};
use crate::handler;
use crate::message::Message;
use crate::state::PanelState;

/// Process a message through the TEA update function
///
/// Returns the requests that were put on the host channel, in order.
pub fn process_message(
    state: &mut PanelState,
    message: Message,
    ctx: &mut ActionContext<'_>,
) -> Vec<PanelRequest> {
    let mut sent = Vec::new();
    let mut msg = Some(message);
    while let Some(m) = msg {
        let result = handler::update(state, m);

        if let Some(action) = result.action {
            sent.extend(handle_action(action, state, ctx));
        }

        msg = result.message;
    }
    sent
}
