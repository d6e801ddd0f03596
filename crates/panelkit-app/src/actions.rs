//! Action handlers: UpdateAction dispatch and timer tasks

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use panelkit_core::prelude::*;
use panelkit_core::PanelRequest;
use panelkit_host::CommandSender;

use crate::handler::UpdateAction;
use crate::message::Message;
use crate::state::{LoadState, NoticeLevel, PanelState};

/// Handles the event loop needs to carry out actions
pub struct ActionContext<'a> {
    pub msg_tx: &'a mpsc::Sender<Message>,
    pub commands: &'a CommandSender,
    pub refresh_task: &'a mut Option<JoinHandle<()>>,
}

/// Execute an action. Returns the request when one was put on the channel.
pub fn handle_action(
    action: UpdateAction,
    state: &mut PanelState,
    ctx: &mut ActionContext<'_>,
) -> Option<PanelRequest> {
    match action {
        UpdateAction::Send(request) => match ctx.commands.try_send(&request) {
            Ok(()) => Some(request),
            Err(e) => {
                // Never answered; release the command so the control works again
                let command = request.command();
                error!("Failed to send '{}': {}", command, e);
                let message = format!("Could not reach host: {}", e);
                if let Some(next) = state.flights.settle(&command) {
                    warn!("Dropping queued '{}': host is unreachable", next.command());
                    state.flights.settle(&command);
                }
                if state.is_data_command(&command) && state.load == LoadState::Loading {
                    state.load = LoadState::Failed(message.clone());
                }
                if state.operation.operation() == Some(command.as_str()) {
                    state.operation.fail(&command, message.clone());
                }
                state.set_notice(NoticeLevel::Error, message);
                None
            }
        },

        UpdateAction::StartRefreshTimer { interval } => {
            stop_refresh_timer(ctx.refresh_task);
            debug!("Polling every {:?}", interval);
            *ctx.refresh_task = Some(spawn_refresh_timer(interval, ctx.msg_tx.clone()));
            None
        }

        UpdateAction::StopRefreshTimer => {
            stop_refresh_timer(ctx.refresh_task);
            None
        }
    }
}

fn stop_refresh_timer(task: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = task.take() {
        debug!("Polling stopped");
        handle.abort();
    }
}

/// Send `msg` every `interval` until the receiver goes away
pub(crate) fn spawn_interval(
    interval: Duration,
    msg_tx: mpsc::Sender<Message>,
    msg: Message,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if msg_tx.send(msg.clone()).await.is_err() {
                break;
            }
        }
    })
}

fn spawn_refresh_timer(interval: Duration, msg_tx: mpsc::Sender<Message>) -> JoinHandle<()> {
    spawn_interval(interval, msg_tx, Message::RefreshTick)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::view::ViewSchema;

    fn state() -> PanelState {
        PanelState::new(ViewSchema::builtin("Pages").unwrap(), &Settings::default())
    }

    #[tokio::test]
    async fn test_send_puts_one_line_on_channel() {
        let (commands, mut rx) = CommandSender::new_for_test();
        let (msg_tx, _msg_rx) = mpsc::channel(8);
        let mut refresh_task = None;
        let mut ctx = ActionContext {
            msg_tx: &msg_tx,
            commands: &commands,
            refresh_task: &mut refresh_task,
        };
        let mut state = state();
        let request = state.page_request(1);

        let sent = handle_action(UpdateAction::Send(request.clone()), &mut state, &mut ctx);
        assert_eq!(sent, Some(request));
        assert!(rx.recv().await.unwrap().contains("requestPagesPage"));
    }

    #[tokio::test]
    async fn test_failed_send_releases_command() {
        let (commands, rx) = CommandSender::new_for_test();
        drop(rx);
        let (msg_tx, _msg_rx) = mpsc::channel(8);
        let mut refresh_task = None;
        let mut ctx = ActionContext {
            msg_tx: &msg_tx,
            commands: &commands,
            refresh_task: &mut refresh_task,
        };
        let mut state = state();
        let request = state.page_request(1);
        state
            .flights
            .begin(&request, panelkit_host::FlightPolicy::Suppress);

        assert_eq!(handle_action(UpdateAction::Send(request), &mut state, &mut ctx), None);
        assert_eq!(state.flights.in_flight_count(), 0);
        assert!(state.notice.is_some());
    }

    #[tokio::test]
    async fn test_failed_send_drops_queued_follow_up() {
        let (commands, rx) = CommandSender::new_for_test();
        drop(rx);
        let (msg_tx, _msg_rx) = mpsc::channel(8);
        let mut refresh_task = None;
        let mut ctx = ActionContext {
            msg_tx: &msg_tx,
            commands: &commands,
            refresh_task: &mut refresh_task,
        };
        let mut state = state();
        let first = state.page_request(1);
        let queued = state.page_request(2);
        state
            .flights
            .begin(&first, panelkit_host::FlightPolicy::QueueLatest);
        state
            .flights
            .begin(&queued, panelkit_host::FlightPolicy::QueueLatest);

        assert_eq!(handle_action(UpdateAction::Send(first), &mut state, &mut ctx), None);
        assert_eq!(state.flights.in_flight_count(), 0);
        assert_eq!(state.flights.settle("requestPagesPage"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_timer_ticks_until_stopped() {
        let (commands, _rx) = CommandSender::new_for_test();
        let (msg_tx, mut msg_rx) = mpsc::channel(8);
        let mut refresh_task = None;
        let mut state = state();

        let mut ctx = ActionContext {
            msg_tx: &msg_tx,
            commands: &commands,
            refresh_task: &mut refresh_task,
        };
        handle_action(
            UpdateAction::StartRefreshTimer {
                interval: Duration::from_millis(100),
            },
            &mut state,
            &mut ctx,
        );
        assert_eq!(msg_rx.recv().await, Some(Message::RefreshTick));

        handle_action(UpdateAction::StopRefreshTimer, &mut state, &mut ctx);
        assert!(ctx.refresh_task.is_none());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(msg_rx.try_recv().is_err());
    }
}
