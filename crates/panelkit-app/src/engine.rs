//! Engine - owns one panel and drives it from host lines, user messages
//! and timers

use std::path::Path;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use panelkit_core::prelude::*;

use crate::actions::{spawn_interval, ActionContext};
use crate::config::{self, Settings};
use crate::engine_event::EngineEvent;
use crate::message::Message;
use crate::process;
use crate::progress::OperationState;
use crate::render::{render_html, render_table, TableView};
use crate::state::{LoadState, Notice, PanelState};
use crate::view::ViewSchema;
use panelkit_host::CommandSender;

/// Housekeeping interval for request timeouts
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Lightweight snapshot of state for change detection.
///
/// Captured before message processing, compared after to detect
/// what changed and emit appropriate EngineEvents.
#[derive(Debug, Clone, PartialEq)]
struct StateSnapshot {
    load: LoadState,
    rows: usize,
    records_total: u64,
    page_number: u32,
    notice: Option<Notice>,
    operation: OperationState,
    polling: bool,
    open: bool,
}

impl StateSnapshot {
    fn capture(state: &PanelState) -> Self {
        Self {
            load: state.load.clone(),
            rows: state.visible.len(),
            records_total: state.pagination.records_total,
            page_number: state.pagination.page_number,
            notice: state.notice.clone(),
            operation: state.operation.state().clone(),
            polling: state.refresh.is_armed(),
            open: state.is_open(),
        }
    }
}

/// Orchestration engine for a single panel.
pub struct Engine {
    /// Panel state (the Model)
    pub state: PanelState,

    /// Sender half of the message channel. Clone this for input sources.
    pub msg_tx: mpsc::Sender<Message>,

    /// Receiver half of the message channel.
    pub msg_rx: mpsc::Receiver<Message>,

    commands: CommandSender,

    refresh_task: Option<JoinHandle<()>>,
    tick_task: Option<JoinHandle<()>>,
    inbound_task: Option<JoinHandle<()>>,

    event_tx: broadcast::Sender<EngineEvent>,
}

impl Engine {
    /// Create an engine for `schema`; encoded requests go to `outbound`
    pub fn new(schema: ViewSchema, settings: &Settings, outbound: mpsc::Sender<String>) -> Self {
        let state = PanelState::new(schema, settings);
        let (msg_tx, msg_rx) = mpsc::channel::<Message>(256);
        let (event_tx, _) = broadcast::channel(256);

        Self {
            state,
            msg_tx,
            msg_rx,
            commands: CommandSender::new(outbound),
            refresh_task: None,
            tick_task: None,
            inbound_task: None,
            event_tx,
        }
    }

    /// Create an engine for a built-in view using the project's settings
    ///
    /// Initializes `.panelkit/` (non-fatal if it fails).
    pub fn for_project(
        project_path: &Path,
        view: &str,
        outbound: mpsc::Sender<String>,
    ) -> Result<Self> {
        if let Err(e) = config::init_config_dir(project_path) {
            warn!("Failed to initialize .panelkit directory: {}", e);
        }
        let settings = config::load_settings(project_path);
        let schema = ViewSchema::builtin(view)?;
        Ok(Self::new(schema, &settings, outbound))
    }

    /// Subscribe to engine events.
    ///
    /// If the subscriber falls behind, older events are dropped.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    pub fn msg_sender(&self) -> mpsc::Sender<Message> {
        self.msg_tx.clone()
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Process a single message through the TEA update cycle.
    pub fn process_message(&mut self, msg: Message) {
        let pre = StateSnapshot::capture(&self.state);

        let mut ctx = ActionContext {
            msg_tx: &self.msg_tx,
            commands: &self.commands,
            refresh_task: &mut self.refresh_task,
        };
        let sent = process::process_message(&mut self.state, msg, &mut ctx);

        for request in sent {
            self.emit(EngineEvent::RequestSent {
                command: request.command(),
                summary: request.summary(),
            });
        }

        let post = StateSnapshot::capture(&self.state);
        self.emit_events(&pre, &post);
    }

    /// Feed one raw line from the host
    pub fn deliver_line(&mut self, line: &str) {
        self.process_message(Message::HostLine(line.to_string()));
    }

    /// Drain and process all pending messages from the channel.
    pub fn drain_pending_messages(&mut self) -> usize {
        let mut count = 0;
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.process_message(msg);
            count += 1;
        }
        count
    }

    pub fn table(&self) -> TableView {
        render_table(&self.state)
    }

    pub fn render(&self) -> String {
        render_html(&self.state)
    }

    /// Open the panel and start forwarding host lines and timer ticks
    ///
    /// When `inbound` closes the panel is torn down.
    pub fn start(&mut self, inbound: mpsc::Receiver<String>) {
        self.inbound_task = Some(spawn_line_bridge(inbound, self.msg_tx.clone()));
        if self.state.request_timeout.is_some() {
            self.tick_task = Some(spawn_interval(
                TICK_INTERVAL,
                self.msg_tx.clone(),
                Message::Tick,
            ));
        }
        self.process_message(Message::Open);
    }

    /// Process messages until the panel is closed
    pub async fn run(&mut self) {
        while self.is_open() {
            match self.msg_rx.recv().await {
                Some(msg) => self.process_message(msg),
                None => break,
            }
        }
        info!("Panel '{}' closed", self.state.schema.name);
    }

    /// Tear the panel down and stop every background task
    pub fn shutdown(&mut self) {
        if self.is_open() {
            self.process_message(Message::Teardown);
        }
        for task in [
            self.refresh_task.take(),
            self.tick_task.take(),
            self.inbound_task.take(),
        ]
        .into_iter()
        .flatten()
        {
            task.abort();
        }
        self.emit(EngineEvent::Shutdown);
    }

    fn emit_events(&self, pre: &StateSnapshot, post: &StateSnapshot) {
        let view = &self.state.schema.name;

        if pre.load != post.load {
            self.emit(EngineEvent::LoadChanged {
                view: view.clone(),
                load: post.load.clone(),
            });
        }

        if (pre.rows, pre.records_total, pre.page_number)
            != (post.rows, post.records_total, post.page_number)
        {
            self.emit(EngineEvent::DataChanged {
                view: view.clone(),
                rows: post.rows,
                records_total: post.records_total,
                page_number: post.page_number,
            });
        }

        if pre.notice != post.notice {
            if let Some(notice) = &post.notice {
                self.emit(EngineEvent::NoticeShown(notice.clone()));
            }
        }

        if pre.operation != post.operation {
            if let Some(operation) = self.state.operation.operation() {
                self.emit(EngineEvent::OperationChanged {
                    operation: operation.to_string(),
                    state: post.operation.clone(),
                });
            }
        }

        if pre.polling != post.polling {
            self.emit(EngineEvent::PollingChanged {
                active: post.polling,
            });
        }

        if pre.open && !post.open {
            self.emit(EngineEvent::Closed { view: view.clone() });
        }
    }

    /// Emit a single EngineEvent to all subscribers.
    ///
    /// send() returns Err only if there are no receivers, which is fine.
    fn emit(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        for task in [&self.refresh_task, &self.tick_task, &self.inbound_task]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
    }
}

/// Forward host lines into the message channel; a closed host closes the panel
fn spawn_line_bridge(
    mut inbound: mpsc::Receiver<String>,
    msg_tx: mpsc::Sender<Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(line) = inbound.recv().await {
            if msg_tx.send(Message::HostLine(line)).await.is_err() {
                return;
            }
        }
        debug!("Host channel closed");
        let _ = msg_tx.send(Message::Teardown).await;
    })
}
