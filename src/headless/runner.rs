//! Headless mode runner - one panel against the reference host
//!
//! The host runs as its own task on the far side of a pair of line channels,
//! exactly as a real host would. Stdin carries user actions as JSON objects,
//! e.g. `{"action":"sort","column":"Name"}` or `{"action":"quit"}`.

use std::path::Path;

use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use panelkit_app::{Engine, EngineEvent, Message};
use panelkit_core::prelude::*;
use panelkit_core::{ChangeRequestAction, Item};
use panelkit_host::{
    dispatch_request, parse_panel_request, ChangeRequestStore, EventSender, MemoryHost,
};

use super::HeadlessEvent;

const FIXTURE_FILENAME: &str = "host.json";
const CHANGE_REQUEST_DIR: &str = "change_requests";

/// Run in headless mode - output NDJSON events for one panel
pub async fn run_headless(project_path: &Path, view: &str) -> Result<()> {
    info!("═══════════════════════════════════════════════════════");
    info!("panelkit starting in HEADLESS mode");
    info!("Project: {}", project_path.display());
    info!("View: {}", view);
    info!("═══════════════════════════════════════════════════════");

    let (outbound_tx, outbound_rx) = mpsc::channel::<String>(256);
    let (inbound_tx, inbound_rx) = mpsc::channel::<String>(256);

    let mut engine = match Engine::for_project(project_path, view, outbound_tx) {
        Ok(engine) => engine,
        Err(e) => {
            HeadlessEvent::error(e.to_string(), true).emit();
            return Err(e);
        }
    };

    let host = load_host(project_path)?;
    let host_task = spawn_host(host, outbound_rx, inbound_tx);

    let stdin_tx = engine.msg_sender();
    std::thread::spawn(move || {
        spawn_stdin_reader_blocking(stdin_tx);
    });

    let mut events = engine.subscribe();
    HeadlessEvent::panel_opened(view).emit();
    engine.start(inbound_rx);
    emit_engine_events(&engine, &mut events);

    headless_event_loop(&mut engine, &mut events).await;

    engine.shutdown();
    emit_engine_events(&engine, &mut events);
    host_task.abort();

    info!("panelkit headless mode exiting");
    Ok(())
}

/// Process messages until the panel closes
async fn headless_event_loop(engine: &mut Engine, events: &mut broadcast::Receiver<EngineEvent>) {
    while engine.is_open() {
        match engine.msg_rx.recv().await {
            Some(msg) => {
                engine.process_message(msg);
                emit_engine_events(engine, events);
            }
            None => {
                info!("Message channel closed");
                break;
            }
        }
    }
}

fn emit_engine_events(engine: &Engine, events: &mut broadcast::Receiver<EngineEvent>) {
    loop {
        match events.try_recv() {
            Ok(EngineEvent::DataChanged {
                view,
                records_total,
                ..
            }) => HeadlessEvent::data(&view, &engine.table(), records_total).emit(),
            Ok(event) => {
                if let Some(headless) = HeadlessEvent::from_engine(&event) {
                    headless.emit();
                }
            }
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                warn!("Headless output skipped {} engine events", n);
            }
            Err(_) => break,
        }
    }
}

// ─────────────────────────────────────────────────────────
// Host side
// ─────────────────────────────────────────────────────────

/// Seed data for the reference host, read from `.panelkit/host.json`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HostFixture {
    model: serde_json::Value,
    datasets: std::collections::HashMap<String, Vec<Item>>,
}

/// Build the reference host from the project's fixture file
///
/// Without a fixture the host starts with an empty model and no datasets.
fn load_host(project_path: &Path) -> Result<MemoryHost> {
    let dir = project_path.join(".panelkit");
    let fixture_path = dir.join(FIXTURE_FILENAME);

    let fixture = if fixture_path.exists() {
        let content = std::fs::read_to_string(&fixture_path)
            .with_context(|| format!("Failed to read {}", fixture_path.display()))?;
        serde_json::from_str::<HostFixture>(&content).map_err(|e| {
            Error::config(format!("Invalid {}: {}", fixture_path.display(), e))
        })?
    } else {
        info!("No host fixture at {:?}, starting empty", fixture_path);
        HostFixture::default()
    };

    let store = ChangeRequestStore::new(dir.join(CHANGE_REQUEST_DIR));
    let mut host = MemoryHost::new().with_store(store);
    if !fixture.model.is_null() {
        host = host.with_model(fixture.model);
    }
    for (view, items) in fixture.datasets {
        host = host.with_dataset(view, items);
    }
    Ok(host)
}

/// Answer panel requests until either side hangs up
fn spawn_host(
    mut host: MemoryHost,
    mut outbound: mpsc::Receiver<String>,
    inbound: mpsc::Sender<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let sender = EventSender::new(inbound);
        while let Some(line) = outbound.recv().await {
            let request = match parse_panel_request(&line) {
                Ok(request) => request,
                Err(e) => {
                    warn!("Host dropped unreadable request: {}", e);
                    continue;
                }
            };
            let events = dispatch_request(&mut host, request).await;
            if sender.send_all(&events).await.is_err() {
                break;
            }
        }
        info!("Host task exiting");
    })
}

// ─────────────────────────────────────────────────────────
// Stdin
// ─────────────────────────────────────────────────────────

/// A user action read from stdin
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum UserCommand {
    Filter { column: String, needle: String },
    ClearFilter,
    Sort { column: String },
    Page { number: u32 },
    Next,
    Prev,
    Select { key: String },
    Name { value: String },
    Submit,
    Review {
        decision: ChangeRequestAction,
        code: String,
        #[serde(default)]
        reason: Option<String>,
    },
    ApplyAll { request_code: String },
    Export,
    AddFabrication { description: String },
    Cancel { code: String },
    Download { code: String },
    Suggest { story_code: String },
    Confirm {
        #[serde(default)]
        page_name: Option<String>,
    },
    Discard,
    Dismiss,
    Quit,
}

impl From<UserCommand> for Message {
    fn from(command: UserCommand) -> Self {
        match command {
            UserCommand::Filter { column, needle } => Message::ApplyFilter { column, needle },
            UserCommand::ClearFilter => Message::ClearFilter,
            UserCommand::Sort { column } => Message::Sort { column },
            UserCommand::Page { number } => Message::SetPage(number),
            UserCommand::Next => Message::NextPage,
            UserCommand::Prev => Message::PrevPage,
            UserCommand::Select { key } => Message::ToggleSelect(key),
            UserCommand::Name { value } => Message::NameInput(value),
            UserCommand::Submit => Message::SubmitName,
            UserCommand::Review {
                decision,
                code,
                reason,
            } => Message::ReviewChangeRequest {
                action: decision,
                code,
                reason,
            },
            UserCommand::ApplyAll { request_code } => {
                Message::ApplyAllChangeRequests { request_code }
            }
            UserCommand::Export => Message::ExportCsv,
            UserCommand::AddFabrication { description } => {
                Message::AddFabricationRequest { description }
            }
            UserCommand::Cancel { code } => Message::CancelFabrication { code },
            UserCommand::Download { code } => Message::DownloadResults { code },
            UserCommand::Suggest { story_code } => Message::SuggestPageForStory { story_code },
            UserCommand::Confirm { page_name } => Message::ConfirmStoryMapping { page_name },
            UserCommand::Discard => Message::DiscardStorySuggestion,
            UserCommand::Dismiss => Message::DismissNotice,
            UserCommand::Quit => Message::Teardown,
        }
    }
}

fn parse_user_command(line: &str) -> Result<UserCommand> {
    serde_json::from_str(line).map_err(|e| Error::protocol(format!("bad stdin command: {}", e)))
}

/// Read user actions from stdin and forward them to the engine (blocking)
fn spawn_stdin_reader_blocking(msg_tx: mpsc::Sender<Message>) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    let reader = stdin.lock();

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match parse_user_command(trimmed) {
            Ok(command) => {
                let quit = matches!(command, UserCommand::Quit);
                if msg_tx.blocking_send(command.into()).is_err() || quit {
                    break;
                }
            }
            Err(e) => {
                warn!("{}", e);
                HeadlessEvent::error(e.to_string(), false).emit();
            }
        }
    }

    info!("Stdin reader exiting");
}
