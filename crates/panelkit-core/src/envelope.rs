//! The tagged message unit exchanged between a panel and its host
//!
//! On the wire an envelope is a flat JSON object: `{ "command": ..., ...payload }`.
//! There is no version field; the command string doubles as the schema version.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Which side of the channel a command is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Sent by a panel, handled by the host
    ToHost,
    /// Sent by the host, handled by a panel
    ToPanel,
}

impl Direction {
    pub fn label(&self) -> &'static str {
        match self {
            Direction::ToHost => "host-bound",
            Direction::ToPanel => "panel-bound",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ─────────────────────────────────────────────────────────
// Command Namespaces
// ─────────────────────────────────────────────────────────

/// Fixed host-bound command names
pub const HOST_COMMANDS: &[&str] = &[
    "approveChangeRequest",
    "rejectChangeRequest",
    "applyChangeRequest",
    "applyAllChangeRequests",
    "exportToCSV",
    "validateName",
    "addFabricationRequest",
    "cancelFabricationRequest",
    "downloadFabricationResults",
    "saveUserStoryPageMapping",
];

/// Fixed panel-bound command names
pub const PANEL_COMMANDS: &[&str] = &[
    "operationComplete",
    "csvExportReady",
    "modelValidationSetError",
    "nameValidation",
    "changeRequestConflict",
];

static WEBVIEW_READY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z][A-Za-z0-9]*)WebviewReady$").expect("valid regex"));

static REQUEST_PAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^request([A-Z][A-Za-z0-9]*)Page$").expect("valid regex"));

static ADD_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^add([A-Z][A-Za-z0-9]*)Item$").expect("valid regex"));

static SET_DATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^set([A-Z][A-Za-z0-9]*)Data$").expect("valid regex"));

static OPERATION_EVENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z][A-Za-z0-9]*?)(Progress|Completed|Error)$").expect("valid regex")
});

/// Command patterns with a captured view or operation name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandPattern<'a> {
    WebviewReady { view: String },
    RequestPage { view: &'a str },
    AddItem { view: &'a str },
    SetData { view: &'a str },
    Progress { operation: &'a str },
    Completed { operation: &'a str },
    Error { operation: &'a str },
}

/// Match a command string against the parameterized catalog patterns
pub fn match_pattern(command: &str) -> Option<CommandPattern<'_>> {
    if let Some(caps) = WEBVIEW_READY.captures(command) {
        let prefix = caps.get(1)?.as_str();
        return Some(CommandPattern::WebviewReady {
            view: view_from_prefix(prefix),
        });
    }
    if let Some(caps) = REQUEST_PAGE.captures(command) {
        return Some(CommandPattern::RequestPage {
            view: caps.get(1)?.as_str(),
        });
    }
    if let Some(caps) = ADD_ITEM.captures(command) {
        return Some(CommandPattern::AddItem {
            view: caps.get(1)?.as_str(),
        });
    }
    if let Some(caps) = SET_DATA.captures(command) {
        return Some(CommandPattern::SetData {
            view: caps.get(1)?.as_str(),
        });
    }
    if let Some(caps) = OPERATION_EVENT.captures(command) {
        let operation = caps.get(1)?.as_str();
        return match caps.get(2)?.as_str() {
            "Progress" => Some(CommandPattern::Progress { operation }),
            "Completed" => Some(CommandPattern::Completed { operation }),
            _ => Some(CommandPattern::Error { operation }),
        };
    }
    None
}

/// Decide which namespace a command belongs to
///
/// Returns `None` for strings that match neither catalog.
pub fn classify_command(command: &str) -> Option<Direction> {
    if HOST_COMMANDS.contains(&command) {
        return Some(Direction::ToHost);
    }
    if PANEL_COMMANDS.contains(&command) {
        return Some(Direction::ToPanel);
    }
    match match_pattern(command)? {
        CommandPattern::WebviewReady { .. }
        | CommandPattern::RequestPage { .. }
        | CommandPattern::AddItem { .. } => Some(Direction::ToHost),
        CommandPattern::SetData { .. }
        | CommandPattern::Progress { .. }
        | CommandPattern::Completed { .. }
        | CommandPattern::Error { .. } => Some(Direction::ToPanel),
    }
}

/// `DataObjects` -> `dataObjects`
pub fn view_prefix(view: &str) -> String {
    let mut chars = view.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `dataObjects` -> `DataObjects`
pub fn view_from_prefix(prefix: &str) -> String {
    let mut chars = prefix.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ─────────────────────────────────────────────────────────
// Envelope
// ─────────────────────────────────────────────────────────

/// A command tag plus its payload fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub command: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Envelope {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            payload: Map::new(),
        }
    }

    /// Builder-style payload field
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != "command" {
            self.payload.insert(key, value.into());
        }
        self
    }

    /// Parse a single JSON object into an envelope
    pub fn parse(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json.trim())?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut payload) = value else {
            return Err(Error::protocol("envelope is not a JSON object"));
        };
        let command = match payload.shift_remove("command") {
            Some(Value::String(command)) if !command.is_empty() => command,
            Some(_) => return Err(Error::protocol("'command' must be a non-empty string")),
            None => return Err(Error::protocol("envelope has no 'command' field")),
        };
        Ok(Self { command, payload })
    }

    /// Serialize to a single line of JSON
    pub fn to_json(&self) -> String {
        let mut object = Map::with_capacity(self.payload.len() + 1);
        object.insert("command".to_string(), Value::String(self.command.clone()));
        for (key, value) in &self.payload {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object).to_string()
    }

    pub fn direction(&self) -> Option<Direction> {
        classify_command(&self.command)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.payload.get(key).and_then(|v| match v {
            Value::Number(n) => n.as_u64(),
            // Some views send counters as strings
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.payload.get(key).and_then(Value::as_bool)
    }

    /// Required string field, or a payload error naming the command
    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.get_str(key)
            .ok_or_else(|| Error::payload(&self.command, format!("missing string field '{key}'")))
    }
}
