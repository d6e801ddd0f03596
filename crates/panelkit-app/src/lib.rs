//! panelkit-app - Panel state and orchestration for panelkit
//!
//! This crate implements the TEA (The Elm Architecture) pattern for one
//! panel: a [`PanelState`] per open panel, configured by a declarative
//! [`ViewSchema`], updated only through [`handler::update`], rendered by pure
//! functions, and driven by the [`Engine`] event loop.

pub mod actions;
pub mod config;
pub mod engine;
pub mod engine_event;
pub mod handler;
pub mod message;
pub mod process;
pub mod progress;
pub mod refresh;
pub mod render;
pub mod state;
pub mod store;
pub mod view;

// Re-export primary types
pub use engine::Engine;
pub use engine_event::EngineEvent;
pub use handler::{UpdateAction, UpdateResult};
pub use message::Message;
pub use progress::{OperationState, OperationTracker};
pub use render::{render_html, render_table, TableBody, TableView};
pub use state::{LoadState, NameValidation, Notice, NoticeLevel, PanelPhase, PanelState};
pub use view::{ColumnDef, ColumnKind, SortAuthority, Validator, ViewSchema, BUILTIN_VIEWS};
