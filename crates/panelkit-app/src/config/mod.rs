//! Configuration file parsing for panelkit
//!
//! Supports `.panelkit/config.toml` with request timeouts, the auto-refresh
//! interval and per-view page sizes.

pub mod settings;
pub mod types;

pub use settings::{init_config_dir, load_settings, save_settings};
pub use types::*;
