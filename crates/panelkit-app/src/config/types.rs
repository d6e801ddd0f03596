//! Configuration types

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Contents of `.panelkit/config.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub behavior: BehaviorSettings,

    /// Per-view overrides keyed by view name (`[views.DataObjects]`)
    #[serde(default)]
    pub views: BTreeMap<String, ViewSettings>,
}

impl Settings {
    /// Page size for a view: its override, else the default
    pub fn page_size_for(&self, view: &str) -> u32 {
        self.view_override(view)
            .unwrap_or(self.behavior.default_page_size.max(1))
    }

    /// Explicit non-zero page size configured for a view
    pub fn view_override(&self, view: &str) -> Option<u32> {
        self.views
            .get(view)
            .and_then(|v| v.page_size)
            .filter(|size| *size > 0)
    }
}

/// Behavior settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BehaviorSettings {
    /// How long a request may go unanswered before it is reported as failed.
    /// `0` waits forever.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Polling interval while tracked jobs are still running
    #[serde(default = "default_auto_refresh_ms")]
    pub auto_refresh_ms: u64,

    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
}

impl BehaviorSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }

    pub fn auto_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.auto_refresh_ms.max(100))
    }
}

impl Default for BehaviorSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            auto_refresh_ms: default_auto_refresh_ms(),
            default_page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ViewSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_auto_refresh_ms() -> u64 {
    5_000
}

fn default_page_size() -> u32 {
    10
}
