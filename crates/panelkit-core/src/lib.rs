//! # panelkit-core - Core Envelope and Domain Types
//!
//! Foundation crate for panelkit. Provides the message envelope, the typed
//! command catalog for both directions, domain records, error handling and
//! logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, chrono, thiserror, regex, tracing).
//!
//! ## Public API
//!
//! ### Envelope (`envelope`)
//! - [`Envelope`] - `{ command, ...payload }` message unit
//! - [`Direction`] - host-bound vs panel-bound namespace
//! - [`classify_command()`] - decide which namespace a command belongs to
//!
//! ### Command Catalog (`events`)
//! - [`PanelRequest`] - requests a panel sends to its host
//! - [`HostEvent`] - events a host delivers to a panel
//!
//! ### Domain Types (`types`)
//! - [`Item`], [`SortSpec`], [`PageRequest`], [`ChangeRequest`], [`JobStatus`]
//!
//! ### Helpers
//! - [`extraction`] - story sentence parsing into role/action/object suggestions
//! - [`cost`] - monthly cost aggregation for forecast charts
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! ```rust
//! use panelkit_core::prelude::*;
//! ```

pub mod cost;
pub mod envelope;
pub mod error;
pub mod events;
pub mod extraction;
pub mod logging;
pub mod types;

/// Prelude for common imports used throughout all panelkit crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

pub use cost::{aggregate_monthly, CostRecord, MonthlyCostChart, YearMonth};
pub use envelope::{classify_command, match_pattern, CommandPattern, Direction, Envelope};
pub use error::{Error, Result, ResultExt};
pub use events::{HostEvent, PanelRequest};
pub use extraction::{
    extract_story_parts, is_pascal_case, suggest_page_name, to_pascal_case, StoryParts,
};
pub use types::{
    cell_number, cell_text, compare_cells, total_pages, ChangeRequest, ChangeRequestAction, Item,
    JobStatus, PageRequest, SortDirection, SortSpec, STALE_DATA_REASON,
};
