//! # panelkit-host - Channel Plumbing and Reference Host
//!
//! Everything that touches the wire between a panel and its host: encoding
//! and parsing envelopes per direction, single-flight request tracking,
//! channel senders, and the host side of the contract.
//!
//! Depends on [`panelkit_core`] for envelope types and error handling.
//!
//! ## Public API
//!
//! ### Wire Codec
//! - [`parse_panel_request()`] - Parse a host-bound line into a [`PanelRequest`](panelkit_core::PanelRequest)
//! - [`parse_host_event()`] - Parse a panel-bound line into a [`HostEvent`](panelkit_core::HostEvent)
//! - [`encode_request()`], [`encode_event()`] - One line of JSON per envelope
//!
//! ### Request Tracking
//! - [`SingleFlight`] - At most one outstanding request per command
//! - [`CommandSender`], [`EventSender`] - Put encoded envelopes on a channel
//!
//! ### Host Side
//! - [`HostBridge`] - Async trait a host implements
//! - [`dispatch_request()`] - Error boundary around a host
//! - [`MemoryHost`] - In-memory reference host
//! - [`ChangeRequestStore`], [`apply_change_request()`] - Change-request persistence and apply
//! - [`ChangeRequestBackend`] - Storage seam a host keeps its change requests behind
//! - [`build_csv()`] - CSV export text

pub mod change_request;
pub mod commands;
pub mod csv;
pub mod host;
pub mod protocol;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

// Public API re-exports
pub use change_request::{
    apply_all, apply_change_request, approve, lookup, lookup_mut, parse_path, reject,
    validate_request_code, ApplyOutcome, ChangeRequestBackend, ChangeRequestStore, PathSegment,
};
pub use commands::{Begin, CommandSender, EventSender, FlightPolicy, SingleFlight};
pub use csv::build_csv;
pub use host::{
    dispatch_request, FabricationJob, HostBridge, LocalHostBridge, MemoryHost,
    CHANGE_REQUESTS_VIEW, DEFAULT_PAGE_SIZE, DOWNLOAD_OPERATION, FABRICATION_VIEW,
    USER_STORIES_VIEW,
};
pub use protocol::{
    encode_event, encode_request, host_event_from_envelope, panel_request_from_envelope,
    parse_host_event, parse_panel_request,
};
