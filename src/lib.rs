//! panelkit - Panel/host message runtime
//!
//! The binary drives one panel against the in-memory reference host and
//! reports what it does as NDJSON. The runtime itself lives in the
//! workspace crates.

pub mod headless;

pub use headless::runner::run_headless;
