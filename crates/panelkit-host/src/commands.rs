//! Request sending and single-flight tracking
//!
//! This module provides:
//! - Per-command single-flight tracking for requests awaiting a reply
//! - Timeout detection for stalled requests
//! - Senders that put encoded envelopes on the channel

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use panelkit_core::prelude::*;
use panelkit_core::{HostEvent, PanelRequest};

use crate::protocol::{encode_event, encode_request};

/// What to do with a request whose command already has one in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightPolicy {
    /// Drop the new request
    Suppress,
    /// Keep only the newest request and send it once the current one settles
    QueueLatest,
}

/// Outcome of [`SingleFlight::begin`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Begin {
    /// Nothing in flight for this command; send now
    Dispatch,
    /// Parked until the in-flight request settles
    Queued,
    /// Dropped
    Suppressed,
}

/// A request awaiting its reply
#[derive(Debug, Clone)]
struct InFlight {
    started_at: Instant,
    description: String,
}

/// At most one outstanding request per command
///
/// Replies carry no correlation id, so a second request of the same command
/// is never put on the wire while the first is unanswered.
#[derive(Debug, Default)]
pub struct SingleFlight {
    in_flight: HashMap<String, InFlight>,
    queued: HashMap<String, PanelRequest>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an outbound request
    pub fn begin(&mut self, request: &PanelRequest, policy: FlightPolicy) -> Begin {
        self.begin_at(request, policy, Instant::now())
    }

    pub fn begin_at(
        &mut self,
        request: &PanelRequest,
        policy: FlightPolicy,
        now: Instant,
    ) -> Begin {
        let command = request.command();
        if !self.in_flight.contains_key(&command) {
            self.in_flight.insert(
                command,
                InFlight {
                    started_at: now,
                    description: request.summary(),
                },
            );
            return Begin::Dispatch;
        }

        match policy {
            FlightPolicy::Suppress => {
                debug!("Suppressed '{}': already in flight", command);
                Begin::Suppressed
            }
            FlightPolicy::QueueLatest => {
                debug!("Queued '{}' behind in-flight request", command);
                self.queued.insert(command, request.clone());
                Begin::Queued
            }
        }
    }

    /// Mark a command as answered
    ///
    /// Returns the queued follow-up request, if any. It is registered as in
    /// flight immediately; the caller must send it.
    pub fn settle(&mut self, command: &str) -> Option<PanelRequest> {
        let settled = self.in_flight.remove(command);
        let next = self.queued.remove(command)?;
        if settled.is_none() {
            warn!("Settled '{}' with a queued request but nothing in flight", command);
        }
        self.in_flight.insert(
            command.to_string(),
            InFlight {
                started_at: Instant::now(),
                description: next.summary(),
            },
        );
        Some(next)
    }

    pub fn is_in_flight(&self, command: &str) -> bool {
        self.in_flight.contains_key(command)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn in_flight_commands(&self) -> Vec<String> {
        let mut commands: Vec<String> = self.in_flight.keys().cloned().collect();
        commands.sort();
        commands
    }

    /// Remove requests older than `timeout`, returning their commands and ages
    ///
    /// Queued follow-ups for expired commands are dropped as well.
    pub fn expire(&mut self, timeout: Duration) -> Vec<(String, Duration)> {
        self.expire_at(timeout, Instant::now())
    }

    pub fn expire_at(&mut self, timeout: Duration, now: Instant) -> Vec<(String, Duration)> {
        let mut stale: Vec<(String, Duration)> = self
            .in_flight
            .iter()
            .filter_map(|(command, req)| {
                let age = now.saturating_duration_since(req.started_at);
                (age >= timeout).then(|| (command.clone(), age))
            })
            .collect();
        stale.sort_by(|a, b| a.0.cmp(&b.0));

        for (command, age) in &stale {
            if let Some(req) = self.in_flight.remove(command) {
                warn!("'{}' ({}) timed out after {:?}", command, req.description, age);
            }
            self.queued.remove(command);
        }
        stale
    }

    /// Forget everything (panel teardown)
    pub fn cancel_all(&mut self) -> Vec<String> {
        let commands = self.in_flight_commands();
        self.in_flight.clear();
        self.queued.clear();
        commands
    }
}

// ─────────────────────────────────────────────────────────
// Senders
// ─────────────────────────────────────────────────────────

/// Puts encoded panel requests on the panel→host channel
///
/// Exactly one envelope per call; no retry and no acknowledgement.
#[derive(Clone)]
pub struct CommandSender {
    tx: mpsc::Sender<String>,
}

impl std::fmt::Debug for CommandSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSender")
            .field("tx", &"<channel>")
            .finish()
    }
}

impl CommandSender {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }

    /// Create a CommandSender for testing, returning the receiving end too
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn new_for_test() -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(64);
        (Self { tx }, rx)
    }

    /// Send without waiting (for use inside the synchronous update loop)
    pub fn try_send(&self, request: &PanelRequest) -> Result<()> {
        let line = encode_request(request);
        debug!("→ host: {}", request.summary());
        self.tx.try_send(line).map_err(|e| match e {
            mpsc::error::TrySendError::Closed(_) => Error::ChannelClosed,
            mpsc::error::TrySendError::Full(_) => Error::channel_send("host channel full"),
        })
    }

    pub async fn send(&self, request: &PanelRequest) -> Result<()> {
        let line = encode_request(request);
        debug!("→ host: {}", request.summary());
        self.tx
            .send(line)
            .await
            .map_err(|_| Error::ChannelClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Puts encoded host events on the host→panel channel
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<String>,
}

impl std::fmt::Debug for EventSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSender")
            .field("tx", &"<channel>")
            .finish()
    }
}

impl EventSender {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }

    pub async fn send(&self, event: &HostEvent) -> Result<()> {
        debug!("→ panel: {}", event.summary());
        self.tx
            .send(encode_event(event))
            .await
            .map_err(|_| Error::ChannelClosed)
    }

    pub async fn send_all(&self, events: &[HostEvent]) -> Result<()> {
        for event in events {
            self.send(event).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panelkit_core::PageRequest;

    fn page(n: u32) -> PanelRequest {
        PanelRequest::RequestPage {
            view: "Pages".to_string(),
            page: PageRequest {
                page_number: n,
                page_size: 10,
                sort: None,
            },
        }
    }

    fn export() -> PanelRequest {
        PanelRequest::ExportToCsv {
            items: vec![],
            export_type: "Pages".to_string(),
        }
    }

    #[test]
    fn test_first_request_dispatches() {
        let mut flights = SingleFlight::new();
        assert_eq!(flights.begin(&page(1), FlightPolicy::Suppress), Begin::Dispatch);
        assert!(flights.is_in_flight("requestPagesPage"));
        assert_eq!(flights.in_flight_count(), 1);
    }

    #[test]
    fn test_second_request_suppressed() {
        let mut flights = SingleFlight::new();
        flights.begin(&export(), FlightPolicy::Suppress);
        assert_eq!(flights.begin(&export(), FlightPolicy::Suppress), Begin::Suppressed);
        assert_eq!(flights.settle("exportToCSV"), None);
        assert!(!flights.is_in_flight("exportToCSV"));
    }

    #[test]
    fn test_queue_latest_keeps_newest() {
        let mut flights = SingleFlight::new();
        flights.begin(&page(1), FlightPolicy::QueueLatest);
        assert_eq!(flights.begin(&page(2), FlightPolicy::QueueLatest), Begin::Queued);
        assert_eq!(flights.begin(&page(3), FlightPolicy::QueueLatest), Begin::Queued);

        let next = flights.settle("requestPagesPage");
        assert_eq!(next, Some(page(3)));
        // The follow-up is now the in-flight request
        assert!(flights.is_in_flight("requestPagesPage"));
        assert_eq!(flights.settle("requestPagesPage"), None);
        assert!(!flights.is_in_flight("requestPagesPage"));
    }

    #[test]
    fn test_different_commands_are_independent() {
        let mut flights = SingleFlight::new();
        assert_eq!(flights.begin(&page(1), FlightPolicy::Suppress), Begin::Dispatch);
        assert_eq!(flights.begin(&export(), FlightPolicy::Suppress), Begin::Dispatch);
        assert_eq!(
            flights.in_flight_commands(),
            vec!["exportToCSV".to_string(), "requestPagesPage".to_string()]
        );
    }

    #[test]
    fn test_expire_removes_stale_and_queued() {
        let mut flights = SingleFlight::new();
        let start = Instant::now();
        flights.begin_at(&page(1), FlightPolicy::QueueLatest, start);
        flights.begin_at(&page(2), FlightPolicy::QueueLatest, start);

        let none = flights.expire_at(Duration::from_secs(5), start + Duration::from_secs(1));
        assert!(none.is_empty());

        let stale = flights.expire_at(Duration::from_secs(5), start + Duration::from_secs(6));
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].0, "requestPagesPage");
        assert_eq!(flights.in_flight_count(), 0);
        // Queued follow-up went with it
        assert_eq!(flights.settle("requestPagesPage"), None);
    }

    #[test]
    fn test_cancel_all() {
        let mut flights = SingleFlight::new();
        flights.begin(&page(1), FlightPolicy::Suppress);
        flights.begin(&export(), FlightPolicy::Suppress);
        assert_eq!(flights.cancel_all().len(), 2);
        assert_eq!(flights.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_command_sender_writes_one_line_per_request() {
        let (sender, mut rx) = CommandSender::new_for_test();
        sender.try_send(&page(2)).unwrap();
        let line = rx.recv().await.unwrap();
        assert!(line.contains("\"command\":\"requestPagesPage\""));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_command_sender_reports_closed_channel() {
        let (sender, rx) = CommandSender::new_for_test();
        drop(rx);
        assert!(matches!(sender.try_send(&page(1)), Err(Error::ChannelClosed)));
        assert!(sender.is_closed());
    }

    #[tokio::test]
    async fn test_event_sender_send_all() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);
        sender
            .send_all(&[
                HostEvent::complete("exportToCSV"),
                HostEvent::error_for("exportToCSV", "nope"),
            ])
            .await
            .unwrap();
        assert!(rx.recv().await.unwrap().contains("operationComplete"));
        assert!(rx.recv().await.unwrap().contains("exportToCSVError"));
    }
}
