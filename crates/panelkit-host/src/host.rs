//! Host side of the channel: the bridge trait, its error boundary, and an
//! in-memory reference host.

use std::collections::HashMap;

use chrono::{DateTime, Local};
use serde_json::{json, Value};

use panelkit_core::prelude::*;
use panelkit_core::{
    compare_cells, is_pascal_case, to_pascal_case, total_pages, ChangeRequest,
    ChangeRequestAction, HostEvent, Item, JobStatus, PageRequest, PanelRequest,
};

use crate::change_request::{self, ApplyOutcome, ChangeRequestBackend};
use crate::csv::build_csv;

/// Page size used when a request does not carry one
pub const DEFAULT_PAGE_SIZE: u32 = 10;

pub const CHANGE_REQUESTS_VIEW: &str = "ChangeRequests";
pub const FABRICATION_VIEW: &str = "FabricationRequests";
pub const USER_STORIES_VIEW: &str = "UserStories";

/// Operation name used for result download progress events
pub const DOWNLOAD_OPERATION: &str = "downloadFabricationResults";

/// Something that answers panel requests
///
/// Implementations return the events to deliver, in order. Errors are turned
/// into error envelopes by [`dispatch_request`]; they never close the channel.
#[trait_variant::make(HostBridge: Send)]
pub trait LocalHostBridge {
    async fn handle(&mut self, request: PanelRequest) -> Result<Vec<HostEvent>>;
}

/// Run one request through a host and return the events for the panel
///
/// Failures become `<command>Error` followed by `operationComplete`. Mutating
/// requests and failed requests always end with `operationComplete` so the
/// panel can leave its busy state.
pub async fn dispatch_request<H: HostBridge>(
    host: &mut H,
    request: PanelRequest,
) -> Vec<HostEvent> {
    let command = request.command();
    let mutating = request.is_mutating();
    debug!("← panel: {}", request.summary());

    let mut events = match host.handle(request).await {
        Ok(events) => events,
        Err(e) => {
            warn!("Host failed '{}': {}", command, e);
            vec![HostEvent::error_for(&command, e.to_string())]
        }
    };

    let failed = events.iter().any(HostEvent::is_error);
    let completed = events.iter().any(|e| {
        matches!(e, HostEvent::OperationComplete { operation: Some(op) } if *op == command)
    });
    if (mutating || failed) && !completed {
        events.push(HostEvent::complete(command));
    }
    events
}

// ─────────────────────────────────────────────────────────
// Memory host
// ─────────────────────────────────────────────────────────

/// A fabrication job tracked by the reference host
#[derive(Debug, Clone, PartialEq)]
pub struct FabricationJob {
    pub code: String,
    pub description: String,
    pub status: JobStatus,
    pub created: DateTime<Local>,
}

impl FabricationJob {
    fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert("code".into(), json!(self.code));
        item.insert("description".into(), json!(self.description));
        item.insert("status".into(), json!(self.status.as_str()));
        item.insert(
            "created".into(),
            json!(self.created.format("%Y-%m-%d %H:%M").to_string()),
        );
        item
    }

    /// One step along Queued -> Processing -> Completed
    fn advance(&mut self) {
        self.status = match self.status {
            JobStatus::Queued => JobStatus::Processing,
            JobStatus::Processing => JobStatus::Completed,
            other => other,
        };
    }
}

/// Reference host over in-memory datasets and a JSON model
///
/// Change requests live in memory unless a [`ChangeRequestBackend`] is attached,
/// usually a [`ChangeRequestStore`](crate::ChangeRequestStore).
#[derive(Debug, Default)]
pub struct MemoryHost {
    datasets: HashMap<String, Vec<Item>>,
    model: Value,
    store: Option<Box<dyn ChangeRequestBackend>>,
    change_requests: HashMap<String, Vec<ChangeRequest>>,
    jobs: Vec<FabricationJob>,
    next_job: u32,
    mappings: HashMap<String, String>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            model: Value::Object(Default::default()),
            next_job: 1,
            ..Default::default()
        }
    }

    pub fn with_dataset(mut self, view: impl Into<String>, items: Vec<Item>) -> Self {
        self.datasets.insert(view.into(), items);
        self
    }

    pub fn with_model(mut self, model: Value) -> Self {
        self.model = model;
        self
    }

    pub fn with_store(mut self, store: impl ChangeRequestBackend + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn with_change_requests(
        mut self,
        request_code: impl Into<String>,
        records: Vec<ChangeRequest>,
    ) -> Self {
        self.change_requests.insert(request_code.into(), records);
        self
    }

    pub fn model(&self) -> &Value {
        &self.model
    }

    pub fn dataset(&self, view: &str) -> Option<&[Item]> {
        self.datasets.get(view).map(Vec::as_slice)
    }

    pub fn jobs(&self) -> &[FabricationJob] {
        &self.jobs
    }

    pub fn mapping(&self, story_code: &str) -> Option<&str> {
        self.mappings.get(story_code).map(String::as_str)
    }

    pub fn change_requests(&self, request_code: &str) -> Result<Vec<ChangeRequest>> {
        match &self.store {
            Some(store) => store.load(request_code),
            None => Ok(self
                .change_requests
                .get(request_code)
                .cloned()
                .unwrap_or_default()),
        }
    }

    fn save_change_requests(
        &mut self,
        request_code: &str,
        records: Vec<ChangeRequest>,
    ) -> Result<()> {
        match &self.store {
            Some(store) => store.save(request_code, &records),
            None => {
                self.change_requests.insert(request_code.to_string(), records);
                Ok(())
            }
        }
    }

    fn request_codes(&self) -> Result<Vec<String>> {
        let mut codes = match &self.store {
            Some(store) => store.request_codes()?,
            None => self.change_requests.keys().cloned().collect(),
        };
        codes.sort();
        Ok(codes)
    }

    // ─────────────────────────────────────────────────────
    // Datasets
    // ─────────────────────────────────────────────────────

    /// Full rows of a view, before ordering and paging
    fn rows(&self, view: &str) -> Result<Vec<Item>> {
        match view {
            CHANGE_REQUESTS_VIEW => {
                let mut rows = Vec::new();
                for request_code in self.request_codes()? {
                    for record in self.change_requests(&request_code)? {
                        rows.push(change_request_row(&request_code, &record));
                    }
                }
                Ok(rows)
            }
            FABRICATION_VIEW => Ok(self.jobs.iter().map(FabricationJob::to_item).collect()),
            USER_STORIES_VIEW => {
                let rows = self
                    .datasets
                    .get(view)
                    .ok_or_else(|| Error::unknown_view(view))?;
                Ok(rows
                    .iter()
                    .map(|row| {
                        let mut row = row.clone();
                        let code = row
                            .get("storyCode")
                            .and_then(Value::as_str)
                            .map(String::from);
                        if let Some(page) = code.and_then(|c| self.mappings.get(&c)) {
                            row.insert("pageName".into(), json!(page));
                        }
                        row
                    })
                    .collect())
            }
            _ => self
                .datasets
                .get(view)
                .cloned()
                .ok_or_else(|| Error::unknown_view(view)),
        }
    }

    /// Canonical ordering and one page of a view
    fn page(&self, view: &str, page: &PageRequest) -> Result<HostEvent> {
        let mut rows = self.rows(view)?;
        if let Some(sort) = &page.sort {
            let numeric = rows
                .iter()
                .filter_map(|r| r.get(&sort.column))
                .all(Value::is_number);
            rows.sort_by(|a, b| {
                compare_cells(a.get(&sort.column), b.get(&sort.column), numeric, sort.direction)
            });
        }

        let size = if page.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page.page_size
        };
        let records_total = rows.len() as u64;
        let page_number = page.page_number.clamp(1, total_pages(records_total, size));
        let request = PageRequest {
            page_number,
            page_size: size,
            sort: None,
        };
        let items: Vec<Item> = rows
            .into_iter()
            .skip(request.offset())
            .take(size as usize)
            .collect();

        Ok(HostEvent::SetData {
            view: view.to_string(),
            items,
            records_total,
            page_number: Some(page_number),
            page_size: Some(size),
        })
    }

    fn first_page(&self, view: &str) -> Result<HostEvent> {
        self.page(view, &PageRequest::first(DEFAULT_PAGE_SIZE))
    }

    fn advance_jobs(&mut self) {
        for job in self.jobs.iter_mut().filter(|j| !j.status.is_terminal()) {
            let before = job.status;
            job.advance();
            debug!("Fabrication {}: {} -> {}", job.code, before, job.status);
        }
    }

    // ─────────────────────────────────────────────────────
    // Names
    // ─────────────────────────────────────────────────────

    /// Semantic verdict on a name: `None` when valid, else the reason
    pub fn name_problem(&self, field: &str, value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            return Some("Name is required".to_string());
        }
        if !is_pascal_case(value) {
            let suggestion = to_pascal_case(value);
            let example = if suggestion.is_empty() {
                "ProcessOrder"
            } else {
                suggestion.as_str()
            };
            return Some(format!(
                "Name must be in PascalCase format (e.g. {})",
                example
            ));
        }
        let taken = self.datasets.values().flatten().any(|item| {
            item.get(field)
                .and_then(Value::as_str)
                .is_some_and(|existing| existing.eq_ignore_ascii_case(value))
        });
        if taken {
            return Some(format!("A {} named '{}' already exists", field, value));
        }
        None
    }

    // ─────────────────────────────────────────────────────
    // Change requests
    // ─────────────────────────────────────────────────────

    fn review(
        &mut self,
        action: ChangeRequestAction,
        request_code: &str,
        code: &str,
        reason: Option<String>,
    ) -> Result<Vec<HostEvent>> {
        let mut records = self.change_requests(request_code)?;
        let record = records.iter_mut().find(|r| r.code == code).ok_or_else(|| {
            Error::change_request(format!(
                "Change request {} not found in {}",
                code, request_code
            ))
        })?;

        // The live model only changes once the records are saved
        let mut model = self.model.clone();
        let mut events = Vec::new();
        match action {
            ChangeRequestAction::Approve => change_request::approve(record)?,
            ChangeRequestAction::Reject => change_request::reject(record, reason)?,
            ChangeRequestAction::Apply => {
                match change_request::apply_change_request(&mut model, record) {
                    ApplyOutcome::Applied => info!("Applied change request {}", code),
                    ApplyOutcome::Stale => events.push(HostEvent::ChangeRequestConflict {
                        code: code.to_string(),
                        reason: panelkit_core::STALE_DATA_REASON.to_string(),
                    }),
                    ApplyOutcome::NotEligible => {
                        return Err(Error::change_request(format!(
                            "Change request {} must be approved and unprocessed to apply",
                            code
                        )))
                    }
                    ApplyOutcome::PathNotFound => {
                        return Err(Error::path_not_found(record.property_path.clone()))
                    }
                }
            }
        }

        self.save_change_requests(request_code, records)?;
        self.model = model;
        events.push(self.first_page(CHANGE_REQUESTS_VIEW)?);
        Ok(events)
    }

    fn apply_all(&mut self, request_code: &str) -> Result<Vec<HostEvent>> {
        let mut records = self.change_requests(request_code)?;
        let mut model = self.model.clone();
        let outcomes = change_request::apply_all(&mut model, &mut records);
        self.save_change_requests(request_code, records)?;
        self.model = model;

        let mut events = Vec::new();
        let mut applied = 0;
        for (code, outcome) in &outcomes {
            match outcome {
                ApplyOutcome::Applied => applied += 1,
                ApplyOutcome::Stale => events.push(HostEvent::ChangeRequestConflict {
                    code: code.clone(),
                    reason: panelkit_core::STALE_DATA_REASON.to_string(),
                }),
                ApplyOutcome::PathNotFound => events.push(HostEvent::error_for(
                    "applyAllChangeRequests",
                    format!("Change request {}: property path not found", code),
                )),
                ApplyOutcome::NotEligible => {}
            }
        }
        info!(
            "Applied {} of {} eligible change requests in {}",
            applied,
            outcomes.len(),
            request_code
        );
        events.push(self.first_page(CHANGE_REQUESTS_VIEW)?);
        Ok(events)
    }

    // ─────────────────────────────────────────────────────
    // Fabrication
    // ─────────────────────────────────────────────────────

    fn add_fabrication(&mut self, description: &str) -> Result<Vec<HostEvent>> {
        if description.trim().is_empty() {
            return Err(Error::validation("Description is required"));
        }
        let code = format!("FR-{:04}", self.next_job.max(1));
        self.next_job = self.next_job.max(1) + 1;
        self.jobs.push(FabricationJob {
            code: code.clone(),
            description: description.trim().to_string(),
            status: JobStatus::Queued,
            created: Local::now(),
        });
        info!("Queued fabrication request {}", code);
        Ok(vec![self.first_page(FABRICATION_VIEW)?])
    }

    fn cancel_fabrication(&mut self, code: &str) -> Result<Vec<HostEvent>> {
        let job = self
            .jobs
            .iter_mut()
            .find(|j| j.code == code)
            .ok_or_else(|| Error::host(format!("Fabrication request {} not found", code)))?;
        if job.status != JobStatus::Queued {
            return Err(Error::host(format!(
                "Fabrication request {} is {} and can no longer be cancelled",
                code, job.status
            )));
        }
        job.status = JobStatus::Cancelled;
        Ok(vec![self.first_page(FABRICATION_VIEW)?])
    }

    fn download_results(&self, code: &str) -> Result<Vec<HostEvent>> {
        let job = self
            .jobs
            .iter()
            .find(|j| j.code == code)
            .ok_or_else(|| Error::host(format!("Fabrication request {} not found", code)))?;
        if job.status != JobStatus::Completed {
            return Err(Error::host(format!(
                "Results for {} are not ready ({})",
                code, job.status
            )));
        }

        let progress = |phase: &str, percent: f64, step: String| HostEvent::Progress {
            operation: DOWNLOAD_OPERATION.to_string(),
            phase: phase.to_string(),
            percent,
            step,
        };
        let mut events = Vec::new();
        for percent in [0.0, 25.0, 50.0, 75.0, 100.0] {
            events.push(progress(
                "download",
                percent,
                format!("Downloading results for {}", code),
            ));
        }
        for (percent, step) in [
            (0.0, "Opening archive"),
            (50.0, "Extracting files"),
            (100.0, "Extraction finished"),
        ] {
            events.push(progress("extract", percent, step.to_string()));
        }
        events.push(HostEvent::Completed {
            operation: DOWNLOAD_OPERATION.to_string(),
            message: Some(format!("Results for {} downloaded", code)),
        });
        Ok(events)
    }
}

impl HostBridge for MemoryHost {
    async fn handle(&mut self, request: PanelRequest) -> Result<Vec<HostEvent>> {
        match request {
            PanelRequest::WebviewReady { view } => {
                if view == FABRICATION_VIEW {
                    self.advance_jobs();
                }
                Ok(vec![self.first_page(&view)?])
            }
            PanelRequest::RequestPage { view, page } => {
                if view == FABRICATION_VIEW {
                    self.advance_jobs();
                }
                Ok(vec![self.page(&view, &page)?])
            }
            PanelRequest::ChangeRequest {
                action,
                request_code,
                code,
                reason,
            } => self.review(action, &request_code, &code, reason),
            PanelRequest::ApplyAllChangeRequests { request_code } => self.apply_all(&request_code),
            PanelRequest::ExportToCsv { items, export_type } => {
                if items.is_empty() {
                    return Err(Error::validation("Nothing to export"));
                }
                let filename = format!(
                    "{}_{}.csv",
                    export_type,
                    Local::now().format("%Y%m%d_%H%M%S")
                );
                Ok(vec![HostEvent::CsvExportReady {
                    csv_content: build_csv(&items),
                    filename,
                }])
            }
            PanelRequest::ValidateName { field, value } => {
                let problem = self.name_problem(&field, &value);
                Ok(vec![HostEvent::NameValidation {
                    is_valid: problem.is_none(),
                    message: problem.unwrap_or_default(),
                }])
            }
            PanelRequest::AddItem { view, field, name } => {
                if let Some(problem) = self.name_problem(&field, &name) {
                    return Ok(vec![HostEvent::ModelValidationSetError { message: problem }]);
                }
                let rows = self
                    .datasets
                    .get_mut(&view)
                    .ok_or_else(|| Error::unknown_view(&view))?;
                let mut item = Item::new();
                item.insert(field, json!(name.trim()));
                rows.push(item);
                Ok(vec![self.first_page(&view)?])
            }
            PanelRequest::AddFabricationRequest { description } => {
                self.add_fabrication(&description)
            }
            PanelRequest::CancelFabricationRequest { code } => self.cancel_fabrication(&code),
            PanelRequest::DownloadFabricationResults { code } => self.download_results(&code),
            PanelRequest::SaveStoryPageMapping {
                story_code,
                page_name,
            } => {
                if !is_pascal_case(&page_name) {
                    return Err(Error::validation(format!(
                        "Page name '{}' must be PascalCase",
                        page_name
                    )));
                }
                self.mappings.insert(story_code, page_name);
                Ok(vec![self.first_page(USER_STORIES_VIEW)?])
            }
            PanelRequest::Unknown { command, .. } => Err(Error::protocol(format!(
                "Unsupported command '{}'",
                command
            ))),
        }
    }
}

fn change_request_row(request_code: &str, record: &ChangeRequest) -> Item {
    let mut item = Item::new();
    item.insert("RequestCode".into(), json!(request_code));
    item.insert("Code".into(), json!(record.code));
    item.insert("Description".into(), json!(record.description));
    item.insert("PropertyPath".into(), json!(record.property_path));
    item.insert("OldValue".into(), record.old_value.clone());
    item.insert("NewValue".into(), record.new_value.clone());
    item.insert("Status".into(), json!(record.status_label()));
    if let Some(reason) = &record.rejection_reason {
        item.insert("RejectionReason".into(), json!(reason));
    }
    item
}
