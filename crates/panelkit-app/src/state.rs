//! Panel state (Model in TEA pattern)
//!
//! One [`PanelState`] per open panel. It holds a read-through cache of the
//! host's data: whatever is in `items` may be stale from the moment a
//! mutating request goes out until the next dataset arrives.

use std::collections::BTreeSet;
use std::time::Duration;

use panelkit_core::{
    aggregate_monthly, cell_text, total_pages, CostRecord, Item, JobStatus, MonthlyCostChart,
    PageRequest, PanelRequest, SortSpec, StoryParts,
};
use panelkit_host::SingleFlight;

use crate::config::Settings;
use crate::progress::OperationTracker;
use crate::refresh::AutoRefresh;
use crate::store::{apply_filter, sort_items, FilterMap};
use crate::view::{SortAuthority, ViewSchema};

/// Whether the panel has data to show
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Nothing asked for yet
    #[default]
    NotRequested,
    /// First dataset requested, no reply yet
    Loading,
    Loaded,
    /// The initial load failed; the message is shown in place of the table
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelPhase {
    #[default]
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Dismissible message shown above the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────
// Name entry
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NameValidation {
    #[default]
    Idle,
    /// Failed a local check; never sent to the host
    Invalid(String),
    /// Waiting for the host's verdict
    Pending,
    Valid,
    /// Rejected by the host
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameForm {
    pub input: String,
    pub validation: NameValidation,
    /// Value the outstanding host check was sent for
    pub checking: Option<String>,
}

impl NameForm {
    /// Inline message for the current validation state
    pub fn message(&self) -> Option<&str> {
        match &self.validation {
            NameValidation::Invalid(msg) | NameValidation::Rejected(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Page name suggested from a story; only saved after the user confirms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorySuggestion {
    pub story_code: String,
    pub parts: StoryParts,
    pub page_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page_number: u32,
    pub page_size: u32,
    pub records_total: u64,
}

impl Pagination {
    pub fn total_pages(&self) -> u32 {
        total_pages(self.records_total, self.page_size)
    }

    pub fn has_prev(&self) -> bool {
        self.page_number > 1
    }

    pub fn has_next(&self) -> bool {
        self.page_number < self.total_pages()
    }

    /// Clamp a requested page into `1..=total_pages`
    pub fn clamp(&self, page: u32) -> u32 {
        page.clamp(1, self.total_pages())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: String,
    pub content: String,
}

// ─────────────────────────────────────────────────────────
// PanelState
// ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct PanelState {
    pub schema: ViewSchema,
    pub phase: PanelPhase,
    pub load: LoadState,

    /// Rows as delivered by the host (never filtered in place)
    pub items: Vec<Item>,
    pub filters: FilterMap,
    /// Filtered and, for locally sorted views, sorted rows
    pub visible: Vec<Item>,
    pub sort: Option<SortSpec>,
    /// Page size this panel asks for
    pub page_size: u32,
    /// Paging of the rows currently held, as reported by the host
    pub pagination: Pagination,
    /// Key-column values of selected rows
    pub selection: BTreeSet<String>,

    pub flights: SingleFlight,
    pub operation: OperationTracker,
    pub refresh: AutoRefresh,

    pub notice: Option<Notice>,
    pub name_form: NameForm,
    pub story: Option<StorySuggestion>,
    pub chart: Option<MonthlyCostChart>,
    pub last_export: Option<CsvExport>,

    /// Set when a mutating request is sent; cleared by the next dataset
    pub cache_stale: bool,
    pub request_timeout: Option<Duration>,
}

impl PanelState {
    pub fn new(schema: ViewSchema, settings: &Settings) -> Self {
        let page_size = settings
            .view_override(&schema.name)
            .or(schema.page_size)
            .unwrap_or(settings.behavior.default_page_size.max(1));

        Self {
            phase: PanelPhase::Open,
            load: LoadState::NotRequested,
            items: Vec::new(),
            filters: FilterMap::new(),
            visible: Vec::new(),
            sort: None,
            page_size,
            pagination: Pagination {
                page_number: 1,
                page_size,
                records_total: 0,
            },
            selection: BTreeSet::new(),
            flights: SingleFlight::new(),
            operation: OperationTracker::new(),
            refresh: AutoRefresh::new(settings.behavior.auto_refresh_interval()),
            notice: None,
            name_form: NameForm::default(),
            story: None,
            chart: None,
            last_export: None,
            cache_stale: false,
            request_timeout: settings.behavior.request_timeout(),
            schema,
        }
    }

    pub fn is_open(&self) -> bool {
        self.phase == PanelPhase::Open
    }

    /// Re-derive `visible` from the held rows
    pub fn recompute_visible(&mut self) {
        let filtered = apply_filter(&self.items, &self.filters);
        self.visible = match (&self.sort, self.schema.sort_authority) {
            (Some(sort), SortAuthority::Local) => {
                sort_items(&filtered, sort, &self.schema.columns)
            }
            _ => filtered,
        };
    }

    /// Replace the held rows with a dataset from the host
    ///
    /// Replaces rather than appends, so delivering the same payload twice
    /// leaves the state unchanged.
    pub fn apply_dataset(
        &mut self,
        items: Vec<Item>,
        records_total: u64,
        page_number: Option<u32>,
        page_size: Option<u32>,
    ) {
        self.items = items;
        self.pagination.records_total = records_total;
        if let Some(size) = page_size.filter(|s| *s > 0) {
            self.pagination.page_size = size;
        }
        if let Some(n) = page_number {
            self.pagination.page_number = self.pagination.clamp(n);
        } else {
            self.pagination.page_number = self.pagination.clamp(self.pagination.page_number);
        }

        let keys: BTreeSet<String> = self.items.iter().filter_map(|i| self.row_key(i)).collect();
        self.selection.retain(|k| keys.contains(k));

        self.load = LoadState::Loaded;
        self.cache_stale = false;
        self.chart = self.schema.chart.as_ref().map(|spec| {
            let records: Vec<CostRecord> = self
                .items
                .iter()
                .filter_map(|item| {
                    CostRecord::from_item(
                        item,
                        &spec.date_field,
                        &spec.amount_field,
                        &spec.category_field,
                    )
                })
                .collect();
            aggregate_monthly(&records)
        });
        self.recompute_visible();
    }

    /// Any tracked row still queued or processing
    pub fn has_pending_jobs(&self) -> bool {
        let Some(field) = &self.schema.status_field else {
            return false;
        };
        self.items.iter().any(|item| {
            JobStatus::parse(&cell_text(item.get(field))).is_some_and(|s| !s.is_terminal())
        })
    }

    /// Page request for this view; the sort goes along only when the host sorts
    pub fn page_request(&self, page_number: u32) -> PanelRequest {
        let sort = match self.schema.sort_authority {
            SortAuthority::Host => self.sort.clone(),
            SortAuthority::Local => None,
        };
        PanelRequest::RequestPage {
            view: self.schema.name.clone(),
            page: PageRequest {
                page_number,
                page_size: self.page_size,
                sort,
            },
        }
    }

    /// Command announcing readiness, e.g. `dataObjectsWebviewReady`
    pub fn ready_command(&self) -> String {
        PanelRequest::WebviewReady {
            view: self.schema.name.clone(),
        }
        .command()
    }

    pub fn page_command(&self) -> String {
        format!("request{}Page", self.schema.name)
    }

    /// Whether `command` is one of the requests answered by a dataset
    pub fn is_data_command(&self, command: &str) -> bool {
        command == self.page_command() || command == self.ready_command()
    }

    pub fn add_command(&self) -> String {
        format!("add{}Item", self.schema.name)
    }

    /// Waiting on the host for anything
    pub fn is_busy(&self) -> bool {
        self.load == LoadState::Loading
            || self.flights.in_flight_count() > 0
            || self.operation.is_busy()
    }

    /// Submit is enabled only after the host accepted the current input
    pub fn submit_enabled(&self) -> bool {
        self.is_open()
            && self.schema.name_field.is_some()
            && self.name_form.validation == NameValidation::Valid
            && !self.flights.is_in_flight(&self.add_command())
    }

    pub fn row_key(&self, item: &Item) -> Option<String> {
        let key = cell_text(item.get(&self.schema.key_field));
        (!key.is_empty()).then_some(key)
    }

    pub fn find_row(&self, key: &str) -> Option<&Item> {
        self.items
            .iter()
            .find(|item| self.row_key(item).as_deref() == Some(key))
    }

    /// Selected rows in held order
    pub fn selected_items(&self) -> Vec<Item> {
        self.items
            .iter()
            .filter(|item| {
                self.row_key(item)
                    .is_some_and(|k| self.selection.contains(&k))
            })
            .cloned()
            .collect()
    }

    pub fn set_notice(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.notice = Some(Notice::new(level, text));
    }
}
