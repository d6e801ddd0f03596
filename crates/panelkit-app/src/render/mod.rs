//! Pure rendering of panel state
//!
//! [`render_table`] builds a view-model; [`render_html`] turns it into the
//! panel document. Neither touches the state, so rendering the same state
//! twice gives the same output.

mod html;

pub use html::render_html;

use panelkit_core::{cell_text, MonthlyCostChart};

use crate::progress::OperationState;
use crate::state::{LoadState, NameValidation, Notice, PanelState};

#[derive(Debug, Clone, PartialEq)]
pub enum TableBody {
    /// No data has arrived yet
    Loading,
    /// Confirmed zero rows (or none left after filtering)
    Empty(String),
    Failed(String),
    Rows(Vec<TableRow>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub key: Option<String>,
    pub cells: Vec<String>,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    pub label: String,
    pub prev_enabled: bool,
    pub next_enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressView {
    pub operation: String,
    pub phase: Option<String>,
    pub percent: Option<f64>,
    pub step: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameFormView {
    pub value: String,
    pub message: Option<String>,
    pub checking: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub title: String,
    pub headers: Vec<String>,
    pub body: TableBody,
    pub pager: Pager,
    pub notice: Option<Notice>,
    pub progress: Option<ProgressView>,
    /// Present only for views that accept new items
    pub name_form: Option<NameFormView>,
    pub submit_enabled: bool,
    pub busy: bool,
    pub chart: Option<MonthlyCostChart>,
}

pub fn render_table(state: &PanelState) -> TableView {
    let body = match &state.load {
        LoadState::NotRequested | LoadState::Loading => TableBody::Loading,
        LoadState::Failed(message) => TableBody::Failed(message.clone()),
        LoadState::Loaded if state.visible.is_empty() => {
            TableBody::Empty(state.schema.empty_message.clone())
        }
        LoadState::Loaded => TableBody::Rows(
            state
                .visible
                .iter()
                .map(|item| {
                    let key = state.row_key(item);
                    TableRow {
                        selected: key.as_ref().is_some_and(|k| state.selection.contains(k)),
                        key,
                        cells: state
                            .schema
                            .columns
                            .iter()
                            .map(|c| cell_text(item.get(&c.key)))
                            .collect(),
                    }
                })
                .collect(),
        ),
    };

    let pagination = &state.pagination;
    let waiting_for_page = state.flights.is_in_flight(&state.page_command());
    let pager = Pager {
        label: format!(
            "Page {} of {}",
            pagination.page_number,
            pagination.total_pages()
        ),
        prev_enabled: pagination.has_prev() && !waiting_for_page,
        next_enabled: pagination.has_next() && !waiting_for_page,
    };

    TableView {
        title: state.schema.title.clone(),
        headers: state.schema.columns.iter().map(|c| c.label.clone()).collect(),
        body,
        pager,
        notice: state.notice.clone(),
        progress: progress_view(state),
        name_form: state.schema.name_field.as_ref().map(|_| NameFormView {
            value: state.name_form.input.clone(),
            message: state.name_form.message().map(str::to_string),
            checking: state.name_form.validation == NameValidation::Pending,
        }),
        submit_enabled: state.submit_enabled(),
        busy: state.is_busy(),
        chart: state.chart.clone(),
    }
}

fn progress_view(state: &PanelState) -> Option<ProgressView> {
    let operation = state.operation.operation()?.to_string();
    match state.operation.state() {
        OperationState::Idle | OperationState::Completed { .. } => None,
        OperationState::Failed { .. } => None,
        OperationState::Started => Some(ProgressView {
            operation,
            phase: None,
            percent: None,
            step: None,
        }),
        OperationState::Progressing {
            phase,
            percent,
            step,
        } => Some(ProgressView {
            operation,
            phase: Some(phase.clone()),
            percent: Some(*percent),
            step: Some(step.clone()),
        }),
    }
}
