//! Domain types shared by panels and hosts

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single data-driven row. Column definitions decide which keys matter.
pub type Item = Map<String, Value>;

/// Machine-readable reason recorded when a change request no longer matches the model
pub const STALE_DATA_REASON: &str = "Old value does not match current model value";

// ─────────────────────────────────────────────────────────
// Sorting & Paging
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn is_descending(self) -> bool {
        self == SortDirection::Descending
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// A page request. Page numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page_number: u32,
    pub page_size: u32,
    pub sort: Option<SortSpec>,
}

impl PageRequest {
    pub fn first(page_size: u32) -> Self {
        Self {
            page_number: 1,
            page_size,
            sort: None,
        }
    }

    /// Index of the first item on this page in the full ordering
    pub fn offset(&self) -> usize {
        (self.page_number.max(1) as usize - 1) * self.page_size as usize
    }
}

/// Number of pages needed for `total` records; never less than one
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    if page_size == 0 || total == 0 {
        return 1;
    }
    total.div_ceil(page_size as u64).min(u32::MAX as u64) as u32
}

// ─────────────────────────────────────────────────────────
// Change Requests
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeRequestAction {
    Approve,
    Reject,
    Apply,
}

impl ChangeRequestAction {
    pub fn command(&self) -> &'static str {
        match self {
            ChangeRequestAction::Approve => "approveChangeRequest",
            ChangeRequestAction::Reject => "rejectChangeRequest",
            ChangeRequestAction::Apply => "applyChangeRequest",
        }
    }

    pub fn from_command(command: &str) -> Option<Self> {
        match command {
            "approveChangeRequest" => Some(ChangeRequestAction::Approve),
            "rejectChangeRequest" => Some(ChangeRequestAction::Reject),
            "applyChangeRequest" => Some(ChangeRequestAction::Apply),
            _ => None,
        }
    }
}

/// A proposed single-field model mutation awaiting approval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeRequest {
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub property_path: String,
    #[serde(default)]
    pub old_value: Value,
    #[serde(default)]
    pub new_value: Value,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub is_rejected: bool,
    #[serde(default)]
    pub is_processed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl ChangeRequest {
    pub fn new(
        code: impl Into<String>,
        property_path: impl Into<String>,
        old_value: impl Into<Value>,
        new_value: impl Into<Value>,
    ) -> Self {
        Self {
            code: code.into(),
            description: String::new(),
            property_path: property_path.into(),
            old_value: old_value.into(),
            new_value: new_value.into(),
            is_approved: false,
            is_rejected: false,
            is_processed: false,
            rejection_reason: None,
        }
    }

    /// Approved and neither rejected nor processed
    pub fn is_eligible_for_apply(&self) -> bool {
        self.is_approved && !self.is_rejected && !self.is_processed
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_processed {
            "Applied"
        } else if self.is_rejected {
            "Rejected"
        } else if self.is_approved {
            "Approved"
        } else {
            "Pending"
        }
    }
}

// ─────────────────────────────────────────────────────────
// Tracked Jobs
// ─────────────────────────────────────────────────────────

/// Status of a host-side job as shown in a tracked list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "Queued",
            JobStatus::Processing => "Processing",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
            JobStatus::Cancelled => "Cancelled",
        }
    }

    /// Case-insensitive parse of a status cell
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queued" | "pending" => Some(JobStatus::Queued),
            "processing" | "running" => Some(JobStatus::Processing),
            "completed" | "complete" | "success" => Some(JobStatus::Completed),
            "failed" | "error" => Some(JobStatus::Failed),
            "cancelled" | "canceled" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render a cell value the way tables show it
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => (if *b { "Yes" } else { "No" }).to_string(),
        Some(other) => other.to_string(),
    }
}

/// Numeric reading of a cell: numbers, or strings that parse as one
pub fn cell_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }
}

/// Order two cells for a table sort
///
/// Numeric columns compare by value, text columns case-insensitively. Empty
/// or unreadable cells sort after everything else in both directions.
pub fn compare_cells(
    a: Option<&Value>,
    b: Option<&Value>,
    numeric: bool,
    direction: SortDirection,
) -> Ordering {
    let ordering = if numeric {
        match (cell_number(a), cell_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (None, None) => return Ordering::Equal,
        }
    } else {
        let x = cell_text(a).to_lowercase();
        let y = cell_text(b).to_lowercase();
        match (x.is_empty(), y.is_empty()) {
            (false, false) => x.cmp(&y),
            (false, true) => return Ordering::Less,
            (true, false) => return Ordering::Greater,
            (true, true) => return Ordering::Equal,
        }
    };
    if direction.is_descending() {
        ordering.reverse()
    } else {
        ordering
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(5, 0), 1);
    }

    #[test]
    fn test_page_offset() {
        let mut page = PageRequest::first(25);
        assert_eq!(page.offset(), 0);
        page.page_number = 3;
        assert_eq!(page.offset(), 50);
        page.page_number = 0;
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_change_request_eligibility() {
        let mut cr = ChangeRequest::new("CR1", "objects[0].name", "Customer", "Client");
        assert!(!cr.is_eligible_for_apply());
        cr.is_approved = true;
        assert!(cr.is_eligible_for_apply());
        cr.is_processed = true;
        assert!(!cr.is_eligible_for_apply());
    }

    #[test]
    fn test_change_request_pascal_case_fields() {
        let cr: ChangeRequest = serde_json::from_value(json!({
            "Code": "CR7",
            "Description": "Rename",
            "PropertyPath": "name",
            "OldValue": "A",
            "NewValue": "B",
            "IsApproved": true
        }))
        .unwrap();
        assert_eq!(cr.code, "CR7");
        assert!(cr.is_approved);
        assert!(!cr.is_rejected);
        assert_eq!(cr.rejection_reason, None);
        assert_eq!(cr.status_label(), "Approved");
    }

    #[test]
    fn test_job_status_parse_and_terminal() {
        assert_eq!(JobStatus::parse("QUEUED"), Some(JobStatus::Queued));
        assert_eq!(JobStatus::parse(" canceled "), Some(JobStatus::Cancelled));
        assert_eq!(JobStatus::parse("whatever"), None);
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(None), "");
        assert_eq!(cell_text(Some(&json!("x"))), "x");
        assert_eq!(cell_text(Some(&json!(12))), "12");
        assert_eq!(cell_text(Some(&json!(true))), "Yes");
    }

    #[test]
    fn test_compare_cells_numeric_and_missing_last() {
        let two = json!(2);
        let ten = json!("10");
        assert_eq!(
            compare_cells(Some(&two), Some(&ten), true, SortDirection::Ascending),
            Ordering::Less
        );
        assert_eq!(
            compare_cells(Some(&two), Some(&ten), true, SortDirection::Descending),
            Ordering::Greater
        );
        assert_eq!(
            compare_cells(None, Some(&two), true, SortDirection::Descending),
            Ordering::Greater
        );
    }

    #[test]
    fn test_compare_cells_text_case_insensitive() {
        let a = json!("apple");
        let b = json!("Banana");
        assert_eq!(
            compare_cells(Some(&a), Some(&b), false, SortDirection::Ascending),
            Ordering::Less
        );
        assert_eq!(
            compare_cells(Some(&json!("")), Some(&a), false, SortDirection::Ascending),
            Ordering::Greater
        );
    }
}
