//! Declarative panel schemas
//!
//! One generic panel controller is configured per view by a [`ViewSchema`]:
//! which columns to show, who sorts, which field names new items, and which
//! cheap checks run before a name goes to the host.

use panelkit_core::{is_pascal_case, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub key: String,
    pub label: String,
    pub kind: ColumnKind,
    pub filterable: bool,
}

impl ColumnDef {
    pub fn text(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind: ColumnKind::Text,
            filterable: true,
        }
    }

    pub fn number(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind: ColumnKind::Number,
            filterable: false,
        }
    }

    pub fn unfiltered(mut self) -> Self {
        self.filterable = false;
        self
    }
}

/// Who decides the row order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortAuthority {
    /// Re-sort the held rows in place
    Local,
    /// Ask the host for canonical ordering with the page request
    Host,
}

/// Local input checks; the host still has the final word
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validator {
    NonEmpty,
    PascalCase,
    MaxLength(usize),
}

impl Validator {
    pub fn check(&self, value: &str) -> Option<String> {
        let value = value.trim();
        match self {
            Validator::NonEmpty if value.is_empty() => Some("Name is required".to_string()),
            Validator::PascalCase if !value.is_empty() && !is_pascal_case(value) => Some(
                "Name must be in PascalCase format (start with an upper-case letter, letters and digits only)"
                    .to_string(),
            ),
            Validator::MaxLength(max) if value.chars().count() > *max => {
                Some(format!("Name must be at most {} characters", max))
            }
            _ => None,
        }
    }
}

/// Chart drawn from a view's rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSpec {
    pub date_field: String,
    pub amount_field: String,
    pub category_field: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewSchema {
    /// PascalCase view name used in commands (`requestDataObjectsPage`)
    pub name: String,
    pub title: String,
    pub columns: Vec<ColumnDef>,
    pub sort_authority: SortAuthority,
    /// Page size the view needs regardless of the configured default
    pub page_size: Option<u32>,
    pub empty_message: String,
    /// Column holding a job status; its presence enables auto-refresh
    pub status_field: Option<String>,
    /// Field that names new items; its presence enables the add form
    pub name_field: Option<String>,
    pub validators: Vec<Validator>,
    /// Column identifying a row for selection, change requests and mappings
    pub key_field: String,
    pub chart: Option<ChartSpec>,
}

/// Views this crate knows how to render
pub const BUILTIN_VIEWS: &[&str] = &[
    "DataObjects",
    "Workflows",
    "Pages",
    "UserStories",
    "FabricationRequests",
    "ChangeRequests",
    "CostForecast",
];

impl ViewSchema {
    fn base(name: &str, title: &str, columns: Vec<ColumnDef>, key_field: &str) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            columns,
            sort_authority: SortAuthority::Host,
            page_size: None,
            empty_message: format!("No {} found", title.to_lowercase()),
            status_field: None,
            name_field: None,
            validators: Vec::new(),
            key_field: key_field.to_string(),
            chart: None,
        }
    }

    pub fn builtin(name: &str) -> Result<Self> {
        let schema = match name {
            "DataObjects" => Self {
                name_field: Some("name".into()),
                validators: vec![
                    Validator::NonEmpty,
                    Validator::PascalCase,
                    Validator::MaxLength(100),
                ],
                ..Self::base(
                    name,
                    "Data Objects",
                    vec![
                        ColumnDef::text("name", "Name"),
                        ColumnDef::number("propertyCount", "Properties"),
                    ],
                    "name",
                )
            },
            // Naming rules for workflows are owned by the host
            "Workflows" => Self {
                name_field: Some("flowName".into()),
                validators: vec![Validator::NonEmpty, Validator::MaxLength(100)],
                ..Self::base(
                    name,
                    "Workflows",
                    vec![
                        ColumnDef::text("flowName", "Workflow"),
                        ColumnDef::text("ownerObject", "Owner Object"),
                    ],
                    "flowName",
                )
            },
            "Pages" => Self {
                sort_authority: SortAuthority::Local,
                ..Self::base(
                    name,
                    "Pages",
                    vec![ColumnDef::text("name", "Page"), ColumnDef::text("type", "Type")],
                    "name",
                )
            },
            "UserStories" => Self {
                sort_authority: SortAuthority::Local,
                ..Self::base(
                    name,
                    "User Stories",
                    vec![
                        ColumnDef::text("storyCode", "Code"),
                        ColumnDef::text("storyText", "Story"),
                        ColumnDef::text("pageName", "Page"),
                    ],
                    "storyCode",
                )
            },
            "FabricationRequests" => Self {
                status_field: Some("status".into()),
                ..Self::base(
                    name,
                    "Fabrication Requests",
                    vec![
                        ColumnDef::text("code", "Request"),
                        ColumnDef::text("description", "Description"),
                        ColumnDef::text("status", "Status"),
                        ColumnDef::text("created", "Created").unfiltered(),
                    ],
                    "code",
                )
            },
            "ChangeRequests" => Self::base(
                name,
                "Change Requests",
                vec![
                    ColumnDef::text("Code", "Code"),
                    ColumnDef::text("Description", "Description"),
                    ColumnDef::text("PropertyPath", "Property"),
                    ColumnDef::text("OldValue", "Old Value"),
                    ColumnDef::text("NewValue", "New Value"),
                    ColumnDef::text("Status", "Status"),
                ],
                "Code",
            ),
            "CostForecast" => Self {
                sort_authority: SortAuthority::Local,
                page_size: Some(500),
                chart: Some(ChartSpec {
                    date_field: "month".into(),
                    amount_field: "amount".into(),
                    category_field: "category".into(),
                }),
                ..Self::base(
                    name,
                    "Cost Forecast",
                    vec![
                        ColumnDef::text("month", "Month"),
                        ColumnDef::text("category", "Category"),
                        ColumnDef::number("amount", "Amount"),
                    ],
                    "month",
                )
            },
            other => return Err(Error::unknown_view(other)),
        };
        Ok(schema)
    }

    pub fn column(&self, key: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.key == key)
    }

    /// First failing local check for a name, if any
    pub fn check_name(&self, value: &str) -> Option<String> {
        self.validators.iter().find_map(|v| v.check(value))
    }
}
