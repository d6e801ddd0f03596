//! Pure filter and sort over held rows
//!
//! Neither function touches the held set; both return new vectors so the
//! panel can re-run them with different inputs without asking the host again.

use std::collections::BTreeMap;

use panelkit_core::{cell_text, compare_cells, Item, SortSpec};

use crate::view::{ColumnDef, ColumnKind};

/// Column key to needle; empty needles are ignored
pub type FilterMap = BTreeMap<String, String>;

/// Rows whose cells contain every needle, case-insensitively
pub fn apply_filter(items: &[Item], filters: &FilterMap) -> Vec<Item> {
    let needles: Vec<(&str, String)> = filters
        .iter()
        .map(|(key, needle)| (key.as_str(), needle.trim().to_lowercase()))
        .filter(|(_, needle)| !needle.is_empty())
        .collect();

    items
        .iter()
        .filter(|item| {
            needles.iter().all(|(key, needle)| {
                cell_text(item.get(*key)).to_lowercase().contains(needle.as_str())
            })
        })
        .cloned()
        .collect()
}

/// Stable sort by one column
///
/// Number columns compare numerically, text columns case-insensitively;
/// missing cells go last.
pub fn sort_items(items: &[Item], sort: &SortSpec, columns: &[ColumnDef]) -> Vec<Item> {
    let numeric = columns
        .iter()
        .find(|c| c.key == sort.column)
        .is_some_and(|c| c.kind == ColumnKind::Number);

    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| {
        compare_cells(
            a.get(&sort.column),
            b.get(&sort.column),
            numeric,
            sort.direction,
        )
    });
    sorted
}
