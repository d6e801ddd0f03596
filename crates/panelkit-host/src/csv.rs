//! CSV rendering for exported rows

use panelkit_core::{cell_text, Item};

/// Build CSV text from rows
///
/// The header is the union of all keys in first-seen order. Missing cells
/// are empty. Lines end with `\n`.
pub fn build_csv(items: &[Item]) -> String {
    let mut columns: Vec<&str> = Vec::new();
    for item in items {
        for key in item.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }
    if columns.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    push_row(&mut out, columns.iter().map(|c| c.to_string()));
    for item in items {
        push_row(&mut out, columns.iter().map(|c| cell_text(item.get(*c))));
    }
    out
}

fn push_row(out: &mut String, cells: impl Iterator<Item = String>) {
    let line: Vec<String> = cells.map(|c| escape_field(&c)).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
