//! HTML rendering of a [`TableView`]

use super::{render_table, TableBody, TableView};
use crate::state::{NoticeLevel, PanelState};

/// Render the panel document
pub fn render_html(state: &PanelState) -> String {
    let view = render_table(state);
    let mut out = String::new();

    out.push_str(&format!(
        "<section class=\"panel\" data-view=\"{}\"{}>\n",
        escape(&state.schema.name),
        if view.busy { " aria-busy=\"true\"" } else { "" }
    ));
    out.push_str(&format!("<h1>{}</h1>\n", escape(&view.title)));

    if let Some(notice) = &view.notice {
        let class = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        out.push_str(&format!(
            "<div class=\"notice {}\">{}<button data-action=\"dismiss\">×</button></div>\n",
            class,
            escape(&notice.text)
        ));
    }

    if let Some(progress) = &view.progress {
        let percent = progress.percent.unwrap_or(0.0);
        out.push_str(&format!(
            "<div class=\"progress\" data-operation=\"{}\"><progress max=\"100\" value=\"{:.0}\"></progress><span>{}</span></div>\n",
            escape(&progress.operation),
            percent,
            escape(progress.step.as_deref().unwrap_or("Starting")),
        ));
    }

    if let Some(form) = &view.name_form {
        out.push_str(&format!(
            "<form class=\"add-item\"><input name=\"name\" value=\"{}\"><button type=\"submit\"{}>Add</button>",
            escape(&form.value),
            if view.submit_enabled { "" } else { " disabled" }
        ));
        if let Some(message) = &form.message {
            out.push_str(&format!(
                "<span class=\"validation\">{}</span>",
                escape(message)
            ));
        }
        out.push_str("</form>\n");
    }

    push_table(&mut out, &view);

    out.push_str(&format!(
        "<nav class=\"pager\"><button data-action=\"prev\"{}>Previous</button><span>{}</span><button data-action=\"next\"{}>Next</button></nav>\n",
        if view.pager.prev_enabled { "" } else { " disabled" },
        escape(&view.pager.label),
        if view.pager.next_enabled { "" } else { " disabled" }
    ));

    if let Some(chart) = view.chart.as_ref().filter(|c| !c.is_empty()) {
        out.push_str("<table class=\"chart\">\n<thead><tr><th>Category</th>");
        for label in chart.labels() {
            out.push_str(&format!("<th>{}</th>", escape(&label)));
        }
        out.push_str("</tr></thead>\n<tbody>\n");
        for (category, values) in &chart.series {
            out.push_str(&format!("<tr><td>{}</td>", escape(category)));
            for value in values {
                out.push_str(&format!("<td>{:.2}</td>", value));
            }
            out.push_str("</tr>\n");
        }
        out.push_str("<tr class=\"total\"><td>Total</td>");
        for total in &chart.totals {
            out.push_str(&format!("<td>{:.2}</td>", total));
        }
        out.push_str("</tr>\n</tbody>\n</table>\n");
    }

    out.push_str("</section>\n");
    out
}

fn push_table(out: &mut String, view: &TableView) {
    let span = view.headers.len().max(1);
    out.push_str("<table>\n<thead><tr>");
    for header in &view.headers {
        out.push_str(&format!("<th>{}</th>", escape(header)));
    }
    out.push_str("</tr></thead>\n<tbody>\n");

    match &view.body {
        TableBody::Loading => out.push_str(&format!(
            "<tr class=\"loading\"><td colspan=\"{}\">Loading…</td></tr>\n",
            span
        )),
        TableBody::Empty(message) => out.push_str(&format!(
            "<tr class=\"empty\"><td colspan=\"{}\">{}</td></tr>\n",
            span,
            escape(message)
        )),
        TableBody::Failed(message) => out.push_str(&format!(
            "<tr class=\"error\"><td colspan=\"{}\">{}</td></tr>\n",
            span,
            escape(message)
        )),
        TableBody::Rows(rows) => {
            for row in rows {
                let key = row
                    .key
                    .as_deref()
                    .map(|k| format!(" data-key=\"{}\"", escape(k)))
                    .unwrap_or_default();
                let selected = if row.selected { " class=\"selected\"" } else { "" };
                out.push_str(&format!("<tr{}{}>", key, selected));
                for cell in &row.cells {
                    out.push_str(&format!("<td>{}</td>", escape(cell)));
                }
                out.push_str("</tr>\n");
            }
        }
    }
    out.push_str("</tbody>\n</table>\n");
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::view::ViewSchema;
    use panelkit_host::test_utils::items;
    use serde_json::json;

    fn state(view: &str) -> PanelState {
        PanelState::new(ViewSchema::builtin(view).unwrap(), &Settings::default())
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_cells_are_escaped() {
        let mut state = state("Pages");
        state.apply_dataset(
            items(vec![json!({"name": "<script>alert(1)</script>"})]),
            1,
            None,
            None,
        );
        let html = render_html(&state);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_loading_row_before_data() {
        let html = render_html(&state("Pages"));
        assert!(html.contains("class=\"loading\""));
        assert!(!html.contains("class=\"empty\""));
    }

    #[test]
    fn test_empty_row_and_disabled_pager() {
        let mut state = state("Workflows");
        state.apply_dataset(vec![], 0, Some(1), None);
        let html = render_html(&state);
        assert!(html.contains("<tr class=\"empty\"><td colspan=\"2\">No workflows found</td></tr>"));
        assert!(html.contains("<button data-action=\"prev\" disabled>"));
        assert!(html.contains("<button data-action=\"next\" disabled>"));
        assert!(html.contains("Page 1 of 1"));
        assert!(html.contains("<button type=\"submit\" disabled>"));
    }

    #[test]
    fn test_download_progress_has_no_cancel_button() {
        let mut state = state("FabricationRequests");
        state.operation.start(panelkit_host::DOWNLOAD_OPERATION);
        let html = render_html(&state);
        assert!(html.contains("data-operation=\"downloadFabricationResults\""));
        assert!(html.contains("<span>Starting</span>"));
        assert!(!html.contains("data-action=\"cancel\""));

        state.operation.progress(
            panelkit_host::DOWNLOAD_OPERATION,
            "Downloading",
            25.0,
            "1 of 4",
        );
        let html = render_html(&state);
        assert!(html.contains("value=\"25\""));
        assert!(!html.contains("data-action=\"cancel\""));
    }

    #[test]
    fn test_same_state_same_html() {
        let mut state = state("Pages");
        let rows = items(vec![json!({"name": "A"}), json!({"name": "B"})]);
        state.apply_dataset(rows.clone(), 2, Some(1), None);
        let first = render_html(&state);
        state.apply_dataset(rows, 2, Some(1), None);
        assert_eq!(render_html(&state), first);
        assert_eq!(first.matches("<tr data-key").count(), 2);
    }
}
