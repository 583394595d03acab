//! Terminal output helpers for the command-line interface.

use comfy_table::{presets, Attribute, Cell, ContentArrangement, Table};
use std::io::IsTerminal;
use std::time::Duration;

use crate::models::{Record, RecordView};

/// Longest cell content shown in tables before truncation
pub const MAX_CELL_WIDTH: usize = 60;

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Shorten `text` to at most `max` characters, marking the cut with `...`
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Render records as a table with one column per field of `view`
pub fn records_table(view: &RecordView, records: &[Record]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            view.fields()
                .iter()
                .map(|f| Cell::new(f).add_attribute(Attribute::Bold)),
        );

    for record in records {
        table.add_row(
            view.fields()
                .iter()
                .map(|f| Cell::new(truncate(record.get(f).unwrap_or_default(), MAX_CELL_WIDTH))),
        );
    }
    table
}

/// Render views as a name / field count / fields table
pub fn views_table<'a>(views: impl IntoIterator<Item = &'a RecordView>, detailed: bool) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["View", "Fields", "Field list"]);

    for view in views {
        let fields = if detailed {
            view.fields().join("\n")
        } else {
            truncate(&view.to_table_fields(), MAX_CELL_WIDTH)
        };
        table.add_row(vec![
            Cell::new(view.name()).add_attribute(Attribute::Bold),
            Cell::new(view.len()),
            Cell::new(fields),
        ]);
    }
    table
}

/// Print a loading spinner with message.
pub struct Spinner {
    pb: indicatif::ProgressBar,
}

impl Spinner {
    /// Create a new spinner with the given message.
    pub fn new(msg: &str) -> Self {
        let pb = indicatif::ProgressBar::new_spinner();
        if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    /// A spinner that draws nothing, for non-interactive output
    pub fn hidden() -> Self {
        Self {
            pb: indicatif::ProgressBar::hidden(),
        }
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.pb.set_message(msg.into());
    }

    /// Stop and clear the spinner line
    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::views;
    use std::sync::Arc;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        assert_eq!(truncate("äöüäöüäöü", 6), "äöü...");
    }

    #[test]
    fn test_records_table_has_view_columns() {
        let view = RecordView::new("t", ["doi", "title"]).unwrap();
        let record = Record::from_row(Arc::new(view.clone()), ["10.1/a", "Alpha"]);

        let rendered = records_table(&view, &[record]).to_string();
        assert!(rendered.contains("doi"));
        assert!(rendered.contains("Alpha"));
    }

    #[test]
    fn test_views_table_lists_registry() {
        let rendered = views_table(views().iter(), false).to_string();
        assert!(rendered.contains("basic"));
        assert!(rendered.contains("full"));
    }
}
