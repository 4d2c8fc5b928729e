//! Plain-text and JSON renderings of model state for the CLI.

use anyhow::Result;
use core_layout::{StackedMeasurer, StackedMetrics};
use core_model::EditorModel;
use core_search::find_all;
use serde::Serialize;
use std::fmt::Write as _;

const CONTEXT_BYTES: usize = 24;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageReport {
    /// One-based page number.
    pub page: usize,
    pub height_start: f32,
    pub height_end: f32,
    pub preview: String,
}

/// Lay the document out with the stacked estimator (one page tall viewport)
/// and refresh pagination.
pub fn paginate(model: &mut EditorModel) -> StackedMeasurer {
    let page_height = model.settings().page_height;
    let mut measurer = StackedMeasurer::new(StackedMetrics::default(), page_height);
    measurer.layout(model.document());
    model.relayout(&measurer);
    measurer
}

pub fn stats_report(model: &EditorModel) -> String {
    let s = model.stats();
    let mut out = String::new();
    let _ = writeln!(out, "words:               {}", s.words);
    let _ = writeln!(out, "characters:          {}", s.characters);
    let _ = writeln!(out, "characters (no ws):  {}", s.characters_no_spaces);
    let _ = writeln!(out, "paragraphs:          {}", s.paragraphs);
    let _ = writeln!(out, "reading time (min):  {}", s.reading_minutes);
    out
}

pub fn page_reports(model: &EditorModel) -> Vec<PageReport> {
    model
        .pages()
        .iter()
        .map(|p| PageReport {
            page: p.index + 1,
            height_start: p.height_start,
            height_end: p.height_end,
            preview: p.text_preview.clone(),
        })
        .collect()
}

pub fn pages_text(pages: &[PageReport]) -> String {
    let mut out = String::new();
    for p in pages {
        let _ = writeln!(out, "page {:>3}  {}", p.page, p.preview);
    }
    out
}

pub fn pages_json(pages: &[PageReport]) -> Result<String> {
    Ok(serde_json::to_string_pretty(pages)?)
}

/// Match count followed by one line of context per match.
pub fn find_report(text: &str, query: &str) -> String {
    let matches = find_all(text, query);
    let mut out = String::new();
    let _ = writeln!(out, "{} match(es)", matches.len());
    for m in &matches {
        let from = floor_boundary(text, m.start.saturating_sub(CONTEXT_BYTES));
        let to = ceil_boundary(text, (m.end + CONTEXT_BYTES).min(text.len()));
        let context = format!(
            "{}[{}]{}",
            &text[from..m.start],
            &text[m.start..m.end],
            &text[m.end..to]
        )
        .replace('\n', " ");
        let _ = writeln!(out, "{:>8}..{:<8} {}", m.start, m.end, context.trim());
    }
    out
}

/// One-line session status.
pub fn status_line(model: &EditorModel) -> String {
    let matches = if model.find_session().query().is_empty() {
        "-".to_string()
    } else {
        format!("{}/{}", model.active_match_index(), model.match_count())
    };
    format!(
        "page {}/{} | matches {} | undo {} | redo {}{}",
        model.active_page() + 1,
        model.page_count(),
        matches,
        yes_no(model.can_undo()),
        yes_no(model.can_redo()),
        if model.has_unsaved_changes() {
            " | unsaved"
        } else {
            ""
        }
    )
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

fn floor_boundary(s: &str, mut i: usize) -> usize {
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_boundary(s: &str, mut i: usize) -> usize {
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::EditorSettings;
    use pretty_assertions::assert_eq;

    #[test]
    fn find_report_shows_bracketed_context() {
        let out = find_report("Hello world.\nhello there.\n", "HELLO");
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], "2 match(es)");
        assert!(lines[1].ends_with("[Hello] world. hello there."));
        assert!(lines[2].ends_with("Hello world. [hello] there."));
    }

    #[test]
    fn context_respects_char_boundaries() {
        let text = format!("{}needle{}", "é".repeat(20), "ü".repeat(20));
        let out = find_report(&text, "needle");
        assert!(out.contains("[needle]"));
    }

    #[test]
    fn pages_serialize_with_one_based_numbers() {
        let mut model = EditorModel::from_markup("<p>one</p><p>two</p>", EditorSettings::default());
        paginate(&mut model);
        let pages = page_reports(&model);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page, 1);
        assert_eq!(pages[0].preview, "one two");
        let json = pages_json(&pages).unwrap();
        assert!(json.contains("\"preview\": \"one two\""));
        assert_eq!(pages_text(&pages), "page   1  one two\n");
    }

    #[test]
    fn status_line_reflects_model() {
        let mut model = EditorModel::from_markup("<p>a a</p>", EditorSettings::default());
        assert_eq!(status_line(&model), "page 1/1 | matches - | undo no | redo no");
        model.set_query("a");
        assert_eq!(status_line(&model), "page 1/1 | matches 1/2 | undo no | redo no");
    }

    #[test]
    fn stats_report_lists_counts() {
        let model = EditorModel::from_markup("<p>one two</p><p>three</p>", EditorSettings::default());
        let out = stats_report(&model);
        assert!(out.contains("words:               3"));
        assert!(out.contains("paragraphs:          2"));
    }
}
