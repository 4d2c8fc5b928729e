//! Pagination: fixed-height pages over the rendered content and a text
//! preview per page for the thumbnail rail.
//!
//! Blocks are credited to the page containing their vertical midpoint and
//! never split between previews, even when the real page break falls inside
//! the block.

use crate::measure::{Measurer, Viewport};
use core_doc::Document;
use tracing::{debug, trace};

pub const DEFAULT_PAGE_HEIGHT: f32 = 1056.0;
pub const DEFAULT_PREVIEW_WORDS: usize = 35;
/// Smallest page height a paginator accepts.
pub const MIN_PAGE_HEIGHT: f32 = 1.0;
/// Upper bound on the page count, whatever the content height.
pub const MAX_PAGES: usize = 100_000;
const ELLIPSIS: char = '\u{2026}';

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub index: usize,
    pub height_start: f32,
    pub height_end: f32,
    pub text_preview: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated { page_count: usize, changed: bool },
    /// No layout yet; the previous pages were kept.
    LayoutUnavailable,
}

/// `max(1, ceil(total / page_height))`, capped at `MAX_PAGES`. Degenerate
/// inputs give one page.
pub fn page_count_for(total_height: f32, page_height: f32) -> usize {
    if page_height.is_nan() || page_height <= 0.0 || !total_height.is_finite() || total_height <= 0.0 {
        return 1;
    }
    let pages = (total_height / page_height).ceil();
    if pages >= MAX_PAGES as f32 {
        return MAX_PAGES;
    }
    (pages as usize).max(1)
}

/// Page holding content-space `y`, clamped into `[0, page_count)`.
pub fn page_for_offset(y: f32, page_height: f32, page_count: usize) -> usize {
    let last = page_count.saturating_sub(1);
    if page_height.is_nan() || page_height <= 0.0 || y.is_nan() || y <= 0.0 {
        return 0;
    }
    ((y / page_height).floor() as usize).min(last)
}

/// Collapse whitespace and keep the first `max_words` words, marking a cut
/// with an ellipsis.
pub fn preview_text(text: &str, max_words: usize) -> String {
    let mut words = text.split_whitespace();
    let mut out = words
        .by_ref()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ");
    if words.next().is_some() {
        out.push(ELLIPSIS);
    }
    out
}

#[derive(Debug, Clone)]
pub struct Paginator {
    page_height: f32,
    max_words: usize,
    page_count: usize,
    pages: Vec<Page>,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_HEIGHT, DEFAULT_PREVIEW_WORDS)
    }
}

impl Paginator {
    pub fn new(page_height: f32, max_words: usize) -> Self {
        let page_height = if page_height.is_finite() && page_height > 0.0 {
            page_height.max(MIN_PAGE_HEIGHT)
        } else {
            DEFAULT_PAGE_HEIGHT
        };
        let mut p = Self {
            page_height,
            max_words: max_words.max(1),
            page_count: 1,
            pages: Vec::new(),
        };
        p.pages = p.empty_pages();
        p
    }

    pub fn page_height(&self) -> f32 {
        self.page_height
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn snippets(&self) -> Vec<&str> {
        self.pages.iter().map(|p| p.text_preview.as_str()).collect()
    }

    /// Page holding content-space `y` under the current page count.
    pub fn page_at(&self, y: f32) -> usize {
        page_for_offset(y, self.page_height, self.page_count)
    }

    /// Content-space top of `page` (clamped to the last page).
    pub fn page_top(&self, page: usize) -> f32 {
        page.min(self.page_count - 1) as f32 * self.page_height
    }

    /// Update the page count from the total content height. Returns true
    /// when it changed.
    pub fn recompute(&mut self, total_height: f32) -> bool {
        let count = page_count_for(total_height, self.page_height);
        let changed = count != self.page_count;
        self.page_count = count;
        if changed {
            let mut pages = self.empty_pages();
            for (new, old) in pages.iter_mut().zip(&self.pages) {
                new.text_preview.clone_from(&old.text_preview);
            }
            self.pages = pages;
            trace!(target: "layout.pages", total_height, page_count = count, "page_count_changed");
        }
        changed
    }

    /// Recompute pages and previews from the current layout. Without layout
    /// the previous result stays in place.
    pub fn refresh(&mut self, doc: &Document, measurer: &dyn Measurer) -> RefreshOutcome {
        let Some(viewport) = measurer.viewport() else {
            debug!(target: "layout.pages", "layout_unavailable");
            return RefreshOutcome::LayoutUnavailable;
        };
        let changed = self.recompute(viewport.scroll_height);
        self.pages = self.build_previews(doc, measurer, &viewport);
        debug!(
            target: "layout.pages",
            page_count = self.page_count,
            total_height = viewport.scroll_height,
            "pages_refreshed"
        );
        RefreshOutcome::Updated {
            page_count: self.page_count,
            changed,
        }
    }

    fn empty_pages(&self) -> Vec<Page> {
        (0..self.page_count)
            .map(|index| Page {
                index,
                height_start: index as f32 * self.page_height,
                height_end: (index + 1) as f32 * self.page_height,
                text_preview: String::new(),
            })
            .collect()
    }

    fn build_previews(
        &self,
        doc: &Document,
        measurer: &dyn Measurer,
        viewport: &Viewport,
    ) -> Vec<Page> {
        let mut buckets: Vec<Vec<String>> = vec![Vec::new(); self.page_count];
        let mut text_blocks = 0usize;
        for child in doc.children(doc.root()) {
            if doc.tag(*child).is_none() {
                continue;
            }
            let text = doc.text_content(*child);
            if text.trim().is_empty() {
                continue;
            }
            text_blocks += 1;
            let Some(rect) = measurer.block_rect(*child) else {
                trace!(target: "layout.pages", "block_unmeasured");
                continue;
            };
            let midpoint = viewport.to_content(rect.top) + rect.height / 2.0;
            let bucket = self.page_at(midpoint);
            buckets[bucket].push(text);
        }
        if text_blocks == 0 {
            buckets[0].push(doc.text_content(doc.root()));
        }
        let mut pages = self.empty_pages();
        for (page, texts) in pages.iter_mut().zip(buckets) {
            page.text_preview = preview_text(&texts.join(" "), self.max_words);
        }
        pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::{StackedMeasurer, StackedMetrics, Unrendered};
    use core_doc::markup::from_markup;
    use pretty_assertions::assert_eq;

    #[test]
    fn count_is_ceiling_with_floor_of_one() {
        assert_eq!(page_count_for(0.0, 100.0), 1);
        assert_eq!(page_count_for(100.0, 100.0), 1);
        assert_eq!(page_count_for(100.5, 100.0), 2);
        assert_eq!(page_count_for(f32::NAN, 100.0), 1);
        assert_eq!(page_count_for(500.0, 0.0), 1);
        assert_eq!(page_count_for(2000.0, 1e-30), MAX_PAGES);
        assert_eq!(page_count_for(f32::MAX, 1.0), MAX_PAGES);
    }

    #[test]
    fn tiny_page_height_is_raised_to_minimum() {
        let mut p = Paginator::new(f32::MIN_POSITIVE, 35);
        assert_eq!(p.page_height(), MIN_PAGE_HEIGHT);
        assert!(p.recompute(2000.0));
        assert_eq!(p.page_count(), 2000);
        assert_eq!(p.pages().len(), 2000);
        assert_eq!(p.page_top(5_000), 1999.0);
    }

    #[test]
    fn non_finite_page_height_uses_default() {
        assert_eq!(Paginator::new(f32::INFINITY, 35).page_height(), DEFAULT_PAGE_HEIGHT);
        assert_eq!(Paginator::new(f32::NAN, 35).page_height(), DEFAULT_PAGE_HEIGHT);
    }

    #[test]
    fn offsets_clamp_into_range() {
        assert_eq!(page_for_offset(-5.0, 100.0, 3), 0);
        assert_eq!(page_for_offset(150.0, 100.0, 3), 1);
        assert_eq!(page_for_offset(10_000.0, 100.0, 3), 2);
    }

    #[test]
    fn preview_truncates_with_marker() {
        assert_eq!(preview_text("  a \n b\tc  ", 5), "a b c");
        assert_eq!(preview_text("one two three", 2), "one two\u{2026}");
        assert_eq!(preview_text("", 2), "");
    }

    #[test]
    fn unavailable_layout_keeps_previous_pages() {
        let doc = from_markup("<p>a</p>");
        let mut p = Paginator::new(100.0, 35);
        p.recompute(350.0);
        let before = p.page_count();
        assert_eq!(p.refresh(&doc, &Unrendered), RefreshOutcome::LayoutUnavailable);
        assert_eq!(p.page_count(), before);
    }

    #[test]
    fn blocks_bucket_by_midpoint() {
        // Each block is one 20px line plus a 5px gap: tops at 0, 25, 50, 75.
        let doc = from_markup("<p>alpha</p><p>beta</p><p>gamma</p><p>delta</p>");
        let mut m = StackedMeasurer::new(
            StackedMetrics {
                chars_per_line: 40,
                line_height: 20.0,
                block_gap: 5.0,
            },
            40.0,
        );
        m.layout(&doc);
        m.set_scroll_top(30.0);
        let mut p = Paginator::new(40.0, 35);
        let out = p.refresh(&doc, &m);
        assert_eq!(
            out,
            RefreshOutcome::Updated {
                page_count: 3,
                changed: true
            }
        );
        // Midpoints 10, 35, 60, 85: scroll position does not matter.
        assert_eq!(p.snippets(), vec!["alpha beta", "gamma", "delta"]);
        assert_eq!(p.pages()[2].height_start, 80.0);
    }

    #[test]
    fn bare_text_goes_to_first_page() {
        let doc = core_doc::Document::fragment_from_plain_text("just\nsome words");
        let mut m = StackedMeasurer::new(StackedMetrics::default(), 500.0);
        m.layout(&doc);
        let mut p = Paginator::default();
        p.refresh(&doc, &m);
        assert_eq!(p.snippets(), vec!["just some words"]);
    }
}
