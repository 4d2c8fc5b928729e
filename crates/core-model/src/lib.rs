//! Editor model: one open manuscript and everything derived from it.
//!
//! `EditorModel` owns the document tree together with its history, pages,
//! active-page tracker and find session. Nothing else holds onto tree nodes;
//! offset-addressed requests come in, a fresh `PositionMap` is built for each
//! one, and the resulting mutation flows through a single content-changed
//! path that
//! * feeds the history debounce (500 ms by default),
//! * restarts the layout debounce (150 ms) and
//! * restarts the update-notification debounce (300 ms).
//!
//! Time is explicit. Callers pass `now` into every mutation and call `tick`
//! to fire due timers; `next_deadline` says when the next one is due.
//!
//! Invariants (hold after every public call):
//! * The history always contains at least the seeded snapshot.
//! * `page_count() >= 1` and `active_page() < page_count()` once pages have
//!   been refreshed.
//! * Find matches are either current for the document or empty.

use core_config::EditorSettings;
use core_doc::markup::{from_markup, to_markup};
use core_doc::{Attr, DocError, Document, PositionMap, TextStats};
use core_events::{Debouncer, EditorObserver, Tick, UpdatePayload, earliest};
use core_layout::{Measurer, Page, PageTracker, Paginator, RefreshOutcome};
use core_paste::{ClipboardPayload, PastePlan, plan_paste};
use core_search::{FindSession, Match, ReplaceOutcome};
use core_state::HistoryManager;
use std::path::Path;
use tracing::{debug, info};

mod bootstrap;

pub use bootstrap::{DocumentFormat, load_document, write_markup};

/// What a tick fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub snapshot: bool,
    pub relayout: bool,
    pub pages_changed: bool,
    pub updated: bool,
    pub lock_released: bool,
}

impl TickReport {
    pub fn any(&self) -> bool {
        self.snapshot || self.relayout || self.updated || self.lock_released
    }
}

/// Which clipboard flavour a paste ended up inserting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteResult {
    Markup,
    PlainText,
    Image,
    Nothing,
}

pub struct EditorModel {
    doc: Document,
    history: HistoryManager,
    pages: Paginator,
    tracker: PageTracker,
    find: FindSession,
    layout_timer: Debouncer,
    update_timer: Debouncer,
    settings: EditorSettings,
    observers: Vec<Box<dyn EditorObserver>>,
    unsaved: bool,
}

impl EditorModel {
    pub fn new(doc: Document, settings: EditorSettings) -> Self {
        let mut history = HistoryManager::new(settings.history_capacity, settings.history_debounce);
        history.seed(to_markup(&doc));
        info!(
            target: "model",
            generation = doc.generation(),
            capacity = settings.history_capacity,
            "model_created"
        );
        Self {
            doc,
            history,
            pages: Paginator::new(settings.page_height, settings.preview_words),
            tracker: PageTracker::new(settings.jump_lock),
            find: FindSession::new(),
            layout_timer: Debouncer::new("layout", settings.resize_debounce),
            update_timer: Debouncer::new("update", settings.update_debounce),
            settings,
            observers: Vec::new(),
            unsaved: false,
        }
    }

    pub fn from_markup(markup: &str, settings: EditorSettings) -> Self {
        Self::new(from_markup(markup), settings)
    }

    /// Open a manuscript from disk, picking the reader by extension.
    pub fn open(path: &Path, settings: EditorSettings) -> anyhow::Result<Self> {
        let (doc, format) = load_document(path)?;
        info!(target: "model", path = %path.display(), ?format, "document_opened");
        Ok(Self::new(doc, settings))
    }

    pub fn add_observer(&mut self, observer: Box<dyn EditorObserver>) {
        self.observers.push(observer);
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn find_session(&self) -> &FindSession {
        &self.find
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    // ---- exposed views -------------------------------------------------

    /// Flattened text, as analyzers and statistics see it.
    pub fn text(&self) -> String {
        PositionMap::build(&self.doc).into_text()
    }

    pub fn markup(&self) -> String {
        to_markup(&self.doc)
    }

    pub fn stats(&self) -> TextStats {
        TextStats::compute(&self.text(), self.settings.words_per_minute)
    }

    pub fn page_count(&self) -> usize {
        self.pages.page_count()
    }

    pub fn active_page(&self) -> usize {
        self.tracker.active_page()
    }

    pub fn pages(&self) -> &[Page] {
        self.pages.pages()
    }

    pub fn page_snippets(&self) -> Vec<&str> {
        self.pages.snippets()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn match_count(&self) -> usize {
        self.find.match_count()
    }

    /// One-based index of the active match, 0 when none.
    pub fn active_match_index(&self) -> usize {
        self.find.active_display_index()
    }

    pub fn active_match(&self) -> Option<Match> {
        self.find.active_match()
    }

    // ---- editing -------------------------------------------------------

    pub fn insert_text(&mut self, at: usize, text: &str, now: Tick) -> Result<(), DocError> {
        if text.is_empty() {
            return Ok(());
        }
        let map = PositionMap::build(&self.doc);
        self.doc.insert_text(&map, at, text)?;
        self.content_changed(now, "insert_text");
        Ok(())
    }

    pub fn delete_range(&mut self, start: usize, end: usize, now: Tick) -> Result<(), DocError> {
        let map = PositionMap::build(&self.doc);
        self.doc.delete_range(&map, start, end)?;
        self.content_changed(now, "delete_range");
        Ok(())
    }

    /// Insert clipboard content at `at`. A paste with nothing usable leaves
    /// the document untouched.
    pub fn paste(
        &mut self,
        at: usize,
        payload: &ClipboardPayload,
        now: Tick,
    ) -> Result<PasteResult, DocError> {
        let plan = plan_paste(payload);
        let map = PositionMap::build(&self.doc);
        let result = match &plan {
            PastePlan::Markup(fragment) => {
                self.doc.insert_fragment(&map, at, fragment)?;
                PasteResult::Markup
            }
            PastePlan::PlainText(fragment) => {
                self.doc.insert_fragment(&map, at, fragment)?;
                PasteResult::PlainText
            }
            PastePlan::Image(uri) => {
                self.doc.insert_image(&map, at, uri)?;
                PasteResult::Image
            }
            PastePlan::Nothing => return Ok(PasteResult::Nothing),
        };
        self.content_changed(now, "paste");
        Ok(result)
    }

    /// Wrap `[start, end)` in an inline formatting tag.
    pub fn apply_inline_style(
        &mut self,
        start: usize,
        end: usize,
        tag: &str,
        now: Tick,
    ) -> Result<usize, DocError> {
        let map = PositionMap::build(&self.doc);
        let wrapped = self.doc.wrap_range(&map, start, end, tag, Vec::new())?;
        if !wrapped.is_empty() {
            self.content_changed(now, "inline_style");
        }
        Ok(wrapped.len())
    }

    pub fn set_block_type(&mut self, at: usize, tag: &str, now: Tick) -> Result<(), DocError> {
        let map = PositionMap::build(&self.doc);
        self.doc.set_block_tag(&map, at, tag)?;
        self.content_changed(now, "block_type");
        Ok(())
    }

    /// Link `[start, end)` to `url`. A collapsed range inserts the url as
    /// its own link text.
    pub fn insert_link(
        &mut self,
        start: usize,
        end: usize,
        url: &str,
        now: Tick,
    ) -> Result<(), DocError> {
        let end = if start == end {
            let map = PositionMap::build(&self.doc);
            self.doc.insert_text(&map, start, url)?;
            start + url.len()
        } else {
            end
        };
        let map = PositionMap::build(&self.doc);
        self.doc
            .wrap_range(&map, start, end, "a", vec![Attr::new("href", url)])?;
        self.content_changed(now, "insert_link");
        Ok(())
    }

    pub fn insert_image(&mut self, at: usize, data_uri: &str, now: Tick) -> Result<(), DocError> {
        let map = PositionMap::build(&self.doc);
        self.doc.insert_image(&map, at, data_uri)?;
        self.content_changed(now, "insert_image");
        Ok(())
    }

    // ---- find / replace ------------------------------------------------

    pub fn set_query(&mut self, query: &str) -> usize {
        let map = PositionMap::build(&self.doc);
        self.find.set_query(query, &map);
        self.find.match_count()
    }

    pub fn find_next(&mut self) -> Option<Match> {
        self.find.find_next()
    }

    pub fn find_prev(&mut self) -> Option<Match> {
        self.find.find_prev()
    }

    pub fn replace_one(&mut self, replacement: &str, now: Tick) -> ReplaceOutcome {
        let outcome = self.find.replace_active(&mut self.doc, replacement);
        if outcome.changed() {
            self.content_changed(now, "replace_one");
        }
        outcome
    }

    pub fn replace_all(&mut self, replacement: &str, now: Tick) -> ReplaceOutcome {
        let outcome = self.find.replace_all(&mut self.doc, replacement);
        if outcome.changed() {
            self.content_changed(now, "replace_all");
        }
        outcome
    }

    // ---- history -------------------------------------------------------

    /// Step back one snapshot. A pending snapshot is committed first so the
    /// latest burst of edits can itself be undone.
    pub fn undo(&mut self, now: Tick) -> bool {
        let doc = &self.doc;
        self.history.flush_pending(|| to_markup(doc));
        let Some(markup) = self.history.undo().map(|s| s.markup().to_string()) else {
            return false;
        };
        self.restore(&markup, now, "undo");
        true
    }

    pub fn redo(&mut self, now: Tick) -> bool {
        let doc = &self.doc;
        self.history.flush_pending(|| to_markup(doc));
        let Some(markup) = self.history.redo().map(|s| s.markup().to_string()) else {
            return false;
        };
        self.restore(&markup, now, "redo");
        true
    }

    fn restore(&mut self, markup: &str, now: Tick, reason: &'static str) {
        self.doc.replace_with(from_markup(markup));
        // The history is in Applying; this change is not recorded.
        self.content_changed(now, reason);
    }

    /// Explicit save gesture. Observers receive the current markup.
    pub fn save(&mut self) -> String {
        let markup = self.markup();
        for observer in &self.observers {
            observer.on_save(&markup);
        }
        self.unsaved = false;
        info!(target: "model", bytes = markup.len(), "saved");
        markup
    }

    // ---- navigation ----------------------------------------------------

    /// Returns the content-space scroll target for the host to apply.
    pub fn jump_to_page(&mut self, page: usize, now: Tick) -> f32 {
        self.tracker.jump_to_page(page, &self.pages, now)
    }

    pub fn on_scroll(&mut self, scroll_top: f32) -> Option<usize> {
        self.tracker.on_scroll(scroll_top, &self.pages)
    }

    /// Caret moved to flattened offset `caret` (`None`: outside the surface).
    pub fn on_selection_change(
        &mut self,
        caret: Option<usize>,
        measurer: &dyn Measurer,
    ) -> Option<usize> {
        let map = PositionMap::build(&self.doc);
        let point = caret.and_then(|offset| map.resolve_caret(offset));
        self.tracker
            .on_selection_change(point, &self.doc, measurer, &self.pages)
    }

    /// The surface changed size; pages are recomputed once resizing settles.
    pub fn resize(&mut self, now: Tick) {
        self.layout_timer.trigger(now);
    }

    /// Recompute pages right away. Returns true when the page count changed.
    pub fn relayout(&mut self, measurer: &dyn Measurer) -> bool {
        match self.pages.refresh(&self.doc, measurer) {
            RefreshOutcome::Updated {
                page_count,
                changed,
            } => {
                self.tracker.clamp_to(page_count);
                changed
            }
            RefreshOutcome::LayoutUnavailable => false,
        }
    }

    // ---- time ----------------------------------------------------------

    /// Fire every timer due at `now`.
    pub fn tick(&mut self, now: Tick, measurer: &dyn Measurer) -> TickReport {
        let mut report = TickReport::default();
        let doc = &self.doc;
        report.snapshot = self.history.poll(now, || to_markup(doc));
        if self.layout_timer.poll(now) {
            report.relayout = true;
            report.pages_changed = self.relayout(measurer);
        }
        if self.update_timer.poll(now) {
            self.notify_update();
            report.updated = true;
        }
        report.lock_released = self.tracker.poll(now);
        report
    }

    pub fn next_deadline(&self) -> Option<Tick> {
        earliest([
            self.history.next_deadline(),
            self.layout_timer.deadline(),
            self.update_timer.deadline(),
            self.tracker.next_deadline(),
        ])
    }

    fn notify_update(&self) {
        if self.observers.is_empty() {
            return;
        }
        let payload = UpdatePayload {
            markup: self.markup(),
            text: self.text(),
        };
        for observer in &self.observers {
            observer.on_update(&payload);
        }
        debug!(target: "model", observers = self.observers.len(), "update_notified");
    }

    fn content_changed(&mut self, now: Tick, reason: &'static str) {
        let record = self.history.record_edit(now);
        self.layout_timer.trigger(now);
        self.update_timer.trigger(now);
        self.unsaved = true;
        if !self.find.query().is_empty() && !self.find.is_current(&self.doc) {
            self.find.refresh(&PositionMap::build(&self.doc));
        }
        debug!(
            target: "model",
            reason,
            ?record,
            generation = self.doc.generation(),
            "content_changed"
        );
    }
}

impl std::fmt::Debug for EditorModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorModel")
            .field("generation", &self.doc.generation())
            .field("history_len", &self.history.len())
            .field("page_count", &self.pages.page_count())
            .field("active_page", &self.tracker.active_page())
            .field("observers", &self.observers.len())
            .finish()
    }
}
