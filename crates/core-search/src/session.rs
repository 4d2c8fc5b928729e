use crate::{Match, ReplaceOutcome, find_all, replace_all, replace_one};
use core_doc::{Document, PositionMap};
use tracing::{debug, trace};

/// Find bar state: the current query, its matches in the last flattened
/// text, and which match is active.
///
/// Matches are tied to the document generation they were computed at.
/// Any operation that would act on matches from an older generation
/// discards them instead.
#[derive(Debug, Default, Clone)]
pub struct FindSession {
    query: String,
    matches: Vec<Match>,
    active: Option<usize>,
    generation: Option<u64>,
}

impl FindSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// Zero-based index of the active match.
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active_match(&self) -> Option<Match> {
        self.active.and_then(|i| self.matches.get(i).copied())
    }

    /// One-based position for "3 of 7" style counters; 0 when nothing is
    /// active.
    pub fn active_display_index(&self) -> usize {
        self.active.map_or(0, |i| i + 1)
    }

    /// True when the stored matches were computed against `doc` as it is now.
    pub fn is_current(&self, doc: &Document) -> bool {
        self.generation == Some(doc.generation())
    }

    /// Start a new search. The first match (if any) becomes active.
    pub fn set_query(&mut self, query: &str, map: &PositionMap) {
        self.query = query.to_string();
        self.run(map);
        self.active = if self.matches.is_empty() { None } else { Some(0) };
        debug!(
            target: "search",
            query_len = query.len(),
            matches = self.matches.len(),
            "query_set"
        );
    }

    /// Recompute matches for the current query after the text changed. The
    /// active index is kept when it is still in range.
    pub fn refresh(&mut self, map: &PositionMap) {
        if self.query.is_empty() {
            self.clear_matches();
            self.generation = Some(map.generation());
            return;
        }
        self.run(map);
        self.active = match self.active {
            _ if self.matches.is_empty() => None,
            Some(i) if i < self.matches.len() => Some(i),
            Some(_) | None => Some(0),
        };
        trace!(target: "search", matches = self.matches.len(), "matches_refreshed");
    }

    /// Drop the query and every match.
    pub fn clear(&mut self) {
        self.query.clear();
        self.clear_matches();
    }

    fn clear_matches(&mut self) {
        self.matches.clear();
        self.active = None;
        self.generation = None;
    }

    fn run(&mut self, map: &PositionMap) {
        self.matches = find_all(map.full_text(), &self.query);
        self.generation = Some(map.generation());
    }

    /// Advance to the next match, wrapping from last to first.
    pub fn find_next(&mut self) -> Option<Match> {
        let n = self.matches.len();
        if n == 0 {
            return None;
        }
        let next = self.active.map_or(0, |i| (i + 1) % n);
        self.active = Some(next);
        self.active_match()
    }

    /// Step back to the previous match, wrapping from first to last.
    pub fn find_prev(&mut self) -> Option<Match> {
        let n = self.matches.len();
        if n == 0 {
            return None;
        }
        let prev = self.active.map_or(n - 1, |i| (i + n - 1) % n);
        self.active = Some(prev);
        self.active_match()
    }

    /// Replace the active match, then re-run the query so the session
    /// reflects the edited text.
    pub fn replace_active(&mut self, doc: &mut Document, replacement: &str) -> ReplaceOutcome {
        let Some(m) = self.active_match() else {
            return ReplaceOutcome::NoMatch;
        };
        if !self.is_current(doc) {
            debug!(target: "search", "stale_matches_discarded");
            self.clear_matches();
            return ReplaceOutcome::Aborted;
        }
        let map = PositionMap::build(doc);
        let outcome = replace_one(doc, &map, m, replacement);
        if matches!(outcome, ReplaceOutcome::Aborted) {
            self.clear_matches();
            return outcome;
        }
        self.refresh(&PositionMap::build(doc));
        outcome
    }

    /// Replace every occurrence of the query and re-run it.
    pub fn replace_all(&mut self, doc: &mut Document, replacement: &str) -> ReplaceOutcome {
        if self.query.is_empty() {
            return ReplaceOutcome::NoMatch;
        }
        let outcome = replace_all(doc, &self.query, replacement);
        self.refresh(&PositionMap::build(doc));
        outcome
    }
}
