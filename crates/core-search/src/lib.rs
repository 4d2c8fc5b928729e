//! Case-insensitive find / replace over the flattened document text.
//!
//! Matching is non-overlapping and leftmost-first: after a match at `i` the
//! scan resumes at `i + match_len`, so `"aa"` in `"aaa"` matches once. Offsets
//! are byte offsets into `PositionMap::full_text`.
//!
//! Replacement resolves offsets back into tree coordinates through a map
//! that must be current for the document. A stale map aborts the operation
//! and leaves the tree untouched.

use core_doc::{DocError, Document, PositionMap};
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

pub mod session;

pub use session::FindSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub start: usize,
    pub end: usize,
}

impl Match {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    Replaced { count: usize },
    /// Nothing matched; the tree is unchanged.
    NoMatch,
    /// Offsets no longer address the tree; the tree is unchanged.
    Aborted,
}

impl ReplaceOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, ReplaceOutcome::Replaced { count } if *count > 0)
    }
}

fn matcher(query: &str) -> Option<Regex> {
    match RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => Some(re),
        Err(err) => {
            warn!(target: "search", query_len = query.len(), %err, "query_rejected");
            None
        }
    }
}

/// Every case-insensitive occurrence of `query` in ascending order. An empty
/// query matches nothing.
pub fn find_all(text: &str, query: &str) -> Vec<Match> {
    if query.is_empty() {
        return Vec::new();
    }
    let Some(re) = matcher(query) else {
        return Vec::new();
    };
    re.find_iter(text)
        .map(|m| Match {
            start: m.start(),
            end: m.end(),
        })
        .collect()
}

/// Replace a single match previously found in `map.full_text()`.
pub fn replace_one(
    doc: &mut Document,
    map: &PositionMap,
    m: Match,
    replacement: &str,
) -> ReplaceOutcome {
    match doc.replace_range(map, m.start, m.end, replacement) {
        Ok(_) => {
            debug!(target: "search", start = m.start, end = m.end, "replaced_one");
            ReplaceOutcome::Replaced { count: 1 }
        }
        Err(err) => abort(err),
    }
}

/// Replace every occurrence of `query`. All matches are computed first and
/// then rewritten last-to-first so earlier offsets stay valid.
pub fn replace_all(doc: &mut Document, query: &str, replacement: &str) -> ReplaceOutcome {
    let map = PositionMap::build(doc);
    let matches = find_all(map.full_text(), query);
    if matches.is_empty() {
        return ReplaceOutcome::NoMatch;
    }
    let ranges: Vec<(usize, usize)> = matches.iter().map(|m| (m.start, m.end)).collect();
    match doc.replace_ranges(&map, &ranges, replacement) {
        Ok(0) => ReplaceOutcome::Aborted,
        Ok(count) => {
            debug!(target: "search", found = matches.len(), count, "replaced_all");
            ReplaceOutcome::Replaced { count }
        }
        Err(err) => abort(err),
    }
}

fn abort(err: DocError) -> ReplaceOutcome {
    debug!(target: "search", %err, "replace_aborted");
    ReplaceOutcome::Aborted
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_doc::markup::{from_markup, to_markup};
    use pretty_assertions::assert_eq;

    fn spans(v: &[Match]) -> Vec<(usize, usize)> {
        v.iter().map(|m| (m.start, m.end)).collect()
    }

    #[test]
    fn non_overlapping_leftmost_first() {
        assert_eq!(spans(&find_all("aaaa", "aa")), vec![(0, 2), (2, 4)]);
        assert_eq!(spans(&find_all("aaa", "aa")), vec![(0, 2)]);
    }

    #[test]
    fn case_insensitive_and_literal() {
        let text = "Hello world. Hello there.";
        assert_eq!(spans(&find_all(text, "hello")), vec![(0, 5), (13, 18)]);
        assert_eq!(spans(&find_all("a.b axb", "a.b")), vec![(0, 3)]);
    }

    #[test]
    fn empty_query_finds_nothing() {
        assert!(find_all("anything", "").is_empty());
    }

    #[test]
    fn unicode_offsets_are_byte_offsets() {
        let m = find_all("Ünïcode ÜNÏ", "ünï");
        assert_eq!(spans(&m), vec![(0, 5), (10, 15)]);
    }

    #[test]
    fn replace_all_cat_dog() {
        let mut doc = Document::fragment_from_plain_text("cat sat on the cat mat");
        let out = replace_all(&mut doc, "cat", "dog");
        assert_eq!(out, ReplaceOutcome::Replaced { count: 2 });
        assert_eq!(PositionMap::build(&doc).full_text(), "dog sat on the dog mat");
    }

    #[test]
    fn replace_all_across_formatting() {
        let mut doc = from_markup("<p>Hel<b>lo</b> you, hello</p>");
        replace_all(&mut doc, "hello", "hi");
        // The partially covered <b> survives, emptied.
        assert_eq!(to_markup(&doc), "<p>hi<b></b> you, hi</p>");
    }

    #[test]
    fn replace_one_with_stale_map_aborts() {
        let mut doc = from_markup("<p>one two</p>");
        let map = PositionMap::build(&doc);
        let m = find_all(map.full_text(), "two")[0];
        doc.insert_text(&map, 0, ">").unwrap();
        let before = to_markup(&doc);
        assert_eq!(replace_one(&mut doc, &map, m, "2"), ReplaceOutcome::Aborted);
        assert_eq!(to_markup(&doc), before);
    }

    #[test]
    fn replace_all_without_matches() {
        let mut doc = from_markup("<p>abc</p>");
        assert_eq!(replace_all(&mut doc, "zzz", "y"), ReplaceOutcome::NoMatch);
        assert_eq!(replace_all(&mut doc, "", "y"), ReplaceOutcome::NoMatch);
    }
}
