use core_doc::markup::from_markup;
use core_doc::{Document, PositionMap};
use core_search::{FindSession, ReplaceOutcome, find_all, replace_all};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

proptest! {
    #[test]
    fn matches_ascend_without_overlap(text in "[abAB ]{0,40}", query in "[ab]{1,3}") {
        let found = find_all(&text, &query);
        let mut prev_end = 0;
        for m in &found {
            prop_assert!(m.start >= prev_end);
            prop_assert_eq!(m.len(), query.len());
            prop_assert!(text[m.start..m.end].eq_ignore_ascii_case(&query));
            prev_end = m.end;
        }
    }

    #[test]
    fn replace_all_leaves_no_match_when_replacement_is_foreign(
        words in prop::collection::vec("[a-c]{1,4}", 1..12),
        query in "[a-c]{1,2}",
    ) {
        let markup: String = words
            .iter()
            .enumerate()
            .map(|(i, w)| if i % 3 == 0 { format!("<em>{w}</em> ") } else { format!("{w} ") })
            .collect();
        let mut doc = from_markup(&format!("<p>{markup}</p>"));
        let before = find_all(PositionMap::build(&doc).full_text(), &query).len();
        let outcome = replace_all(&mut doc, &query, "Z");
        let after = PositionMap::build(&doc).into_text();
        prop_assert!(find_all(&after, &query).is_empty());
        prop_assert_eq!(after.matches('Z').count(), before);
        if before == 0 {
            prop_assert_eq!(outcome, ReplaceOutcome::NoMatch);
        } else {
            prop_assert_eq!(outcome, ReplaceOutcome::Replaced { count: before });
        }
    }
}

#[test]
fn replace_spanning_two_paragraphs() {
    let mut doc = from_markup("<p>end of one</p><p>two starts</p>");
    let mut s = FindSession::new();
    s.set_query("one\ntwo", &PositionMap::build(&doc));
    assert_eq!(s.match_count(), 1);
    assert_eq!(s.replace_active(&mut doc, "+"), ReplaceOutcome::Replaced { count: 1 });
    assert_eq!(
        PositionMap::build(&doc).full_text(),
        "end of +\n starts\n"
    );
}

#[test]
fn plain_text_document_counts() {
    let doc = Document::from_plain_text("the cat\n\nThe hat");
    let mut s = FindSession::new();
    s.set_query("THE", &PositionMap::build(&doc));
    assert_eq!(s.match_count(), 2);
}
