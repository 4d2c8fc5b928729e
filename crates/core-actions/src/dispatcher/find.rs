//! Find bar handling.

use super::DispatchResult;
use crate::Action;
use core_events::Tick;
use core_model::EditorModel;
use core_search::ReplaceOutcome;

pub(crate) fn handle_find(action: Action, model: &mut EditorModel, now: Tick) -> DispatchResult {
    match action {
        Action::SetQuery(query) => {
            let count = model.set_query(&query);
            tracing::debug!(target: "actions.dispatch", op = "set_query", count, "find");
            DispatchResult::dirty()
        }
        Action::FindNext => moved(model.find_next().is_some()),
        Action::FindPrev => moved(model.find_prev().is_some()),
        Action::ReplaceOne(replacement) => replaced(model.replace_one(&replacement, now)),
        Action::ReplaceAll(replacement) => replaced(model.replace_all(&replacement, now)),
        _ => DispatchResult::clean(),
    }
}

fn moved(found: bool) -> DispatchResult {
    if found {
        DispatchResult::dirty()
    } else {
        DispatchResult::clean()
    }
}

fn replaced(outcome: ReplaceOutcome) -> DispatchResult {
    match outcome {
        ReplaceOutcome::Replaced { count } if count > 0 => DispatchResult::changed(),
        ReplaceOutcome::Replaced { .. } | ReplaceOutcome::NoMatch => DispatchResult::clean(),
        // Matches were cleared; the count shown by the find bar changed.
        ReplaceOutcome::Aborted => DispatchResult::dirty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::EditorSettings;
    use pretty_assertions::assert_eq;

    #[test]
    fn cycling_wraps_around() {
        let mut m = EditorModel::from_markup("<p>a b a b a</p>", EditorSettings::default());
        handle_find(Action::SetQuery("A".into()), &mut m, Tick::ZERO);
        assert_eq!(m.match_count(), 3);
        assert_eq!(m.active_match_index(), 1);
        handle_find(Action::FindPrev, &mut m, Tick::ZERO);
        assert_eq!(m.active_match_index(), 3);
        handle_find(Action::FindNext, &mut m, Tick::ZERO);
        assert_eq!(m.active_match_index(), 1);
    }

    #[test]
    fn replace_without_query_is_clean() {
        let mut m = EditorModel::from_markup("<p>text</p>", EditorSettings::default());
        let r = handle_find(Action::ReplaceAll("x".into()), &mut m, Tick::ZERO);
        assert_eq!(r, DispatchResult::clean());
        assert_eq!(m.markup(), "<p>text</p>");
    }

    #[test]
    fn replace_all_marks_document_changed() {
        let mut m = EditorModel::from_markup("<p>cat and cat</p>", EditorSettings::default());
        handle_find(Action::SetQuery("cat".into()), &mut m, Tick::ZERO);
        let r = handle_find(Action::ReplaceAll("dog".into()), &mut m, Tick::ZERO);
        assert!(r.document_changed);
        assert_eq!(m.text(), "dog and dog\n");
    }
}
