//! Dispatcher applying `Action` to an `EditorModel`.
//!
//! Sub-modules:
//! * `edit`     - content mutation (typing, deletion, paste, formatting)
//! * `find`     - find bar: query, cycling, replace
//! * `history`  - undo / redo / save
//! * `navigate` - page jumps, scroll and caret tracking, resize
//! * `command_parser` - text commands for scripted sessions

use crate::{Action, ActionObserver};
use core_events::Tick;
use core_layout::Measurer;
use core_model::EditorModel;

pub mod command_parser;
mod edit;
mod find;
mod history;
mod navigate;

/// Result of dispatching a single `Action`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DispatchResult {
    /// Something visible changed; the host should repaint.
    pub dirty: bool,
    /// The document tree was mutated.
    pub document_changed: bool,
    /// Surface geometry is stale; lay the document out again before the
    /// next tick.
    pub relayout: bool,
    /// The action was refused (bad offsets, unsupported input).
    pub rejected: bool,
    /// Content-space scroll target the host should apply.
    pub scroll_to: Option<f32>,
}

impl DispatchResult {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn dirty() -> Self {
        Self {
            dirty: true,
            ..Self::default()
        }
    }

    pub fn changed() -> Self {
        Self {
            dirty: true,
            document_changed: true,
            relayout: true,
            ..Self::default()
        }
    }

    pub fn rejected() -> Self {
        Self {
            rejected: true,
            ..Self::default()
        }
    }

    pub fn scroll_to(y: f32) -> Self {
        Self {
            dirty: true,
            scroll_to: Some(y),
            ..Self::default()
        }
    }
}

/// Apply an action at virtual time `now`. `measurer` answers geometry
/// questions for caret tracking.
pub fn dispatch(
    action: Action,
    model: &mut EditorModel,
    now: Tick,
    measurer: &dyn Measurer,
    observers: &[Box<dyn ActionObserver>],
) -> DispatchResult {
    for obs in observers {
        obs.on_action(&action);
    }
    let name = action.name();
    let result = match action {
        Action::InsertText { .. }
        | Action::DeleteRange { .. }
        | Action::Paste { .. }
        | Action::ApplyInlineStyle { .. }
        | Action::SetBlockType { .. }
        | Action::InsertLink { .. }
        | Action::InsertImage { .. } => edit::handle_edit(action, model, now),
        Action::SetQuery(_)
        | Action::FindNext
        | Action::FindPrev
        | Action::ReplaceOne(_)
        | Action::ReplaceAll(_) => find::handle_find(action, model, now),
        Action::Undo => history::handle_undo(model, now),
        Action::Redo => history::handle_redo(model, now),
        Action::Save => history::handle_save(model),
        Action::JumpToPage(page) => navigate::handle_jump(page, model, now),
        Action::Scroll(y) => navigate::handle_scroll(y, model),
        Action::SelectionChanged(caret) => navigate::handle_selection(caret, model, measurer),
        Action::Resize => navigate::handle_resize(model, now),
    };
    tracing::trace!(
        target: "actions.dispatch",
        action = name,
        dirty = result.dirty,
        document_changed = result.document_changed,
        rejected = result.rejected,
        "dispatched"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::EditorSettings;
    use core_layout::Unrendered;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Names(Rc<RefCell<Vec<&'static str>>>);

    impl ActionObserver for Names {
        fn on_action(&self, action: &Action) {
            self.0.borrow_mut().push(action.name());
        }
    }

    #[test]
    fn observers_see_every_action() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let observers: Vec<Box<dyn ActionObserver>> = vec![Box::new(Names(seen.clone()))];
        let mut model = EditorModel::from_markup("<p>a</p>", EditorSettings::default());
        dispatch(Action::FindNext, &mut model, Tick::ZERO, &Unrendered, &observers);
        dispatch(Action::Undo, &mut model, Tick::ZERO, &Unrendered, &observers);
        assert_eq!(*seen.borrow(), vec!["find_next", "undo"]);
    }

    #[test]
    fn constructors_set_expected_flags() {
        let c = DispatchResult::changed();
        assert!(c.dirty && c.document_changed && c.relayout && !c.rejected);
        assert_eq!(DispatchResult::scroll_to(3.0).scroll_to, Some(3.0));
        assert!(!DispatchResult::rejected().dirty);
    }
}
