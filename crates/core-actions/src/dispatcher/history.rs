//! Undo / redo and the explicit save gesture.

use super::DispatchResult;
use core_events::Tick;
use core_model::EditorModel;

pub(crate) fn handle_undo(model: &mut EditorModel, now: Tick) -> DispatchResult {
    if model.undo(now) {
        tracing::trace!(target: "actions.dispatch", op = "undo", can_redo = model.can_redo(), "history");
        DispatchResult::changed()
    } else {
        DispatchResult::clean()
    }
}

pub(crate) fn handle_redo(model: &mut EditorModel, now: Tick) -> DispatchResult {
    if model.redo(now) {
        tracing::trace!(target: "actions.dispatch", op = "redo", can_undo = model.can_undo(), "history");
        DispatchResult::changed()
    } else {
        DispatchResult::clean()
    }
}

pub(crate) fn handle_save(model: &mut EditorModel) -> DispatchResult {
    let markup = model.save();
    tracing::debug!(target: "actions.dispatch", op = "save", bytes = markup.len(), "saved");
    DispatchResult::dirty()
}
