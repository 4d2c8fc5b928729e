//! Content mutation: typing, deletion, paste and toolbar formatting.
//!
//! Every edit goes through `EditorModel`, which builds a fresh position map
//! and routes the change into history, layout and update debouncing. A
//! `DocError` leaves the tree untouched and the action is reported as
//! rejected.

use super::DispatchResult;
use crate::Action;
use core_doc::DocError;
use core_events::Tick;
use core_model::{EditorModel, PasteResult};

pub(crate) fn handle_edit(action: Action, model: &mut EditorModel, now: Tick) -> DispatchResult {
    let name = action.name();
    let outcome = match action {
        Action::InsertText { at, text } => {
            if text.is_empty() {
                return DispatchResult::clean();
            }
            model.insert_text(at, &text, now).map(|_| true)
        }
        Action::DeleteRange { start, end } => model.delete_range(start, end, now).map(|_| true),
        Action::Paste { at, payload } => model
            .paste(at, &payload, now)
            .map(|r| r != PasteResult::Nothing),
        Action::ApplyInlineStyle { start, end, style } => {
            let mut wrapped = 0;
            for tag in style.tags() {
                match model.apply_inline_style(start, end, tag, now) {
                    Ok(n) => wrapped += n,
                    Err(e) => return rejected(name, e),
                }
            }
            Ok(wrapped > 0)
        }
        Action::SetBlockType { at, block } => {
            model.set_block_type(at, block.tag(), now).map(|_| true)
        }
        Action::InsertLink { start, end, url } => {
            if url.trim().is_empty() {
                return DispatchResult::rejected();
            }
            model.insert_link(start, end, url.trim(), now).map(|_| true)
        }
        Action::InsertImage { at, data_uri } => model.insert_image(at, &data_uri, now).map(|_| true),
        _ => return DispatchResult::clean(),
    };
    match outcome {
        Ok(true) => DispatchResult::changed(),
        Ok(false) => DispatchResult::clean(),
        Err(e) => rejected(name, e),
    }
}

fn rejected(op: &'static str, err: DocError) -> DispatchResult {
    tracing::warn!(target: "actions.dispatch", op, %err, "edit_rejected");
    DispatchResult::rejected()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlockType, InlineStyle};
    use core_config::EditorSettings;
    use core_paste::ClipboardPayload;
    use pretty_assertions::assert_eq;

    fn model(markup: &str) -> EditorModel {
        EditorModel::from_markup(markup, EditorSettings::default())
    }

    #[test]
    fn combined_styles_nest_outermost_first() {
        let mut m = model("<p>big news</p>");
        let r = handle_edit(
            Action::ApplyInlineStyle {
                start: 0,
                end: 3,
                style: InlineStyle::BOLD | InlineStyle::ITALIC,
            },
            &mut m,
            Tick::ZERO,
        );
        assert!(r.document_changed);
        assert_eq!(m.markup(), "<p><strong><em>big</em></strong> news</p>");
    }

    #[test]
    fn non_data_image_is_rejected() {
        let mut m = model("<p>a</p>");
        let r = handle_edit(
            Action::InsertImage {
                at: 0,
                data_uri: "https://example.com/cat.png".into(),
            },
            &mut m,
            Tick::ZERO,
        );
        assert!(r.rejected);
        assert_eq!(m.markup(), "<p>a</p>");
    }

    #[test]
    fn data_image_is_inserted() {
        let mut m = model("<p>ab</p>");
        let r = handle_edit(
            Action::InsertImage {
                at: 1,
                data_uri: "data:image/png;base64,AAAA".into(),
            },
            &mut m,
            Tick::ZERO,
        );
        assert!(r.document_changed);
        assert_eq!(
            m.markup(),
            "<p>a<img src=\"data:image/png;base64,AAAA\">b</p>"
        );
    }

    #[test]
    fn empty_paste_and_empty_insert_are_clean() {
        let mut m = model("<p>a</p>");
        let paste = Action::Paste {
            at: 0,
            payload: ClipboardPayload::default(),
        };
        assert_eq!(handle_edit(paste, &mut m, Tick::ZERO), DispatchResult::clean());
        let insert = Action::InsertText {
            at: 0,
            text: String::new(),
        };
        assert_eq!(handle_edit(insert, &mut m, Tick::ZERO), DispatchResult::clean());
        assert!(!m.has_unsaved_changes());
    }

    #[test]
    fn block_type_changes_containing_block() {
        let mut m = model("<p>one</p><p>two</p>");
        let r = handle_edit(
            Action::SetBlockType {
                at: 5,
                block: BlockType::Blockquote,
            },
            &mut m,
            Tick::ZERO,
        );
        assert!(r.document_changed);
        assert_eq!(m.markup(), "<p>one</p><blockquote>two</blockquote>");
    }

    #[test]
    fn out_of_range_delete_is_rejected() {
        let mut m = model("<p>abc</p>");
        let r = handle_edit(
            Action::DeleteRange { start: 1, end: 40 },
            &mut m,
            Tick::ZERO,
        );
        assert_eq!(r, DispatchResult::rejected());
    }
}
