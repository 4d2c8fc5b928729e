//! Editor actions: the closed set of things a toolbar, find bar, navigation
//! rail or scripted session can ask the model to do, and the dispatcher
//! that applies them.
//!
//! Offsets are UTF-8 byte offsets into the flattened text (see
//! `core_doc::PositionMap`). Page indices are zero-based.

use bitflags::bitflags;
use core_paste::ClipboardPayload;
use std::fmt;
use std::str::FromStr;

mod dispatcher;

pub use dispatcher::command_parser::{HELP, ParsedCommand, parse_command};
pub use dispatcher::{DispatchResult, dispatch};

bitflags! {
    /// Inline formatting applied over a range.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InlineStyle: u8 {
        const BOLD      = 0b0001;
        const ITALIC    = 0b0010;
        const UNDERLINE = 0b0100;
        const STRIKE    = 0b1000;
    }
}

impl InlineStyle {
    /// Wrapper tags for every set flag, outermost first.
    pub fn tags(self) -> Vec<&'static str> {
        [
            (InlineStyle::BOLD, "strong"),
            (InlineStyle::ITALIC, "em"),
            (InlineStyle::UNDERLINE, "u"),
            (InlineStyle::STRIKE, "s"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, tag)| tag)
        .collect()
    }

    /// Parse `bold+italic` style names. Unknown names yield `None`.
    pub fn parse(names: &str) -> Option<Self> {
        let mut style = InlineStyle::empty();
        for name in names.split('+').map(str::trim) {
            style |= match name.to_ascii_lowercase().as_str() {
                "bold" | "b" | "strong" => InlineStyle::BOLD,
                "italic" | "i" | "em" => InlineStyle::ITALIC,
                "underline" | "u" => InlineStyle::UNDERLINE,
                "strike" | "s" | "strikethrough" => InlineStyle::STRIKE,
                _ => return None,
            };
        }
        (!style.is_empty()).then_some(style)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    Blockquote,
    Preformatted,
}

impl BlockType {
    pub fn tag(self) -> &'static str {
        match self {
            BlockType::Paragraph => "p",
            BlockType::Heading1 => "h1",
            BlockType::Heading2 => "h2",
            BlockType::Heading3 => "h3",
            BlockType::Blockquote => "blockquote",
            BlockType::Preformatted => "pre",
        }
    }
}

impl FromStr for BlockType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "p" => Ok(BlockType::Paragraph),
            "h1" => Ok(BlockType::Heading1),
            "h2" => Ok(BlockType::Heading2),
            "h3" => Ok(BlockType::Heading3),
            "blockquote" => Ok(BlockType::Blockquote),
            "pre" => Ok(BlockType::Preformatted),
            other => Err(format!("unsupported block type '{other}'")),
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    InsertText { at: usize, text: String },
    DeleteRange { start: usize, end: usize },
    Paste { at: usize, payload: ClipboardPayload },
    Undo,
    Redo,
    Save,
    SetQuery(String),
    FindNext,
    FindPrev,
    ReplaceOne(String),
    ReplaceAll(String),
    ApplyInlineStyle { start: usize, end: usize, style: InlineStyle },
    SetBlockType { at: usize, block: BlockType },
    InsertLink { start: usize, end: usize, url: String },
    InsertImage { at: usize, data_uri: String },
    JumpToPage(usize),
    /// The scroll container moved to this content-space offset.
    Scroll(f32),
    /// The caret moved to a flattened offset; `None` when the selection
    /// left the editing surface.
    SelectionChanged(Option<usize>),
    Resize,
}

impl Action {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Action::InsertText { .. } => "insert_text",
            Action::DeleteRange { .. } => "delete_range",
            Action::Paste { .. } => "paste",
            Action::Undo => "undo",
            Action::Redo => "redo",
            Action::Save => "save",
            Action::SetQuery(_) => "set_query",
            Action::FindNext => "find_next",
            Action::FindPrev => "find_prev",
            Action::ReplaceOne(_) => "replace_one",
            Action::ReplaceAll(_) => "replace_all",
            Action::ApplyInlineStyle { .. } => "inline_style",
            Action::SetBlockType { .. } => "block_type",
            Action::InsertLink { .. } => "insert_link",
            Action::InsertImage { .. } => "insert_image",
            Action::JumpToPage(_) => "jump_to_page",
            Action::Scroll(_) => "scroll",
            Action::SelectionChanged(_) => "selection_changed",
            Action::Resize => "resize",
        }
    }
}

/// Hook notified before each action is applied.
pub trait ActionObserver {
    fn on_action(&self, action: &Action);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn style_tags_in_fixed_order() {
        let s = InlineStyle::STRIKE | InlineStyle::BOLD;
        assert_eq!(s.tags(), vec!["strong", "s"]);
        assert!(InlineStyle::empty().tags().is_empty());
    }

    #[test]
    fn style_names_parse() {
        assert_eq!(
            InlineStyle::parse("bold+italic"),
            Some(InlineStyle::BOLD | InlineStyle::ITALIC)
        );
        assert_eq!(InlineStyle::parse("U"), Some(InlineStyle::UNDERLINE));
        assert_eq!(InlineStyle::parse("bold+blink"), None);
    }

    #[test]
    fn block_types_are_limited() {
        assert_eq!("H2".parse::<BlockType>(), Ok(BlockType::Heading2));
        assert!("h4".parse::<BlockType>().is_err());
        assert_eq!(BlockType::Blockquote.to_string(), "blockquote");
    }
}
