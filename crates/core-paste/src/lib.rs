//! Paste import: sanitizing rich clipboard markup and choosing what to insert.
//!
//! The clipboard can offer several flavours at once. `plan_paste` picks the
//! richest usable one:
//! 1. sanitized markup, when it still has text or an image after cleanup
//! 2. the plain-text flavour, lines separated by line-break nodes
//! 3. a lone image as a `data:image/...` URI
//! 4. nothing, in which case the paste is a no-op

use core_doc::markup::from_markup;
use core_doc::{Document, NodeKind};
use tracing::debug;

pub mod sanitize;

pub use sanitize::{clean_style, extract_fragment, sanitize};

/// The flavours a clipboard event carried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardPayload {
    pub html: Option<String>,
    pub text: Option<String>,
    /// Image data already encoded as a `data:` URI.
    pub image: Option<String>,
}

impl ClipboardPayload {
    pub fn html(markup: impl Into<String>) -> Self {
        Self {
            html: Some(markup.into()),
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug)]
pub enum PastePlan {
    /// Sanitized markup parsed into a fragment.
    Markup(Document),
    /// Plain text converted into text segments and line breaks.
    PlainText(Document),
    Image(String),
    Nothing,
}

impl PastePlan {
    pub fn kind(&self) -> &'static str {
        match self {
            PastePlan::Markup(_) => "markup",
            PastePlan::PlainText(_) => "plain_text",
            PastePlan::Image(_) => "image",
            PastePlan::Nothing => "nothing",
        }
    }

    /// The fragment to splice in, if this plan inserts nodes.
    pub fn fragment(&self) -> Option<&Document> {
        match self {
            PastePlan::Markup(doc) | PastePlan::PlainText(doc) => Some(doc),
            PastePlan::Image(_) | PastePlan::Nothing => None,
        }
    }
}

pub fn plan_paste(payload: &ClipboardPayload) -> PastePlan {
    let plan = choose(payload);
    debug!(
        target: "paste.sanitize",
        has_html = payload.html.is_some(),
        has_text = payload.text.is_some(),
        has_image = payload.image.is_some(),
        plan = plan.kind(),
        "paste_planned"
    );
    plan
}

fn choose(payload: &ClipboardPayload) -> PastePlan {
    if let Some(html) = &payload.html {
        let cleaned = sanitize(html);
        if !cleaned.is_empty() {
            let doc = from_markup(&cleaned);
            if has_content(&doc) {
                return PastePlan::Markup(doc);
            }
        }
    }
    if let Some(text) = payload.text.as_deref().filter(|t| !t.trim().is_empty()) {
        return PastePlan::PlainText(Document::fragment_from_plain_text(text));
    }
    if let Some(uri) = payload
        .image
        .as_deref()
        .filter(|u| u.starts_with("data:image/"))
    {
        return PastePlan::Image(uri.to_string());
    }
    PastePlan::Nothing
}

/// Any non-whitespace text or an image somewhere in the fragment.
fn has_content(doc: &Document) -> bool {
    let root = doc.root();
    doc.descendants(root).into_iter().any(|n| match doc.kind(n) {
        NodeKind::Text(t) => !t.trim().is_empty(),
        NodeKind::Element { tag, .. } => tag == "img",
        NodeKind::LineBreak => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_doc::PositionMap;
    use core_doc::markup::to_markup;
    use pretty_assertions::assert_eq;

    #[test]
    fn markup_flavour_preferred() {
        let payload = ClipboardPayload {
            html: Some("<b>bold</b>".into()),
            text: Some("bold".into()),
            image: None,
        };
        match plan_paste(&payload) {
            PastePlan::Markup(doc) => assert_eq!(to_markup(&doc), "<b>bold</b>"),
            other => panic!("unexpected plan {other:?}"),
        }
    }

    #[test]
    fn empty_markup_falls_back_to_plain_text() {
        let payload = ClipboardPayload {
            html: Some("<p><span>&nbsp;</span></p><style>x{}</style>".into()),
            text: Some("line one\nline two".into()),
            image: None,
        };
        let plan = plan_paste(&payload);
        assert_eq!(plan.kind(), "plain_text");
        let doc = plan.fragment().unwrap();
        assert_eq!(to_markup(doc), "line one<br>line two");
        assert_eq!(PositionMap::build(doc).full_text(), "line one\nline two");
    }

    #[test]
    fn image_only_clipboard() {
        let payload = ClipboardPayload {
            image: Some("data:image/png;base64,AAAA".into()),
            ..ClipboardPayload::default()
        };
        assert!(matches!(plan_paste(&payload), PastePlan::Image(uri) if uri.ends_with("AAAA")));
    }

    #[test]
    fn nothing_usable_is_a_no_op() {
        assert_eq!(plan_paste(&ClipboardPayload::default()).kind(), "nothing");
        assert_eq!(plan_paste(&ClipboardPayload::text("  \n ")).kind(), "nothing");
        let remote = ClipboardPayload {
            image: Some("https://example.com/x.png".into()),
            ..ClipboardPayload::default()
        };
        assert_eq!(plan_paste(&remote).kind(), "nothing");
    }

    #[test]
    fn markup_with_only_an_image_is_kept() {
        let plan = plan_paste(&ClipboardPayload::html(
            "<p><img src=\"data:image/gif;base64,R0\"></p>",
        ));
        assert_eq!(plan.kind(), "markup");
    }
}
