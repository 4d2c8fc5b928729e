//! Markup parsing and serialization.
//!
//! The parser is deliberately forgiving: it never fails. Stray closing tags are
//! ignored, unclosed elements are closed at end of input, comments, doctype
//! and processing instructions are skipped, and `<br>` becomes a
//! `NodeKind::LineBreak`. Text and attribute values are entity-decoded.
//!
//! The serializer emits a canonical form (lowercase tags, double-quoted
//! attributes, minimal escaping). Canonical output parses back into an
//! identical tree, so `to_markup(&from_markup(&to_markup(doc)))` equals
//! `to_markup(doc)`; history snapshots rely on this.

use crate::{Attr, Document, NodeId, NodeKind};

pub const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

/// Parse markup into a fresh document. Top-level nodes become children of
/// the root.
pub fn from_markup(markup: &str) -> Document {
    let mut doc = Document::new();
    let mut stack: Vec<(String, NodeId)> = Vec::new();
    let bytes = markup.as_bytes();
    let mut pos = 0usize;

    while pos < markup.len() {
        let Some(rel) = markup[pos..].find('<') else {
            push_text(&mut doc, &stack, &markup[pos..]);
            break;
        };
        if rel > 0 {
            push_text(&mut doc, &stack, &markup[pos..pos + rel]);
        }
        let lt = pos + rel;
        let rest = &markup[lt..];

        if rest.starts_with("<!--") {
            pos = match rest[4..].find("-->") {
                Some(end) => lt + 4 + end + 3,
                None => markup.len(),
            };
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            pos = skip_past_gt(markup, lt);
            continue;
        }
        if let Some(after) = rest.strip_prefix("</") {
            let name_len = after
                .find(|c: char| c == '>' || c.is_whitespace())
                .unwrap_or(after.len());
            let name = after[..name_len].to_ascii_lowercase();
            if let Some(depth) = stack.iter().rposition(|(tag, _)| *tag == name) {
                stack.truncate(depth);
            }
            pos = skip_past_gt(markup, lt);
            continue;
        }
        let starts_tag = bytes.get(lt + 1).is_some_and(|b| b.is_ascii_alphabetic());
        if !starts_tag {
            push_text(&mut doc, &stack, "<");
            pos = lt + 1;
            continue;
        }

        let (tag, attrs, self_closing, next) = parse_open_tag(markup, lt + 1);
        pos = next;
        let parent = stack.last().map(|(_, id)| *id).unwrap_or(doc.root());
        if tag == "br" {
            let br = doc.create_line_break();
            doc.append_child(parent, br);
            continue;
        }
        let el = doc.create_element(tag.clone(), attrs);
        doc.append_child(parent, el);
        if self_closing || is_void_tag(&tag) {
            continue;
        }
        if RAW_TEXT_TAGS.contains(&tag.as_str()) {
            let close = format!("</{tag}");
            let lower = markup[pos..].to_ascii_lowercase();
            let end = lower.find(&close).map(|i| pos + i).unwrap_or(markup.len());
            if end > pos {
                let t = doc.create_text(&markup[pos..end]);
                doc.append_child(el, t);
            }
            pos = if end < markup.len() {
                skip_past_gt(markup, end)
            } else {
                end
            };
            continue;
        }
        stack.push((tag, el));
    }
    doc
}

fn push_text(doc: &mut Document, stack: &[(String, NodeId)], raw: &str) {
    if raw.is_empty() {
        return;
    }
    let parent = stack.last().map(|(_, id)| *id).unwrap_or(doc.root());
    let decoded = html_escape::decode_html_entities(raw);
    // Merge with a preceding text sibling so comments never split segments.
    if let Some(last) = doc.children(parent).last().copied()
        && let Some(existing) = doc.text_mut(last)
    {
        existing.push_str(&decoded);
        doc.bump();
        return;
    }
    let t = doc.create_text(decoded.into_owned());
    doc.append_child(parent, t);
}

fn skip_past_gt(markup: &str, from: usize) -> usize {
    match markup[from..].find('>') {
        Some(i) => from + i + 1,
        None => markup.len(),
    }
}

/// Parse `name attr=value ...>` starting right after `<`. Returns the
/// lowercased tag, attributes, self-closing flag and the position after `>`.
fn parse_open_tag(markup: &str, start: usize) -> (String, Vec<Attr>, bool, usize) {
    let bytes = markup.as_bytes();
    let mut i = start;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    let tag = markup[start..i].to_ascii_lowercase();
    let mut attrs: Vec<Attr> = Vec::new();
    let mut self_closing = false;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        match bytes[i] {
            b'>' => {
                i += 1;
                break;
            }
            b'/' => {
                self_closing = true;
                i += 1;
                continue;
            }
            _ => {}
        }
        self_closing = false;
        let name_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        if i == name_start {
            // Lone '=' or similar junk; skip a byte to guarantee progress.
            i += 1;
            continue;
        }
        let name = markup[name_start..i].to_ascii_lowercase();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut value = String::new();
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let quote = bytes[i] as char;
                let vstart = i + 1;
                let vend = markup[vstart..]
                    .find(quote)
                    .map(|e| vstart + e)
                    .unwrap_or(markup.len());
                value = html_escape::decode_html_entities(&markup[vstart..vend]).into_owned();
                i = (vend + 1).min(markup.len());
            } else {
                let vstart = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
                value = html_escape::decode_html_entities(&markup[vstart..i]).into_owned();
            }
        }
        if !attrs.iter().any(|a| a.name == name) {
            attrs.push(Attr { name, value });
        }
    }
    (tag, attrs, self_closing, i)
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b':' | b'-' | b'_')
}

/// Serialize the children of the root.
pub fn to_markup(doc: &Document) -> String {
    let mut out = String::new();
    for child in doc.children(doc.root()) {
        write_node(doc, *child, &mut out, false);
    }
    out
}

/// Serialize a single node and its subtree.
pub fn node_markup(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out, false);
    out
}

fn write_node(doc: &Document, id: NodeId, out: &mut String, raw: bool) {
    match doc.kind(id) {
        NodeKind::Text(text) => {
            if raw {
                out.push_str(text);
            } else {
                out.push_str(&html_escape::encode_text(text));
            }
        }
        NodeKind::LineBreak => out.push_str("<br>"),
        NodeKind::Element { tag, attrs } => {
            out.push('<');
            out.push_str(tag);
            for attr in attrs {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                out.push_str(&html_escape::encode_double_quoted_attribute(&attr.value));
                out.push('"');
            }
            out.push('>');
            if is_void_tag(tag) {
                return;
            }
            let raw_children = RAW_TEXT_TAGS.contains(&tag.as_str());
            for child in doc.children(id) {
                write_node(doc, *child, out, raw_children);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}
