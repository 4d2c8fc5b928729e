//! Clipboard markup cleanup.
//!
//! Office suites and browsers put a whole document on the clipboard: a
//! platform header, `<html>`/`<head>` boilerplate, conditional comments,
//! `mso-*` styling and `<o:p>` paragraph markers. `sanitize` reduces that to
//! the fragment that was actually copied, with only the presentation a
//! manuscript can use.
//! Script-capable markup (event handlers, `javascript:` URLs, frames and
//! plugins) never survives.
//!
//! String-level steps locate the fragment; everything after that runs on the
//! parsed tree so malformed input never needs special casing.

use core_doc::markup::{from_markup, to_markup};
use core_doc::{Attr, Document, NodeId, NodeKind};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, trace};

/// Elements removed together with their content.
const NON_CONTENT_TAGS: &[&str] = &[
    "style", "script", "head", "title", "meta", "link", "xml", "base", "noscript", "template",
    "iframe", "object", "embed", "frame", "frameset", "applet",
];

/// URL schemes that run code when followed or loaded.
const SCRIPT_SCHEMES: &[&str] = &["javascript:", "vbscript:"];

/// Document wrappers replaced by their children.
const DOCUMENT_TAGS: &[&str] = &["html", "body"];

/// Inline wrappers that carry nothing once their attributes are gone.
const WRAPPER_TAGS: &[&str] = &["span", "font"];

/// Class values written by foreign editors.
const FOREIGN_CLASS_MARKERS: &[&str] = &["mso", "apple-"];

const START_FRAGMENT: &str = "<!--StartFragment-->";
const END_FRAGMENT: &str = "<!--EndFragment-->";

fn compiled(cell: &'static OnceLock<Option<Regex>>, src: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(src).ok()).as_ref()
}

/// One comment or one whole tag. Quoted attribute values are consumed with
/// the tag, so markup-like text inside them never starts a match.
fn tag_token() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(
        &RE,
        r#"(?s)<!--.*?-->|<(/?)([A-Za-z][A-Za-z0-9:_-]*)(?:[^>"']|"[^"]*"|'[^']*')*>"#,
    )
}

/// Byte span of the first `<name ...>` (or `</name>` when `closing`) tag.
fn find_tag(markup: &str, name: &str, closing: bool) -> Option<(usize, usize)> {
    tag_token()?.captures_iter(markup).find_map(|caps| {
        let tag = caps.get(2)?;
        let is_close = caps.get(1).is_some_and(|m| !m.is_empty());
        let whole = caps.get(0)?;
        (is_close == closing && tag.as_str().eq_ignore_ascii_case(name))
            .then(|| (whole.start(), whole.end()))
    })
}

/// Clean pasted markup. The result is trimmed and may be empty, in which
/// case callers fall back to the plain-text flavour.
pub fn sanitize(raw: &str) -> String {
    let fragment = extract_fragment(raw);
    let mut doc = from_markup(fragment);
    let root = doc.root();
    let mut report = CleanReport::default();
    clean_children(&mut doc, root, &mut report);
    let out = to_markup(&doc).trim().to_string();
    debug!(
        target: "paste.sanitize",
        input_len = raw.len(),
        fragment_len = fragment.len(),
        output_len = out.len(),
        dropped_elements = report.dropped,
        unwrapped_elements = report.unwrapped,
        dropped_attrs = report.dropped_attrs,
        "sanitized"
    );
    out
}

/// Steps 1 and 2: skip any platform header before `<html>`, then prefer the
/// fragment markers, then the body, then the whole input.
pub fn extract_fragment(raw: &str) -> &str {
    let doc = match find_tag(raw, "html", false) {
        Some((start, _)) => &raw[start..],
        None => raw,
    };
    if let (Some(s), Some(e)) = (doc.find(START_FRAGMENT), doc.find(END_FRAGMENT)) {
        let start = s + START_FRAGMENT.len();
        if start <= e {
            trace!(target: "paste.sanitize", "fragment_markers");
            return &doc[start..e];
        }
    }
    if let Some((_, open_end)) = find_tag(doc, "body", false) {
        let rest = &doc[open_end..];
        let end = find_tag(rest, "body", true).map_or(rest.len(), |(start, _)| start);
        trace!(target: "paste.sanitize", "body_wrapper");
        return &rest[..end];
    }
    doc
}

#[derive(Debug, Default)]
struct CleanReport {
    dropped: usize,
    unwrapped: usize,
    dropped_attrs: usize,
}

fn clean_children(doc: &mut Document, parent: NodeId, report: &mut CleanReport) {
    let children = doc.children(parent).to_vec();
    for child in children {
        clean_node(doc, child, report);
    }
}

fn clean_node(doc: &mut Document, id: NodeId, report: &mut CleanReport) {
    let tag = match doc.kind(id) {
        NodeKind::Text(text) => {
            if text.contains('\u{a0}') {
                let normalized = text.replace('\u{a0}', " ");
                doc.set_text(id, normalized);
            }
            return;
        }
        NodeKind::LineBreak => return,
        NodeKind::Element { tag, .. } => tag.clone(),
    };

    if NON_CONTENT_TAGS.contains(&tag.as_str()) {
        doc.detach(id);
        report.dropped += 1;
        return;
    }
    clean_children(doc, id, report);

    if DOCUMENT_TAGS.contains(&tag.as_str()) {
        doc.unwrap_node(id);
        report.unwrapped += 1;
        return;
    }

    let attrs = doc.attrs(id);
    let kept = clean_attrs(attrs);
    if kept.len() != attrs.len() || kept.iter().zip(attrs).any(|(a, b)| a != b) {
        report.dropped_attrs += attrs.len().saturating_sub(kept.len());
        doc.set_attrs(id, kept);
    }

    // Namespaced tags: `<o:p>` paragraph markers, `<st1:place>` smart tags.
    if tag.contains(':') {
        if only_whitespace(doc, id) {
            doc.detach(id);
            report.dropped += 1;
        } else {
            doc.unwrap_node(id);
            report.unwrapped += 1;
        }
        return;
    }

    if WRAPPER_TAGS.contains(&tag.as_str()) && doc.attrs(id).is_empty() && only_whitespace(doc, id)
    {
        doc.detach(id);
        report.dropped += 1;
    }
}

/// True when every child is a whitespace-only text segment.
fn only_whitespace(doc: &Document, id: NodeId) -> bool {
    doc.children(id)
        .iter()
        .all(|c| doc.text(*c).is_some_and(|t| t.trim().is_empty()))
}

fn clean_attrs(attrs: &[Attr]) -> Vec<Attr> {
    attrs.iter().filter_map(clean_attr).collect()
}

fn clean_attr(attr: &Attr) -> Option<Attr> {
    let name = attr.name.as_str();
    if !name.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':')) {
        return None;
    }
    if name.starts_with("xmlns") || name.contains(':') || name == "lang" {
        return None;
    }
    // Event handlers: onclick, onerror, onload...
    if name.len() > 2 && name[..2].eq_ignore_ascii_case("on") {
        return None;
    }
    match name {
        "width" | "height" => None,
        "href" | "src" | "action" | "formaction" if runs_script(&attr.value) => None,
        "class" => {
            let lower = attr.value.to_ascii_lowercase();
            if FOREIGN_CLASS_MARKERS.iter().any(|m| lower.contains(m)) {
                None
            } else {
                Some(attr.clone())
            }
        }
        "style" => {
            let style = clean_style(&attr.value);
            (!style.is_empty()).then(|| Attr::new("style", style))
        }
        _ => Some(attr.clone()),
    }
}

/// True for URLs whose scheme executes code. Browsers ignore whitespace and
/// control characters inside the scheme, so those are skipped first.
fn runs_script(url: &str) -> bool {
    let scheme: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();
    SCRIPT_SCHEMES.iter().any(|s| scheme.starts_with(s))
}

/// Keep declarations that survive outside the source editor. Output is
/// normalised to `prop: value; prop: value`.
pub fn clean_style(style: &str) -> String {
    style
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim();
            if prop.is_empty() || value.is_empty() || !keep_property(&prop, value) {
                return None;
            }
            Some(format!("{prop}: {value}"))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn keep_property(prop: &str, value: &str) -> bool {
    if prop.starts_with("mso-") || prop.starts_with('-') || prop == "font-family" {
        return false;
    }
    !(prop.contains("east-asian") || value.to_ascii_lowercase().contains("east-asian"))
}
