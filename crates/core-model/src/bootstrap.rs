//! Reading manuscripts from disk and writing saved markup back.

use anyhow::{Context, Result};
use core_doc::Document;
use core_doc::markup::from_markup;
use std::path::Path;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Markup,
    PlainText,
}

impl DocumentFormat {
    /// `.html`/`.htm` files are markup; everything else is plain text.
    pub fn for_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("html" | "htm") => DocumentFormat::Markup,
            _ => DocumentFormat::PlainText,
        }
    }
}

/// Read `path` into a document. CRLF and lone CR line endings are folded to
/// LF before parsing.
pub fn load_document(path: &Path) -> Result<(Document, DocumentFormat)> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        error!(target: "io", path = %path.display(), ?e, "file_open_error");
        e
    });
    let raw = raw.with_context(|| format!("reading {}", path.display()))?;
    let content = raw.replace("\r\n", "\n").replace('\r', "\n");
    let format = DocumentFormat::for_path(path);
    let doc = match format {
        DocumentFormat::Markup => from_markup(&content),
        DocumentFormat::PlainText => Document::from_plain_text(&content),
    };
    debug!(target: "io", path = %path.display(), bytes = content.len(), ?format, "document_loaded");
    Ok((doc, format))
}

/// Write saved markup to `path`.
pub fn write_markup(path: &Path, markup: &str) -> Result<()> {
    std::fs::write(path, markup).with_context(|| format!("writing {}", path.display()))?;
    debug!(target: "io", path = %path.display(), bytes = markup.len(), "markup_written");
    Ok(())
}
