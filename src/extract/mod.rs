//! Content extraction: raw bytes of any supported format to searchable text.
//!
//! [`kind::resolve`] picks a [`DocKind`] for a unit of content and
//! [`strategy`] maps each kind to exactly one extraction function.
//! Unsupported kinds yield `Ok(None)`; a recognized kind whose bytes do
//! not parse yields `Err`.

pub mod document;
pub mod kind;
pub mod table;

pub use kind::DocKind;

use tracing::debug;

use crate::error::{Result, SiftError};

/// Signature shared by every extraction strategy.
pub type Extractor = fn(&[u8]) -> Result<String>;

/// The extraction strategy for a kind, or `None` when it is not searchable.
pub fn strategy(kind: DocKind) -> Option<Extractor> {
    match kind {
        DocKind::Unknown => None,
        DocKind::PlainText => Some(utf8_text),
        DocKind::StructuredDoc => Some(document::docx_text),
        DocKind::PagedDoc => Some(document::pdf_text),
        DocKind::Tabular => Some(table::csv_text),
        DocKind::Spreadsheet => Some(table::spreadsheet_text),
        DocKind::Markup => Some(document::xml_text),
        DocKind::Verbatim => Some(verbatim_text),
    }
}

/// Extract text from `bytes`, resolving the type from `name_hint`, then
/// `declared_type`, then the content itself.
pub fn extract(name_hint: &str, bytes: &[u8], declared_type: Option<&str>) -> Result<Option<String>> {
    extract_as(kind::resolve(name_hint, declared_type, bytes), bytes)
}

/// Extract text from `bytes` with an already resolved kind.
pub fn extract_as(kind: DocKind, bytes: &[u8]) -> Result<Option<String>> {
    match strategy(kind) {
        Some(extractor) => extractor(bytes).map(Some),
        None => {
            debug!(len = bytes.len(), "No extractor for content, skipping");
            Ok(None)
        }
    }
}

fn utf8_text(bytes: &[u8]) -> Result<String> {
    decode_utf8(bytes, "text")
}

fn verbatim_text(bytes: &[u8]) -> Result<String> {
    decode_utf8(bytes, "verbatim text")
}

fn decode_utf8(bytes: &[u8], format: &'static str) -> Result<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| SiftError::decode(format, e))
}
