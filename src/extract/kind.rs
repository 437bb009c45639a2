//! Document type resolution: extension, then declared MIME type, then
//! magic-number sniffing.

use std::fmt;

/// Extraction strategy selected for a unit of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    /// Not searchable; skipped without an error.
    Unknown,
    /// `.txt`, decoded as UTF-8.
    PlainText,
    /// Paragraph-oriented word processor document (`.docx`).
    StructuredDoc,
    /// Page-described document (`.pdf`).
    PagedDoc,
    /// Delimited table (`.csv`).
    Tabular,
    /// Workbook (`.xlsx`, `.xls`, `.ods`); first sheet only.
    Spreadsheet,
    /// XML, re-serialized after parsing.
    Markup,
    /// Script, style, HTML, JSON or TSV text, decoded verbatim.
    Verbatim,
}

impl DocKind {
    /// Map a lowercased extension (no dot) to a kind.
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "txt" => Self::PlainText,
            "docx" => Self::StructuredDoc,
            "pdf" => Self::PagedDoc,
            "csv" => Self::Tabular,
            "xlsx" | "xlsm" | "xls" | "ods" => Self::Spreadsheet,
            "xml" => Self::Markup,
            "js" | "css" | "html" | "htm" | "json" | "tsv" => Self::Verbatim,
            _ => Self::Unknown,
        }
    }

    /// Short name used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::PlainText => "text",
            Self::StructuredDoc => "docx",
            Self::PagedDoc => "pdf",
            Self::Tabular => "csv",
            Self::Spreadsheet => "spreadsheet",
            Self::Markup => "xml",
            Self::Verbatim => "verbatim text",
        }
    }
}

impl fmt::Display for DocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lowercased extension of a file name, without the dot.
pub fn extension_of(name: &str) -> Option<String> {
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Conventional extension for a MIME type.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let mime = mime.split(';').next().unwrap_or(mime).trim();
    let ext = match mime.to_ascii_lowercase().as_str() {
        "text/plain" => "txt",
        "text/html" => "html",
        "text/css" => "css",
        "text/csv" => "csv",
        "text/tab-separated-values" => "tsv",
        "text/javascript" | "application/javascript" => "js",
        "application/json" => "json",
        "text/xml" | "application/xml" => "xml",
        "application/pdf" => "pdf",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => "xlsx",
        "application/vnd.ms-excel" => "xls",
        "application/vnd.oasis.opendocument.spreadsheet" => "ods",
        "application/msword" => "doc",
        "application/zip" => "zip",
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        _ => return None,
    };
    Some(ext)
}

/// Extension sniffed from the leading bytes.
pub fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    infer::get(bytes).map(|t| t.extension())
}

/// Resolve the extension for a unit of content.
///
/// Order: the name's extension, the declared MIME type, the payload's
/// magic number.
pub fn resolve_extension(
    name_hint: &str,
    declared_type: Option<&str>,
    bytes: &[u8],
) -> Option<String> {
    if let Some(ext) = extension_of(name_hint) {
        return Some(ext);
    }
    if let Some(ext) = declared_type.and_then(extension_for_mime) {
        return Some(ext.to_string());
    }
    sniff_extension(bytes).map(str::to_string)
}

/// Resolve the [`DocKind`] for a unit of content.
pub fn resolve(name_hint: &str, declared_type: Option<&str>, bytes: &[u8]) -> DocKind {
    resolve_extension(name_hint, declared_type, bytes)
        .map(|ext| DocKind::from_extension(&ext))
        .unwrap_or(DocKind::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("report.DOCX").as_deref(), Some("docx"));
        assert_eq!(extension_of("/a/b/archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension_of("README"), None);
        assert_eq!(extension_of(".bashrc"), None);
        assert_eq!(extension_of("trailing."), None);
    }

    #[test]
    fn test_extension_wins_over_declared_type() {
        let kind = resolve("notes.txt", Some("application/pdf"), b"%PDF-1.4");
        assert_eq!(kind, DocKind::PlainText);
    }

    #[test]
    fn test_declared_type_used_without_extension() {
        let kind = resolve("attachment", Some("application/pdf; name=x"), b"");
        assert_eq!(kind, DocKind::PagedDoc);
    }

    #[test]
    fn test_sniffing_is_last_resort() {
        let kind = resolve("scan", None, b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n");
        assert_eq!(kind, DocKind::PagedDoc);
        assert_eq!(resolve("blob", None, b"\x00\x01\x02"), DocKind::Unknown);
    }

    #[test]
    fn test_kind_table() {
        assert_eq!(DocKind::from_extension("csv"), DocKind::Tabular);
        assert_eq!(DocKind::from_extension("xlsx"), DocKind::Spreadsheet);
        assert_eq!(DocKind::from_extension("xml"), DocKind::Markup);
        assert_eq!(DocKind::from_extension("json"), DocKind::Verbatim);
        assert_eq!(DocKind::from_extension("png"), DocKind::Unknown);
    }
}
