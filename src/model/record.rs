//! Durable scan output: match and error records.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::config::PathStyle;

/// Evidence that `keyword` occurs in the file at `path`.
///
/// Only ever created after the keyword was found in extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    /// Container, plain file, or persisted attachment path.
    pub path: PathBuf,
    /// The keyword as the user supplied it.
    pub keyword: String,
}

impl MatchRecord {
    pub fn new(path: impl Into<PathBuf>, keyword: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            keyword: keyword.into(),
        }
    }

    /// Render as one log line (without the trailing newline).
    pub fn render(&self, style: PathStyle) -> String {
        let path = match style {
            PathStyle::Short => short_path(&self.path),
            PathStyle::Full => self.path.display().to_string(),
        };
        format!("File: {path}, Keyword: {}", self.keyword)
    }
}

/// A failed unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    /// What was being processed, e.g. `file /corpus/a.pdf`.
    pub context: String,
    /// Error description.
    pub message: String,
}

impl ErrorRecord {
    pub fn new(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            context: context.into(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // One record per line.
        let message: String = self
            .message
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        write!(f, "Error: {}: {}", self.context, message.trim_end())
    }
}

/// Keep only the parent directory name and the file name: `/parent/file`.
pub fn short_path(path: &Path) -> String {
    let mut names = path.components().rev().filter_map(|c| match c {
        Component::Normal(s) => Some(s.to_string_lossy()),
        _ => None,
    });
    let file = names.next().unwrap_or_default();
    let sep = std::path::MAIN_SEPARATOR;
    match names.next() {
        Some(parent) => format!("{sep}{parent}{sep}{file}"),
        None => format!("{sep}{file}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_path() {
        let sep = std::path::MAIN_SEPARATOR;
        let p = Path::new("/data/corpus/inbox/a.txt");
        assert_eq!(short_path(p), format!("{sep}inbox{sep}a.txt"));
        assert_eq!(short_path(Path::new("a.txt")), format!("{sep}a.txt"));
    }

    #[test]
    fn test_match_render_styles() {
        let sep = std::path::MAIN_SEPARATOR;
        let rec = MatchRecord::new("/data/corpus/inbox/a.txt", "secret");
        assert_eq!(
            rec.render(PathStyle::Short),
            format!("File: {sep}inbox{sep}a.txt, Keyword: secret")
        );
        assert_eq!(
            rec.render(PathStyle::Full),
            "File: /data/corpus/inbox/a.txt, Keyword: secret"
        );
    }

    #[test]
    fn test_error_record_single_line() {
        let rec = ErrorRecord::new("file /c/x.pdf", "bad header\nat offset 4\n");
        assert_eq!(
            rec.to_string(),
            "Error: file /c/x.pdf: bad header at offset 4"
        );
    }
}
