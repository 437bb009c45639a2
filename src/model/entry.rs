//! Files discovered while walking the corpus.

use std::path::{Path, PathBuf};

/// How a discovered file is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// An email message, split into parts before extraction.
    Container,
    /// Any other file, extracted as a whole.
    Plain,
}

/// A regular file found under the scan root.
///
/// Lives only for the duration of its processing task.
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    /// Path as produced by the walker (rooted at the scan root).
    pub path: PathBuf,
    /// Lowercased extension without the dot, if any.
    pub extension: Option<String>,
    /// Size in bytes at discovery time.
    pub size: u64,
    /// Container or plain file.
    pub kind: EntryKind,
}

impl CorpusEntry {
    /// Build an entry, classifying it by `container_suffix`.
    ///
    /// The suffix comparison ignores ASCII case, so `MAIL.EML` is a
    /// container when the suffix is `.eml`.
    pub fn new(path: PathBuf, size: u64, container_suffix: &str) -> Self {
        let kind = if has_suffix(&path, container_suffix) {
            EntryKind::Container
        } else {
            EntryKind::Plain
        };
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(|e| e.to_ascii_lowercase());
        Self {
            path,
            extension,
            size,
            kind,
        }
    }

    /// File name used as an extraction hint.
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
    }
}

fn has_suffix(path: &Path, suffix: &str) -> bool {
    if suffix.is_empty() {
        return false;
    }
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.len() >= suffix.len()
        && name.is_char_boundary(name.len() - suffix.len())
        && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}
