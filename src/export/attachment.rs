//! Save attachments whose text contains a keyword.
//!
//! Layout: `<output>/attachments/<extension>/<sanitized name>`.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, SiftError};
use crate::extract::{self, kind, DocKind};
use crate::model::record::MatchRecord;
use crate::search::KeywordSet;
use crate::store::ResultLog;

/// Longest file name kept after sanitizing.
const MAX_NAME_LEN: usize = 200;

/// Suffix attempts before giving up on a free file name.
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Writes matching attachments below `<output>/attachments`.
#[derive(Debug, Clone)]
pub struct AttachmentPersister {
    root: PathBuf,
}

impl AttachmentPersister {
    pub fn new(output_root: &Path) -> Self {
        Self {
            root: output_root.join("attachments"),
        }
    }

    /// Directory holding the per-extension buckets.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Extract `payload`, and if any keyword matches, save it and log one
    /// match per keyword keyed by the saved path.
    ///
    /// Returns the saved path, or `None` when the attachment has no
    /// resolvable type, no searchable text, or no match.
    pub fn persist(
        &self,
        filename: &str,
        payload: &[u8],
        declared_type: Option<&str>,
        keywords: &KeywordSet,
        log: &ResultLog,
    ) -> Result<Option<PathBuf>> {
        let Some(ext) = kind::resolve_extension(filename, declared_type, payload) else {
            debug!(filename, "Attachment type unknown, skipping");
            return Ok(None);
        };
        let Some(text) = extract::extract_as(DocKind::from_extension(&ext), payload)? else {
            return Ok(None);
        };
        let found = keywords.find_in(&text);
        if found.is_empty() {
            return Ok(None);
        }

        let bucket = self.root.join(sanitize_filename(&ext, MAX_NAME_LEN));
        std::fs::create_dir_all(&bucket).map_err(|e| SiftError::io(&bucket, e))?;
        let path = write_unique(&bucket, &sanitize_filename(filename, MAX_NAME_LEN), payload)?;
        debug!(path = %path.display(), matches = found.len(), "Saved attachment");

        for keyword in found {
            log.write_match(&MatchRecord::new(&path, keyword))?;
        }
        Ok(Some(path))
    }
}

/// Write `data` to `dir/name`, appending `_1`, `_2`, ... to the stem when
/// the name is taken. Uses create-new opens, so concurrent writers never
/// share a file.
fn write_unique(dir: &Path, name: &str, data: &[u8]) -> Result<PathBuf> {
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };

    for i in 0..MAX_NAME_ATTEMPTS {
        let candidate = match (i, ext) {
            (0, _) => dir.join(name),
            (_, Some(ext)) => dir.join(format!("{stem}_{i}.{ext}")),
            (_, None) => dir.join(format!("{stem}_{i}")),
        };
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut file) => {
                file.write_all(data)
                    .map_err(|e| SiftError::io(&candidate, e))?;
                return Ok(candidate);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(SiftError::io(&candidate, e)),
        }
    }

    Err(SiftError::io(
        dir.join(name),
        std::io::Error::new(ErrorKind::AlreadyExists, "no free file name"),
    ))
}

/// Sanitize a string for use in filenames.
///
/// Replaces path separators, `: * ? " < > |` and control characters with
/// `_` and truncates to `max_len` characters.
pub fn sanitize_filename(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .take(max_len)
        .collect();

    let trimmed = sanitized.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        "attachment".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathStyle;

    fn setup() -> (tempfile::TempDir, AttachmentPersister, ResultLog, KeywordSet) {
        let tmp = tempfile::tempdir().unwrap();
        let persister = AttachmentPersister::new(tmp.path());
        let log = ResultLog::create(
            &tmp.path().join("log.txt"),
            &tmp.path().join("errors.txt"),
            PathStyle::Full,
        )
        .unwrap();
        let keywords = KeywordSet::new(["secret", "budget"]).unwrap();
        (tmp, persister, log, keywords)
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.docx", 200), "report.docx");
        assert_eq!(sanitize_filename("a/b\\c:d*e?.txt", 200), "a_b_c_d_e_.txt");
        assert_eq!(sanitize_filename("<x>|\"y\".pdf", 200), "_x___y_.pdf");
        assert_eq!(sanitize_filename("..", 200), "attachment");
        assert_eq!(sanitize_filename("", 200), "attachment");
        assert_eq!(sanitize_filename("abcdef", 3), "abc");
    }

    #[test]
    fn test_matching_attachment_is_saved_and_logged() {
        let (tmp, persister, log, keywords) = setup();
        let saved = persister
            .persist("plan.txt", b"the SECRET budget", None, &keywords, &log)
            .unwrap()
            .expect("saved");

        assert_eq!(saved, tmp.path().join("attachments").join("txt").join("plan.txt"));
        assert_eq!(std::fs::read(&saved).unwrap(), b"the SECRET budget");
        let text = log.match_log().unwrap();
        assert_eq!(
            text,
            format!(
                "File: {p}, Keyword: secret\nFile: {p}, Keyword: budget\n",
                p = saved.display()
            )
        );
    }

    #[test]
    fn test_non_matching_attachment_not_saved() {
        let (tmp, persister, log, keywords) = setup();
        let saved = persister
            .persist("plan.txt", b"nothing here", None, &keywords, &log)
            .unwrap();
        assert!(saved.is_none());
        assert!(!tmp.path().join("attachments").exists());
        assert_eq!(log.match_count(), 0);
    }

    #[test]
    fn test_unsupported_type_skipped() {
        let (_tmp, persister, log, keywords) = setup();
        let saved = persister
            .persist("photo.png", b"\x89PNG secret", None, &keywords, &log)
            .unwrap();
        assert!(saved.is_none());
    }

    #[test]
    fn test_extension_from_declared_type() {
        let (tmp, persister, log, keywords) = setup();
        let saved = persister
            .persist("notes", b"secret", Some("text/plain"), &keywords, &log)
            .unwrap()
            .expect("saved");
        assert_eq!(saved, tmp.path().join("attachments").join("txt").join("notes"));
    }

    #[test]
    fn test_same_name_gets_counter() {
        let (_tmp, persister, log, keywords) = setup();
        let first = persister
            .persist("a.txt", b"secret one", None, &keywords, &log)
            .unwrap()
            .unwrap();
        let second = persister
            .persist("a.txt", b"secret two", None, &keywords, &log)
            .unwrap()
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(second.file_name().unwrap(), "a_1.txt");
        assert_eq!(std::fs::read(&first).unwrap(), b"secret one");
    }

    #[test]
    fn test_corrupt_document_is_error() {
        let (_tmp, persister, log, keywords) = setup();
        let result = persister.persist("broken.docx", b"not a zip", None, &keywords, &log);
        assert!(matches!(result, Err(SiftError::Decode { .. })));
    }
}
