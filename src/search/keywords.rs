//! Case-insensitive keyword matching.

use std::path::Path;

use crate::error::{Result, SiftError};

/// The ordered, immutable set of keywords for one run.
///
/// Shared read-only by every task; matching needs no synchronization.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    keywords: Vec<String>,
    lowered: Vec<String>,
}

impl KeywordSet {
    /// Build a keyword set. Blank entries are dropped; an empty result is
    /// an error.
    pub fn new<I, S>(keywords: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return Err(SiftError::NoKeywords);
        }
        let lowered = keywords.iter().map(|k| k.to_lowercase()).collect();
        Ok(Self { keywords, lowered })
    }

    /// Keywords in their original order and spelling.
    pub fn as_slice(&self) -> &[String] {
        &self.keywords
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Return the keywords that occur anywhere in `text`, ignoring case.
    ///
    /// Results keep the set's order. Empty text matches nothing.
    pub fn find_in(&self, text: &str) -> Vec<&str> {
        if text.is_empty() {
            return Vec::new();
        }
        let haystack = text.to_lowercase();
        self.keywords
            .iter()
            .zip(&self.lowered)
            .filter(|(_, needle)| haystack.contains(needle.as_str()))
            .map(|(keyword, _)| keyword.as_str())
            .collect()
    }
}

/// Split keyword-file contents on commas and newlines.
pub fn parse_keywords(contents: &str) -> Result<KeywordSet> {
    KeywordSet::new(split_keywords(contents))
}

fn split_keywords(contents: &str) -> impl Iterator<Item = &str> {
    let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);
    contents.split([',', '\n'])
}

fn read_keyword_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| SiftError::io(path, e))
}

/// Load a keyword file (`secret, invoice, ...`).
pub fn load_keywords(path: &Path) -> Result<KeywordSet> {
    parse_keywords(&read_keyword_file(path)?)
}

/// Combine an optional keyword file with extra keywords. Blank entries in
/// either source are dropped; only the combined list must be non-empty.
pub fn merge_keywords(file: Option<&Path>, extra: &[String]) -> Result<KeywordSet> {
    let contents = file.map(read_keyword_file).transpose()?;
    let from_file = contents.as_deref().into_iter().flat_map(split_keywords);
    KeywordSet::new(from_file.chain(extra.iter().map(String::as_str)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> KeywordSet {
        KeywordSet::new(words).unwrap()
    }

    #[test]
    fn test_find_in_case_insensitive() {
        let k = set(&["secret", "missing"]);
        assert_eq!(k.find_in("hello SeCrEt world"), vec!["secret"]);
    }

    #[test]
    fn test_find_in_keeps_original_spelling_and_order() {
        let k = set(&["Invoice", "PAYMENT", "x"]);
        assert_eq!(
            k.find_in("payment for invoice 12"),
            vec!["Invoice", "PAYMENT"]
        );
    }

    #[test]
    fn test_find_in_unicode() {
        let k = set(&["ÄRGER", "straße", "ключ"]);
        assert_eq!(
            k.find_in("kein ärger auf der STRASSE, но КЛЮЧ"),
            vec!["ÄRGER", "ключ"]
        );
    }

    #[test]
    fn test_substring_match() {
        let k = set(&["cat"]);
        assert_eq!(k.find_in("concatenate"), vec!["cat"]);
    }

    #[test]
    fn test_empty_text_matches_nothing() {
        let k = set(&["a"]);
        assert!(k.find_in("").is_empty());
    }

    #[test]
    fn test_empty_set_rejected() {
        assert!(matches!(
            KeywordSet::new(["", "  "]),
            Err(SiftError::NoKeywords)
        ));
    }

    #[test]
    fn test_parse_keywords_file_format() {
        let k = parse_keywords("secret, invoice ,\nbank\n\n").unwrap();
        assert_eq!(k.as_slice(), &["secret", "invoice", "bank"]);
    }

    #[test]
    fn test_load_keywords_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("keywords.txt");
        std::fs::write(&path, "\u{feff}alpha,beta").unwrap();
        let k = load_keywords(&path).unwrap();
        assert_eq!(k.len(), 2);
        assert_eq!(k.as_slice()[0], "alpha");
    }

    #[test]
    fn test_merge_blank_file_with_extra_keywords() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("keywords.txt");
        std::fs::write(&path, " ,\n , \n").unwrap();
        let k = merge_keywords(Some(&path), &["secret".to_string()]).unwrap();
        assert_eq!(k.as_slice(), &["secret"]);
    }

    #[test]
    fn test_merge_keeps_file_order_first() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("keywords.txt");
        std::fs::write(&path, "alpha,beta").unwrap();
        let k = merge_keywords(Some(&path), &["gamma".to_string()]).unwrap();
        assert_eq!(k.as_slice(), &["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_merge_with_nothing_is_rejected() {
        assert!(matches!(
            merge_keywords(None, &["  ".to_string()]),
            Err(SiftError::NoKeywords)
        ));
    }
}
