//! Keyword search over extracted text.

pub mod keywords;

pub use keywords::{load_keywords, merge_keywords, parse_keywords, KeywordSet};
