//! `mailsift` — keyword search across a directory of documents and email
//! messages.
//!
//! This crate provides the scan pipeline: recursive discovery, MIME
//! decomposition of email containers, text extraction for common document
//! formats, concurrent keyword matching, append-only result logs, and
//! saving of matching attachments.

pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod model;
pub mod parser;
pub mod scan;
pub mod search;
pub mod store;

pub use error::{Result, SiftError};
pub use scan::{scan_corpus, ScanOptions, ScanReport};
pub use search::KeywordSet;
