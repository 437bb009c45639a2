//! Core data model types for corpus entries, message parts, and records.

pub mod entry;
pub mod part;
pub mod record;
