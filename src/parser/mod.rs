//! Email parsing: MIME decomposition of container files.

pub mod mime;
