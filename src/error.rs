//! Centralized error types for mailsift.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// All errors produced by the mailsift library.
///
/// Apart from [`SiftError::OutputDir`], every variant is caught at the
/// boundary of the task that produced it and turned into an error record.
#[derive(Error, Debug)]
pub enum SiftError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file or directory does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The output directory could not be created. Aborts the run.
    #[error("Cannot create output directory '{path}': {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An email container could not be split into parts.
    #[error("Not a parseable email message: {0}")]
    InvalidMessage(PathBuf),

    /// Bytes of a recognized format failed to decode.
    #[error("Cannot decode {format} content: {reason}")]
    Decode { format: &'static str, reason: String },

    /// The keyword list is empty after trimming.
    #[error("No keywords given")]
    NoKeywords,

    /// Processing a single file took longer than the configured limit.
    #[error("Timed out after {limit:?} processing '{path}'")]
    Timeout { path: PathBuf, limit: Duration },

    /// A file is larger than the configured ceiling.
    #[error("'{path}' is {size} bytes, over the {limit} byte limit")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    /// A spawned task panicked or was cancelled.
    #[error("Task failed: {0}")]
    Task(String),
}

/// Convenience alias for `Result<T, SiftError>`.
pub type Result<T> = std::result::Result<T, SiftError>;

impl SiftError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::FileNotFound(path);
        }
        Self::Io { path, source }
    }

    /// Create a `Decode` variant for the named format.
    pub fn decode(format: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Decode {
            format,
            reason: reason.to_string(),
        }
    }
}
