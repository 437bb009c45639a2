//! Append-only match and error logs shared by every scan task.
//!
//! Each sink is a single file handle behind a mutex. A record is formatted
//! first and then written with one `write_all` under the lock, so records
//! from concurrent tasks never interleave. Ordering between tasks is not
//! defined.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::{error, warn};

use crate::config::PathStyle;
use crate::error::{Result, SiftError};
use crate::model::record::{ErrorRecord, MatchRecord};

/// One append-only file.
#[derive(Debug)]
struct Sink {
    path: PathBuf,
    file: Mutex<File>,
    records: AtomicUsize,
}

impl Sink {
    /// Create or truncate the file at `path`.
    fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|e| SiftError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            records: AtomicUsize::new(0),
        })
    }

    fn append(&self, mut line: String) -> Result<()> {
        line.push('\n');
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(line.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| SiftError::io(&self.path, e))?;
        self.records.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn contents(&self) -> Result<String> {
        // Hold the lock so no record is half-written while reading.
        let _guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        std::fs::read_to_string(&self.path).map_err(|e| SiftError::io(&self.path, e))
    }
}

/// The match log and the error log of one run.
#[derive(Debug)]
pub struct ResultLog {
    matches: Sink,
    errors: Sink,
    style: PathStyle,
}

impl ResultLog {
    /// Create (or empty) both log files.
    pub fn create(match_path: &Path, error_path: &Path, style: PathStyle) -> Result<Self> {
        Ok(Self {
            matches: Sink::create(match_path)?,
            errors: Sink::create(error_path)?,
            style,
        })
    }

    /// Append `File: <path>, Keyword: <keyword>`.
    pub fn write_match(&self, record: &MatchRecord) -> Result<()> {
        self.matches.append(record.render(self.style))
    }

    /// Append one error record.
    pub fn write_error(&self, record: &ErrorRecord) -> Result<()> {
        self.errors.append(record.to_string())
    }

    /// Record a failed unit of work. Never fails; a log that cannot be
    /// written is reported through `tracing` only.
    pub fn report(&self, context: impl Into<String>, err: &dyn fmt::Display) {
        let record = ErrorRecord::new(context, err);
        warn!(context = %record.context, error = %record.message, "Unit failed");
        if let Err(e) = self.write_error(&record) {
            error!(error = %e, "Failed to append to error log");
        }
    }

    /// Number of match records written so far.
    pub fn match_count(&self) -> usize {
        self.matches.records.load(Ordering::Relaxed)
    }

    /// Number of error records written so far.
    pub fn error_count(&self) -> usize {
        self.errors.records.load(Ordering::Relaxed)
    }

    /// Full text of the match log.
    pub fn match_log(&self) -> Result<String> {
        self.matches.contents()
    }

    /// Full text of the error log.
    pub fn error_log(&self) -> Result<String> {
        self.errors.contents()
    }

    pub fn match_path(&self) -> &Path {
        &self.matches.path
    }

    pub fn error_path(&self) -> &Path {
        &self.errors.path
    }
}
