//! Corpus walker: discovers every regular file under a root, dispatches one
//! task per file, and waits for all of them before reporting.
//!
//! Discovery runs on a blocking thread and streams entries over a channel.
//! Each new path is claimed in a [`ProcessedSet`] before its task is
//! spawned, so a path is dispatched at most once. All tasks of the run go
//! into a single [`JoinSet`], which is drained before the report is built.
//! A file task only finishes once every part task it spawned has finished,
//! including after a timeout.

mod email;
mod file;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{self, JoinSet};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::{Config, PathStyle};
use crate::error::{Result, SiftError};
use crate::export::AttachmentPersister;
use crate::model::entry::{CorpusEntry, EntryKind};
use crate::search::KeywordSet;
use crate::store::ResultLog;

use email::PartTasks;

/// Capacity of the discovery channel.
const DISCOVERY_BUFFER: usize = 256;

/// Everything one scan needs.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Directory to scan.
    pub root: PathBuf,
    /// Output directory; created if absent.
    pub output: PathBuf,
    /// Keywords to look for.
    pub keywords: KeywordSet,
    /// Save matching attachments under `<output>/attachments`.
    pub persist_attachments: bool,
    /// File name suffix of email containers.
    pub container_suffix: String,
    /// Match log path, relative to `output` unless absolute.
    pub log_file: PathBuf,
    /// Error log path, relative to `output` unless absolute.
    pub error_file: PathBuf,
    /// Path rendering in match records.
    pub path_style: PathStyle,
    /// Maximum number of files in flight.
    pub max_concurrent_tasks: usize,
    /// Per-file time limit.
    pub task_timeout: Option<Duration>,
    /// Larger files are reported instead of read.
    pub max_file_size: u64,
}

impl ScanOptions {
    /// Options with built-in defaults.
    pub fn new(root: impl Into<PathBuf>, output: impl Into<PathBuf>, keywords: KeywordSet) -> Self {
        Self::from_config(&Config::default(), root, output, keywords)
    }

    /// Options taken from a loaded configuration.
    pub fn from_config(
        config: &Config,
        root: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        keywords: KeywordSet,
    ) -> Self {
        let timeout = config.performance.task_timeout_secs;
        Self {
            root: root.into(),
            output: output.into(),
            keywords,
            persist_attachments: config.scan.persist_attachments,
            container_suffix: config.scan.container_suffix.clone(),
            log_file: PathBuf::from(&config.scan.log_file),
            error_file: PathBuf::from(&config.scan.error_file),
            path_style: config.scan.path_style,
            max_concurrent_tasks: config.performance.max_concurrent_tasks,
            task_timeout: (timeout > 0).then(|| Duration::from_secs(timeout)),
            max_file_size: config.performance.max_file_size,
        }
    }
}

/// Outcome of a completed scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub root: PathBuf,
    pub output: PathBuf,
    /// Distinct files dispatched (each finished, successfully or not).
    pub files_processed: usize,
    pub bytes_scanned: u64,
    pub match_count: usize,
    pub error_count: usize,
    /// Where the match log was written.
    pub log_file: PathBuf,
    /// Where the error log was written.
    pub error_file: PathBuf,
    /// Where matching attachments were saved, when enabled.
    pub attachments_dir: Option<PathBuf>,
    /// Contents of the match log.
    pub log: String,
    /// Contents of the error log.
    pub errors: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Paths already dispatched in this run.
#[derive(Debug, Clone, Default)]
pub(crate) struct ProcessedSet {
    inner: Arc<Mutex<HashSet<PathBuf>>>,
}

impl ProcessedSet {
    /// Claim `path`. Returns `false` if it was claimed before.
    pub(crate) fn insert_new(&self, path: &Path) -> bool {
        let mut seen = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        seen.insert(path.to_path_buf())
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Shared, read-only state of one run.
#[derive(Debug)]
pub(crate) struct ScanContext {
    pub(crate) keywords: KeywordSet,
    pub(crate) log: ResultLog,
    pub(crate) persister: Option<AttachmentPersister>,
    pub(crate) max_file_size: u64,
}

/// What the walker thread reports.
enum Discovery {
    Entry(CorpusEntry),
    Failed { path: PathBuf, message: String },
}

/// Scan `options.root` and return the report once every file is done.
///
/// Only a failure to prepare the output directory or its log files is
/// returned as an error; per-file failures end up in the error log.
pub async fn scan_corpus(options: ScanOptions) -> Result<ScanReport> {
    let started_at = Utc::now();
    let root = std::path::absolute(&options.root).unwrap_or_else(|_| options.root.clone());
    let output = options.output.clone();

    tokio::fs::create_dir_all(&output)
        .await
        .map_err(|source| SiftError::OutputDir {
            path: output.clone(),
            source,
        })?;
    let log = ResultLog::create(
        &output.join(&options.log_file),
        &output.join(&options.error_file),
        options.path_style,
    )?;

    info!(
        root = %root.display(),
        keywords = options.keywords.len(),
        persist = options.persist_attachments,
        "Starting scan"
    );

    let ctx = Arc::new(ScanContext {
        keywords: options.keywords,
        log,
        persister: options
            .persist_attachments
            .then(|| AttachmentPersister::new(&output)),
        max_file_size: options.max_file_size,
    });

    let (tx, mut rx) = mpsc::channel(DISCOVERY_BUFFER);
    let walker = {
        let root = root.clone();
        let skip = output_paths(&output, &ctx);
        let suffix = options.container_suffix;
        task::spawn_blocking(move || walk(&root, &skip, &suffix, &tx))
    };

    let processed = ProcessedSet::default();
    let limit = Arc::new(Semaphore::new(options.max_concurrent_tasks.max(1)));
    let mut tasks = JoinSet::new();
    let mut bytes_scanned = 0u64;

    while let Some(found) = rx.recv().await {
        match found {
            Discovery::Entry(entry) => {
                if !processed.insert_new(&entry.path) {
                    debug!(path = %entry.path.display(), "Already dispatched, skipping");
                    continue;
                }
                bytes_scanned += entry.size;
                let permit = Arc::clone(&limit)
                    .acquire_owned()
                    .await
                    .map_err(|e| SiftError::Task(e.to_string()))?;
                let ctx = Arc::clone(&ctx);
                let timeout = options.task_timeout;
                tasks.spawn(async move {
                    let _permit = permit;
                    process_entry(ctx, entry, timeout).await;
                });
            }
            Discovery::Failed { path, message } => {
                ctx.log.report(format!("walk {}", path.display()), &message);
            }
        }
    }
    walker
        .await
        .map_err(|e| SiftError::Task(e.to_string()))?;

    // Fan-in over the whole tree.
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            ctx.log.report("task", &e);
        }
    }

    let report = ScanReport {
        root,
        output,
        files_processed: processed.len(),
        bytes_scanned,
        match_count: ctx.log.match_count(),
        error_count: ctx.log.error_count(),
        log_file: ctx.log.match_path().to_path_buf(),
        error_file: ctx.log.error_path().to_path_buf(),
        attachments_dir: ctx.persister.as_ref().map(|p| p.root().to_path_buf()),
        log: ctx.log.match_log()?,
        errors: ctx.log.error_log()?,
        started_at,
        finished_at: Utc::now(),
    };
    info!(
        files = report.files_processed,
        matches = report.match_count,
        errors = report.error_count,
        "Scan complete"
    );
    Ok(report)
}

/// Paths this run writes to. The walker must not pick them up.
fn output_paths(output: &Path, ctx: &ScanContext) -> Vec<PathBuf> {
    let mut paths = vec![
        output.to_path_buf(),
        ctx.log.match_path().to_path_buf(),
        ctx.log.error_path().to_path_buf(),
    ];
    paths.extend(ctx.persister.as_ref().map(|p| p.root().to_path_buf()));
    paths
        .iter()
        .filter_map(|p| std::path::absolute(p).ok())
        .collect()
}

/// Enumerate regular files below `root`, skipping every path in `skip`.
///
/// The root itself is never skipped, so an output directory equal to the
/// root still gets its other files scanned. Symbolic links are not
/// followed, so link cycles cannot occur.
fn walk(root: &Path, skip: &[PathBuf], suffix: &str, tx: &mpsc::Sender<Discovery>) {
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !skip.iter().any(|s| e.path() == s));

    for item in walker {
        let found = match item {
            Ok(entry) => {
                if !entry.file_type().is_file() {
                    continue;
                }
                match entry.metadata() {
                    Ok(meta) => Discovery::Entry(CorpusEntry::new(entry.into_path(), meta.len(), suffix)),
                    Err(e) => Discovery::Failed {
                        path: entry.into_path(),
                        message: e.to_string(),
                    },
                }
            }
            Err(e) => Discovery::Failed {
                path: e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf),
                message: e.to_string(),
            },
        };
        if tx.blocking_send(found).is_err() {
            // Receiver dropped, stop walking.
            break;
        }
    }
}

/// Run one file to completion. Every failure becomes an error record.
///
/// Part tasks live outside the timed future. On timeout they are cancelled
/// and drained before the timeout is reported, so nothing is written for
/// this file after its timeout record.
async fn process_entry(ctx: Arc<ScanContext>, entry: CorpusEntry, timeout: Option<Duration>) {
    let path = entry.path.clone();
    let context = match entry.kind {
        EntryKind::Container => format!("email {}", path.display()),
        EntryKind::Plain => format!("file {}", path.display()),
    };
    let mut parts = PartTasks::new(path.clone());

    let result = match timeout {
        Some(limit) => {
            let timed = tokio::time::timeout(limit, run_entry(&ctx, entry, &mut parts)).await;
            match timed {
                Ok(result) => result,
                Err(_) => {
                    parts.cancel();
                    parts.drain(&ctx).await;
                    Err(SiftError::Timeout { path, limit })
                }
            }
        }
        None => run_entry(&ctx, entry, &mut parts).await,
    };

    if let Err(e) = result {
        ctx.log.report(context, &e);
    }
}

async fn run_entry(ctx: &Arc<ScanContext>, entry: CorpusEntry, parts: &mut PartTasks) -> Result<()> {
    if entry.size > ctx.max_file_size {
        return Err(SiftError::FileTooLarge {
            path: entry.path,
            size: entry.size,
            limit: ctx.max_file_size,
        });
    }
    let bytes = tokio::fs::read(&entry.path)
        .await
        .map_err(|e| SiftError::io(&entry.path, e))?;

    match entry.kind {
        EntryKind::Container => email::process_container(ctx, bytes, parts).await,
        EntryKind::Plain => file::process_file(ctx, entry, bytes).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processed_set_claims_once() {
        let set = ProcessedSet::default();
        assert!(set.insert_new(Path::new("/c/a.txt")));
        assert!(!set.insert_new(Path::new("/c/a.txt")));
        assert!(set.insert_new(Path::new("/c/b.txt")));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_processed_set_shared_between_threads() {
        let set = ProcessedSet::default();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let set = set.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .filter(|i| set.insert_new(Path::new(&format!("/c/{i}"))))
                        .count()
                })
            })
            .collect();
        let claimed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(claimed, 100);
        assert_eq!(set.len(), 100);
    }

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default();
        config.performance.task_timeout_secs = 5;
        config.scan.persist_attachments = true;
        let keywords = KeywordSet::new(["x"]).unwrap();
        let opts = ScanOptions::from_config(&config, "/in", "/out", keywords);
        assert_eq!(opts.task_timeout, Some(Duration::from_secs(5)));
        assert!(opts.persist_attachments);
        assert_eq!(opts.log_file, PathBuf::from("log.txt"));

        let opts = ScanOptions::new("/in", "/out", KeywordSet::new(["x"]).unwrap());
        assert_eq!(opts.task_timeout, None);
    }

    #[test]
    fn test_walk_reports_files_only() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("sub/deeper")).unwrap();
        std::fs::write(tmp.path().join("a.txt"), "a").unwrap();
        std::fs::write(tmp.path().join("sub/m.eml"), "Subject: x\n\nbody").unwrap();
        std::fs::write(tmp.path().join("sub/deeper/c.csv"), "x,y").unwrap();
        std::fs::create_dir_all(tmp.path().join("out")).unwrap();
        std::fs::write(tmp.path().join("out/log.txt"), "old").unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let skip = tmp.path().join("out");
        walk(tmp.path(), &[skip.clone()], ".eml", &tx);
        drop(tx);

        let mut entries = Vec::new();
        while let Ok(found) = rx.try_recv() {
            if let Discovery::Entry(e) = found {
                entries.push(e);
            }
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(entries.len(), 3);
        let containers = entries
            .iter()
            .filter(|e| e.kind == EntryKind::Container)
            .count();
        assert_eq!(containers, 1);
        assert!(entries.iter().all(|e| !e.path.starts_with(&skip)));
    }

    #[test]
    fn test_walk_never_skips_root() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "a").unwrap();
        std::fs::write(tmp.path().join("log.txt"), "old").unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let skip = [tmp.path().to_path_buf(), tmp.path().join("log.txt")];
        walk(tmp.path(), &skip, ".eml", &tx);
        drop(tx);

        let mut names = Vec::new();
        while let Ok(found) = rx.try_recv() {
            if let Discovery::Entry(e) = found {
                names.push(e.name().to_string());
            }
        }
        assert_eq!(names, vec!["a.txt"]);
    }
}
