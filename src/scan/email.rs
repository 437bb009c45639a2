//! Email containers: one task per leaf part.
//!
//! Body matches are logged under the container's path. Parts with a file
//! name go to the attachment persister when persistence is on; otherwise
//! their extracted text is matched like a body.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::{self, JoinSet};
use tracing::debug;

use crate::error::{Result, SiftError};
use crate::extract;
use crate::model::part::MessagePart;
use crate::model::record::MatchRecord;
use crate::parser::mime;

use super::ScanContext;

/// The part tasks of one container.
///
/// Owned by the file task rather than the container future, so parts can
/// still be cancelled and awaited after that future is dropped.
pub(super) struct PartTasks {
    container: Arc<PathBuf>,
    tasks: JoinSet<Result<()>>,
    cancelled: Arc<AtomicBool>,
}

impl PartTasks {
    pub(super) fn new(container: PathBuf) -> Self {
        Self {
            container: Arc::new(container),
            tasks: JoinSet::new(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Parts that have not written yet write nothing from now on.
    pub(super) fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn spawn(&mut self, ctx: &Arc<ScanContext>, part: MessagePart) {
        let ctx = Arc::clone(ctx);
        let container = Arc::clone(&self.container);
        let cancelled = Arc::clone(&self.cancelled);
        self.tasks
            .spawn_blocking(move || process_part(&ctx, &container, &cancelled, part));
    }

    /// Wait for every spawned part, reporting failures against the
    /// container. Safe to call again after being interrupted.
    pub(super) async fn drain(&mut self, ctx: &ScanContext) {
        while let Some(joined) = self.tasks.join_next().await {
            let result = joined.map_err(|e| SiftError::Task(e.to_string())).and_then(|r| r);
            if let Err(e) = result {
                ctx.log.report(format!("email {}", self.container.display()), &e);
            }
        }
    }
}

/// Decompose a container and wait for all of its parts.
///
/// A container that cannot be decomposed is an error for the caller to
/// report; a failing part is reported here and does not affect its
/// siblings.
pub(super) async fn process_container(
    ctx: &Arc<ScanContext>,
    bytes: Vec<u8>,
    parts: &mut PartTasks,
) -> Result<()> {
    let leaves = {
        let path = Arc::clone(&parts.container);
        task::spawn_blocking(move || mime::decompose(&path, &bytes))
            .await
            .map_err(|e| SiftError::Task(e.to_string()))??
    };
    debug!(path = %parts.container.display(), parts = leaves.len(), "Decomposed message");

    for part in leaves {
        parts.spawn(ctx, part);
    }
    parts.drain(ctx).await;
    Ok(())
}

fn process_part(
    ctx: &ScanContext,
    container: &Path,
    cancelled: &AtomicBool,
    part: MessagePart,
) -> Result<()> {
    if cancelled.load(Ordering::SeqCst) {
        return Ok(());
    }

    if let Some(filename) = part.filename.as_deref().filter(|_| part.is_attachment()) {
        let declared = Some(part.content_type.as_str());
        if let Some(persister) = &ctx.persister {
            let saved = persister.persist(filename, &part.payload, declared, &ctx.keywords, &ctx.log);
            if let Err(e) = saved {
                ctx.log.report(
                    format!("attachment {filename} in {}", container.display()),
                    &e,
                );
            }
            return Ok(());
        }
        let text = extract::extract(filename, &part.payload, declared)?;
        return log_matches(ctx, container, cancelled, text.as_deref().unwrap_or_default());
    }

    log_matches(ctx, container, cancelled, &mime::part_text(&part))
}

fn log_matches(ctx: &ScanContext, container: &Path, cancelled: &AtomicBool, text: &str) -> Result<()> {
    for keyword in ctx.keywords.find_in(text) {
        if cancelled.load(Ordering::SeqCst) {
            break;
        }
        ctx.log.write_match(&MatchRecord::new(container, keyword))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathStyle;
    use crate::search::KeywordSet;
    use crate::store::ResultLog;

    fn context(dir: &Path) -> Arc<ScanContext> {
        let log = ResultLog::create(
            &dir.join("log.txt"),
            &dir.join("errors.txt"),
            PathStyle::Full,
        )
        .unwrap();
        Arc::new(ScanContext {
            keywords: KeywordSet::new(["secret"]).unwrap(),
            log,
            persister: None,
            max_file_size: u64::MAX,
        })
    }

    fn many_parts(count: usize) -> Vec<u8> {
        let mut raw = String::from("Content-Type: multipart/mixed; boundary=B\n\n");
        for i in 0..count {
            raw.push_str(&format!("--B\nContent-Type: text/plain\n\nsecret {i}\n"));
        }
        raw.push_str("--B--\n");
        raw.into_bytes()
    }

    #[tokio::test]
    async fn test_every_part_logged_before_return() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = context(tmp.path());
        let mut parts = PartTasks::new(tmp.path().join("m.eml"));

        process_container(&ctx, many_parts(40), &mut parts).await.unwrap();

        assert_eq!(ctx.log.match_count(), 40);
        assert_eq!(ctx.log.match_log().unwrap().lines().count(), 40);
    }

    #[tokio::test]
    async fn test_cancelled_parts_write_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = context(tmp.path());
        let mut parts = PartTasks::new(tmp.path().join("m.eml"));
        parts.cancel();

        process_container(&ctx, many_parts(40), &mut parts).await.unwrap();

        assert_eq!(ctx.log.match_count(), 0);
        assert_eq!(ctx.log.match_log().unwrap(), "");
    }

    #[tokio::test]
    async fn test_drain_after_interrupted_container() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = context(tmp.path());
        let mut parts = PartTasks::new(tmp.path().join("m.eml"));
        let leaves = mime::decompose(Path::new("m.eml"), &many_parts(25)).unwrap();
        for part in leaves {
            parts.spawn(&ctx, part);
        }

        parts.cancel();
        parts.drain(&ctx).await;

        // Every part has finished; whatever was written stays put.
        let written = ctx.log.match_count();
        assert!(written <= 25);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(ctx.log.match_log().unwrap().lines().count(), written);
    }
}
