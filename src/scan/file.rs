//! Plain (non-container) files.

use tokio::task;
use tracing::debug;

use crate::error::{Result, SiftError};
use crate::extract::{self, kind, DocKind};
use crate::model::entry::CorpusEntry;
use crate::model::record::MatchRecord;

use super::ScanContext;

/// Extract a whole file and log its matches under its own path.
///
/// The extension recorded at discovery picks the extractor; files without
/// one are sniffed.
pub(super) async fn process_file(
    ctx: &ScanContext,
    entry: CorpusEntry,
    bytes: Vec<u8>,
) -> Result<()> {
    let kind = match entry.extension.as_deref() {
        Some(ext) => DocKind::from_extension(ext),
        None => kind::resolve(entry.name(), None, &bytes),
    };
    let text = task::spawn_blocking(move || extract::extract_as(kind, &bytes))
        .await
        .map_err(|e| SiftError::Task(e.to_string()))??;

    let Some(text) = text else {
        debug!(path = %entry.path.display(), %kind, "Unsupported file type, skipping");
        return Ok(());
    };

    for keyword in ctx.keywords.find_in(&text) {
        ctx.log.write_match(&MatchRecord::new(&entry.path, keyword))?;
    }
    Ok(())
}
