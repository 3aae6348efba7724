use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::pipeline::layout::RawLayout;
use crate::pipeline::queue::{QueueClosed, WorkQueue};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    QueueClosed(#[from] QueueClosed),
    #[error("scan task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub submitted: usize,
    pub first_error: Option<ScanError>, // later errors are only logged
}

/// One pass over the data root that queues every raw file with no marker.
///
/// Unreadable directories and entries are logged and skipped; the first
/// one is kept in the report. The walk only stops early if the queue has
/// been closed. Blocking I/O, so run it off the async workers.
pub fn scan_unprocessed(layout: &RawLayout, queue: &WorkQueue) -> ScanReport {
    let mut report = ScanReport::default();

    for entry in WalkDir::new(&layout.root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry during scan");
                report.first_error.get_or_insert(ScanError::Walk(err));
                continue;
            }
        };
        if !entry.file_type().is_file() || !layout.is_raw(entry.path()) {
            continue;
        }
        if layout.is_settled(entry.path()) {
            debug!(path = %entry.path().display(), "already processed");
            continue;
        }

        if let Err(err) = queue.submit(entry.into_path()) {
            report.first_error.get_or_insert(ScanError::QueueClosed(err));
            break;
        }
        report.submitted += 1;
    }

    report
}

// Async wrapper that moves the walk onto the blocking pool
pub async fn scan_in_background(layout: RawLayout, queue: WorkQueue) -> ScanReport {
    let root: PathBuf = layout.root.clone();
    let joined = tokio::task::spawn_blocking(move || scan_unprocessed(&layout, &queue)).await;
    settle_scan(&root, joined)
}

// A walk that died part way still has to show up as a failed scan
fn settle_scan(root: &Path, joined: Result<ScanReport, tokio::task::JoinError>) -> ScanReport {
    joined.unwrap_or_else(|err| {
        warn!(root = %root.display(), error = %err, "scan task did not complete");
        ScanReport { submitted: 0, first_error: Some(ScanError::Task(err)) }
    })
}
