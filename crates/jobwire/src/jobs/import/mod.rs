pub mod mapper;
pub mod parser;
pub mod progress;
pub mod report;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::jobs::domain::{HistoryId, UploadStatus, UserId};
use crate::jobs::repository::{JobBoardRepository, RepositoryError, UploadHistoryUpdate};

use progress::ProgressTracker;
use report::ErrorCollector;

#[derive(Debug, thiserror::Error)]
pub enum BulkImportError {
    #[error("failed to read upload: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A run accepted by `begin`, waiting to be processed.
#[derive(Debug)]
pub struct PendingImport {
    pub history_id: HistoryId,
    pub uploader: UserId,
    pub temp_path: PathBuf,
}

/// Final state of a run after `run` returns.
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub history_id: HistoryId,
    pub status: UploadStatus,
    pub total: u64,
    pub success: u64,
    pub errors: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_file: Option<PathBuf>,
}

/// Drives one bulk import: temp-file staging, the two-pass scan, per-row
/// persistence, the error report, and history finalization.
pub struct BulkJobImporter<R> {
    repository: Arc<R>,
    temp_dir: PathBuf,
}

impl<R> Clone for BulkJobImporter<R> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            temp_dir: self.temp_dir.clone(),
        }
    }
}

impl<R: JobBoardRepository> BulkJobImporter<R> {
    pub fn new(repository: Arc<R>, temp_dir: PathBuf) -> Self {
        Self {
            repository,
            temp_dir,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Stages the upload on disk and opens an `in_progress` history record.
    /// The caller hands the returned token to `run`, usually on a detached
    /// task, and replies to the uploader right away.
    pub fn begin(
        &self,
        uploader: UserId,
        filename: &str,
        contents: &[u8],
    ) -> Result<PendingImport, BulkImportError> {
        fs::create_dir_all(&self.temp_dir)?;

        // Millisecond timestamps alone can collide for concurrent uploads of
        // the same file, so a process-wide sequence keeps names unique.
        static STAGING_SEQUENCE: AtomicU64 = AtomicU64::new(0);
        let sequence = STAGING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let temp_name = format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            sequence,
            sanitize_filename(filename)
        );
        let temp_path = self.temp_dir.join(temp_name);
        fs::write(&temp_path, contents)?;

        let history = match self.repository.create_upload_history(uploader, filename) {
            Ok(history) => history,
            Err(source) => {
                let _ = fs::remove_file(&temp_path);
                return Err(source.into());
            }
        };

        info!(history_id = history.id.0, filename, "bulk import accepted");

        Ok(PendingImport {
            history_id: history.id,
            uploader,
            temp_path,
        })
    }

    /// Processes a staged upload to completion. Row-level rejections are
    /// collected and never abort the run; a stream-level or unexpected error
    /// marks the whole run `failed` with the temp path left as a diagnostic
    /// pointer. The staged file is deleted either way.
    pub fn run(&self, pending: PendingImport) -> ImportSummary {
        let mut tracker = ProgressTracker::new(self.repository.clone(), pending.history_id);
        let mut collector = ErrorCollector::default();

        let (status, error_file) = match self.process(&pending, &mut tracker, &mut collector) {
            Ok(error_file) => (UploadStatus::Completed, error_file),
            Err(source) => {
                error!(
                    history_id = pending.history_id.0,
                    %source,
                    "bulk import run failed"
                );
                (UploadStatus::Failed, Some(pending.temp_path.clone()))
            }
        };

        // The final write restates the counters: incremental counter updates
        // are allowed to fail mid-run, so finalization is the authoritative
        // record of what the run did.
        let update = UploadHistoryUpdate::finished(
            status,
            tracker.total(),
            tracker.success(),
            tracker.errors(),
            error_file.clone(),
        );
        if let Err(source) = self
            .repository
            .update_upload_history(pending.history_id, update)
        {
            error!(
                history_id = pending.history_id.0,
                %source,
                "could not finalize upload history"
            );
        }

        if let Err(source) = fs::remove_file(&pending.temp_path) {
            warn!(
                path = %pending.temp_path.display(),
                %source,
                "staged upload not removed"
            );
        }

        info!(
            history_id = pending.history_id.0,
            status = status.label(),
            total = tracker.total(),
            success = tracker.success(),
            errors = tracker.errors(),
            "bulk import finished"
        );

        ImportSummary {
            history_id: pending.history_id,
            status,
            total: tracker.total(),
            success: tracker.success(),
            errors: tracker.errors(),
            error_file,
        }
    }

    fn process(
        &self,
        pending: &PendingImport,
        tracker: &mut ProgressTracker<R>,
        collector: &mut ErrorCollector,
    ) -> Result<Option<PathBuf>, BulkImportError> {
        // Pass 1: the parsed sequence cannot be rewound, so the file is
        // streamed once purely to learn the row count.
        let file = fs::File::open(&pending.temp_path)?;
        tracker.set_total(parser::count_rows(file)?);

        // Pass 2: validate, persist, and account for every data row.
        let file = fs::File::open(&pending.temp_path)?;
        let mut row_number = 0u64;
        for parsed in parser::rows(file) {
            let row = parsed?;
            row_number += 1;

            match mapper::map_row(&row) {
                Ok(draft) => match self.repository.create_job(pending.uploader, draft) {
                    Ok(_) => tracker.record_success(),
                    Err(source) => {
                        collector.push(row_number, row, source.to_string());
                        tracker.record_error();
                    }
                },
                Err(source) => {
                    collector.push(row_number, row, source.to_string());
                    tracker.record_error();
                }
            }
        }

        if collector.is_empty() {
            return Ok(None);
        }

        let report_path = self
            .temp_dir
            .join(format!("errors-{}.csv", pending.history_id.0));
        collector.write_report(&report_path)?;
        Ok(Some(report_path))
    }
}

/// Strips any path components and reduces the name to a filesystem-safe
/// character set before it is used under the temp directory.
fn sanitize_filename(raw: &str) -> String {
    let name = Path::new(raw)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload.csv");

    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "upload.csv".to_string()
    } else {
        cleaned
    }
}
