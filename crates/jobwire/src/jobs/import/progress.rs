use std::sync::Arc;

use tracing::warn;

use crate::jobs::domain::HistoryId;
use crate::jobs::repository::{JobBoardRepository, UploadHistoryUpdate};

/// Running counters for one import run, persisted through the repository on
/// every change so pollers observe live progress.
///
/// A failed counter write is logged and skipped; the run keeps going and the
/// finalization update restores a correct end state.
pub struct ProgressTracker<R> {
    repository: Arc<R>,
    history_id: HistoryId,
    total: u64,
    success: u64,
    errors: u64,
}

impl<R: JobBoardRepository> ProgressTracker<R> {
    pub fn new(repository: Arc<R>, history_id: HistoryId) -> Self {
        Self {
            repository,
            history_id,
            total: 0,
            success: 0,
            errors: 0,
        }
    }

    /// Called once after the counting pass.
    pub fn set_total(&mut self, total: u64) {
        self.total = total;
        self.persist(UploadHistoryUpdate::total(total));
    }

    pub fn record_success(&mut self) {
        self.success += 1;
        self.persist(UploadHistoryUpdate::counters(self.success, self.errors));
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
        self.persist(UploadHistoryUpdate::counters(self.success, self.errors));
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn success(&self) -> u64 {
        self.success
    }

    pub fn errors(&self) -> u64 {
        self.errors
    }

    fn persist(&self, update: UploadHistoryUpdate) {
        if let Err(error) = self.repository.update_upload_history(self.history_id, update) {
            warn!(
                history_id = self.history_id.0,
                %error,
                "progress update not persisted; continuing"
            );
        }
    }
}
