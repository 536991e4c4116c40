use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::domain::{
    HistoryId, JobDraft, JobId, JobRecord, ModerationAction, UploadHistory, UploadStatus, UserId,
};

/// Storage abstraction so the import pipeline and routes can be exercised
/// against any backing store.
pub trait JobBoardRepository: Send + Sync {
    fn create_job(&self, posted_by: UserId, draft: JobDraft) -> Result<JobRecord, RepositoryError>;
    fn create_upload_history(
        &self,
        uploader: UserId,
        filename: &str,
    ) -> Result<UploadHistory, RepositoryError>;
    fn update_upload_history(
        &self,
        id: HistoryId,
        update: UploadHistoryUpdate,
    ) -> Result<(), RepositoryError>;
    fn fetch_upload_history(&self, id: HistoryId) -> Result<Option<UploadHistory>, RepositoryError>;
    fn list_upload_history(
        &self,
        uploader: UserId,
        page: PageRequest,
    ) -> Result<HistoryPage, RepositoryError>;
    fn list_jobs(&self, query: JobQuery) -> Result<JobPage, RepositoryError>;
    /// Unscoped listing for the moderation queue, newest first.
    fn list_jobs_for_moderation(
        &self,
        filter: ModerationFilter,
        page: PageRequest,
    ) -> Result<ModerationPage, RepositoryError>;
    fn moderate_job(
        &self,
        id: JobId,
        action: ModerationAction,
        flag_reason: Option<String>,
    ) -> Result<JobRecord, RepositoryError>;
}

/// Partial update applied to an upload-history record. `None` fields are
/// left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadHistoryUpdate {
    pub status: Option<UploadStatus>,
    pub total: Option<u64>,
    pub success: Option<u64>,
    pub errors: Option<u64>,
    pub error_file: Option<PathBuf>,
}

impl UploadHistoryUpdate {
    pub fn counters(success: u64, errors: u64) -> Self {
        Self {
            success: Some(success),
            errors: Some(errors),
            ..Self::default()
        }
    }

    pub fn total(total: u64) -> Self {
        Self {
            total: Some(total),
            ..Self::default()
        }
    }

    /// Final write of a run. Re-states the counters so the stored record is
    /// correct even when every incremental counter write was lost.
    pub fn finished(
        status: UploadStatus,
        total: u64,
        success: u64,
        errors: u64,
        error_file: Option<PathBuf>,
    ) -> Self {
        Self {
            status: Some(status),
            total: Some(total),
            success: Some(success),
            errors: Some(errors),
            error_file,
        }
    }
}

/// One-based page selector shared by the listing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }

    pub fn page_count(&self, total_records: u64) -> u64 {
        total_records.div_ceil(self.limit)
    }
}

/// Page of upload-history records, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    pub history: Vec<UploadHistory>,
    pub total_pages: u64,
    pub current_page: u64,
    pub total_records: u64,
}

/// Filters for the job listing, matching the board's search surface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobQuery {
    /// Case-insensitive match against title or description.
    pub search: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    /// Restricts results to one poster; employers only see their own jobs.
    pub posted_by: Option<UserId>,
    pub page: u64,
    pub limit: u64,
}

impl JobQuery {
    pub fn matches(&self, record: &JobRecord) -> bool {
        if let Some(poster) = self.posted_by {
            if record.posted_by != poster {
                return false;
            }
        }
        if let Some(category) = self.category.as_deref() {
            if record.posting.category != category {
                return false;
            }
        }
        if let Some(location) = self.location.as_deref() {
            if record.posting.location != location {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref() {
            let needle = search.to_lowercase();
            let title = record.posting.title.to_lowercase();
            let description = record.posting.description.to_lowercase();
            if !title.contains(&needle) && !description.contains(&needle) {
                return false;
            }
        }
        true
    }
}

/// Page of job postings, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct JobPage {
    pub jobs: Vec<JobRecord>,
    pub total_pages: u64,
}

/// Slice of the moderation queue requested by an admin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModerationFilter {
    #[default]
    All,
    Flagged,
    Unapproved,
}

impl ModerationFilter {
    /// Query-string parsing; anything unrecognized falls back to the full
    /// queue rather than erroring.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "flagged" => Self::Flagged,
            "unapproved" => Self::Unapproved,
            _ => Self::All,
        }
    }

    pub fn matches(&self, record: &JobRecord) -> bool {
        match self {
            Self::All => true,
            Self::Flagged => record.is_flagged,
            Self::Unapproved => !record.is_approved,
        }
    }
}

/// Page of the moderation queue with the full pagination envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ModerationPage {
    pub jobs: Vec<JobRecord>,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub total_count: u64,
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(posted_by: u64, title: &str, category: &str) -> JobRecord {
        JobRecord {
            id: JobId(1),
            posted_by: UserId(posted_by),
            posting: JobDraft {
                title: title.to_string(),
                company: "Acme".to_string(),
                category: category.to_string(),
                description: "Ship features".to_string(),
                salary: None,
                location: "Remote".to_string(),
                requirements: Vec::new(),
                benefits: Vec::new(),
            },
            is_approved: false,
            is_flagged: false,
            flag_reason: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn page_request_clamps_and_computes_offsets() {
        let page = PageRequest::new(0, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 1);

        let page = PageRequest::new(3, 5);
        assert_eq!(page.offset(), 10);
        assert_eq!(page.page_count(11), 3);
        assert_eq!(page.page_count(0), 0);
    }

    #[test]
    fn job_query_filters_by_search_and_scope() {
        let engineering = record(7, "Backend Engineer", "Engineering");

        let mut query = JobQuery {
            search: Some("backend".to_string()),
            ..JobQuery::default()
        };
        assert!(query.matches(&engineering));

        query.posted_by = Some(UserId(8));
        assert!(!query.matches(&engineering));

        let by_category = JobQuery {
            category: Some("Sales".to_string()),
            ..JobQuery::default()
        };
        assert!(!by_category.matches(&engineering));
    }

    #[test]
    fn moderation_filter_parses_and_selects() {
        assert_eq!(ModerationFilter::parse("flagged"), ModerationFilter::Flagged);
        assert_eq!(
            ModerationFilter::parse("Unapproved"),
            ModerationFilter::Unapproved
        );
        assert_eq!(ModerationFilter::parse("everything"), ModerationFilter::All);

        let mut posting = record(7, "Backend Engineer", "Engineering");
        assert!(ModerationFilter::All.matches(&posting));
        assert!(ModerationFilter::Unapproved.matches(&posting));
        assert!(!ModerationFilter::Flagged.matches(&posting));

        posting.moderate(ModerationAction::Flag, Some("spam".to_string()));
        assert!(ModerationFilter::Flagged.matches(&posting));

        posting.moderate(ModerationAction::Approve, None);
        assert!(!ModerationFilter::Flagged.matches(&posting));
        assert!(!ModerationFilter::Unapproved.matches(&posting));
        assert_eq!(posting.flag_reason, None);
    }
}
