use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;

use jobwire::jobs::domain::{
    HistoryId, JobDraft, JobId, JobRecord, ModerationAction, UploadHistory, UploadStatus, UserId,
    UserRole,
};
use jobwire::jobs::repository::{
    HistoryPage, JobBoardRepository, JobPage, JobQuery, ModerationFilter, ModerationPage,
    PageRequest, RepositoryError, UploadHistoryUpdate,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Session identity forwarded by the authenticating gateway. The gateway
/// verifies the session cookie and passes the resolved identity along in
/// `x-user-id` / `x-user-role` headers; anything missing or malformed is a
/// 401 before a handler runs.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AuthenticatedUser {
    pub(crate) id: UserId,
    pub(crate) role: UserRole,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        let role = parts
            .headers
            .get("x-user-role")
            .and_then(|value| value.to_str().ok())
            .and_then(UserRole::parse);

        match (id, role) {
            (Some(id), Some(role)) => Ok(Self {
                id: UserId(id),
                role,
            }),
            _ => Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized" })),
            )),
        }
    }
}

#[derive(Default)]
struct Store {
    jobs: Vec<JobRecord>,
    history: HashMap<HistoryId, UploadHistory>,
    next_job: u64,
    next_history: u64,
}

/// In-memory stand-in for the relational store behind the persistence trait.
#[derive(Default, Clone)]
pub(crate) struct InMemoryJobBoardRepository {
    store: Arc<Mutex<Store>>,
}

impl JobBoardRepository for InMemoryJobBoardRepository {
    fn create_job(&self, posted_by: UserId, draft: JobDraft) -> Result<JobRecord, RepositoryError> {
        let mut store = self.store.lock().expect("store mutex poisoned");
        store.next_job += 1;
        let record = JobRecord {
            id: JobId(store.next_job),
            posted_by,
            posting: draft,
            is_approved: false,
            is_flagged: false,
            flag_reason: None,
            is_active: true,
            created_at: Utc::now(),
        };
        store.jobs.push(record.clone());
        Ok(record)
    }

    fn create_upload_history(
        &self,
        uploader: UserId,
        filename: &str,
    ) -> Result<UploadHistory, RepositoryError> {
        let mut store = self.store.lock().expect("store mutex poisoned");
        store.next_history += 1;
        let record = UploadHistory {
            id: HistoryId(store.next_history),
            uploader,
            filename: filename.to_string(),
            status: UploadStatus::InProgress,
            total: 0,
            success: 0,
            errors: 0,
            error_file: None,
            created_at: Utc::now(),
        };
        store.history.insert(record.id, record.clone());
        Ok(record)
    }

    fn update_upload_history(
        &self,
        id: HistoryId,
        update: UploadHistoryUpdate,
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().expect("store mutex poisoned");
        let record = store.history.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if let Some(status) = update.status {
            record.status = status;
        }
        if let Some(total) = update.total {
            record.total = total;
        }
        if let Some(success) = update.success {
            record.success = success;
        }
        if let Some(errors) = update.errors {
            record.errors = errors;
        }
        if let Some(error_file) = update.error_file {
            record.error_file = Some(error_file);
        }
        Ok(())
    }

    fn fetch_upload_history(&self, id: HistoryId) -> Result<Option<UploadHistory>, RepositoryError> {
        let store = self.store.lock().expect("store mutex poisoned");
        Ok(store.history.get(&id).cloned())
    }

    fn list_upload_history(
        &self,
        uploader: UserId,
        page: PageRequest,
    ) -> Result<HistoryPage, RepositoryError> {
        let store = self.store.lock().expect("store mutex poisoned");
        let mut records: Vec<UploadHistory> = store
            .history
            .values()
            .filter(|record| record.uploader == uploader)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.0.cmp(&a.id.0)));

        let total_records = records.len() as u64;
        let history = records
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();

        Ok(HistoryPage {
            history,
            total_pages: page.page_count(total_records),
            current_page: page.page,
            total_records,
        })
    }

    fn list_jobs(&self, query: JobQuery) -> Result<JobPage, RepositoryError> {
        let store = self.store.lock().expect("store mutex poisoned");
        let mut matches: Vec<JobRecord> = store
            .jobs
            .iter()
            .filter(|record| query.matches(record))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.0.cmp(&a.id.0)));

        let page = PageRequest::new(query.page, query.limit);
        let total_pages = page.page_count(matches.len() as u64);
        let jobs = matches
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();

        Ok(JobPage { jobs, total_pages })
    }

    fn list_jobs_for_moderation(
        &self,
        filter: ModerationFilter,
        page: PageRequest,
    ) -> Result<ModerationPage, RepositoryError> {
        let store = self.store.lock().expect("store mutex poisoned");
        let mut matches: Vec<JobRecord> = store
            .jobs
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.0.cmp(&a.id.0)));

        let total_count = matches.len() as u64;
        let jobs = matches
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();

        Ok(ModerationPage {
            jobs,
            page: page.page,
            limit: page.limit,
            total_pages: page.page_count(total_count),
            total_count,
        })
    }

    fn moderate_job(
        &self,
        id: JobId,
        action: ModerationAction,
        flag_reason: Option<String>,
    ) -> Result<JobRecord, RepositoryError> {
        let mut store = self.store.lock().expect("store mutex poisoned");
        let record = store
            .jobs
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(RepositoryError::NotFound)?;
        record.moderate(action, flag_reason);
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, category: &str) -> JobDraft {
        JobDraft {
            title: title.to_string(),
            company: "Acme".to_string(),
            category: category.to_string(),
            description: String::new(),
            salary: None,
            location: "Remote".to_string(),
            requirements: Vec::new(),
            benefits: Vec::new(),
        }
    }

    #[test]
    fn job_listing_paginates_newest_first() {
        let repository = InMemoryJobBoardRepository::default();
        for i in 0..5 {
            repository
                .create_job(UserId(1), draft(&format!("Role {i}"), "Engineering"))
                .expect("job inserts");
        }

        let page = repository
            .list_jobs(JobQuery {
                page: 1,
                limit: 2,
                ..JobQuery::default()
            })
            .expect("jobs list");
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.jobs.len(), 2);
        assert_eq!(page.jobs[0].posting.title, "Role 4");
    }

    #[test]
    fn history_listing_is_owner_scoped() {
        let repository = InMemoryJobBoardRepository::default();
        repository
            .create_upload_history(UserId(1), "a.csv")
            .expect("history inserts");
        repository
            .create_upload_history(UserId(2), "b.csv")
            .expect("history inserts");

        let page = repository
            .list_upload_history(UserId(1), PageRequest::new(1, 5))
            .expect("history lists");
        assert_eq!(page.total_records, 1);
        assert_eq!(page.history[0].filename, "a.csv");
    }

    #[test]
    fn moderation_queue_tracks_transitions() {
        let repository = InMemoryJobBoardRepository::default();
        let first = repository
            .create_job(UserId(1), draft("Chef", "Hospitality"))
            .expect("job inserts");
        let second = repository
            .create_job(UserId(2), draft("Cook", "Hospitality"))
            .expect("job inserts");

        repository
            .moderate_job(first.id, ModerationAction::Flag, Some("spam".to_string()))
            .expect("flag applies");
        repository
            .moderate_job(second.id, ModerationAction::Approve, None)
            .expect("approve applies");

        let flagged = repository
            .list_jobs_for_moderation(ModerationFilter::Flagged, PageRequest::new(1, 20))
            .expect("queue lists");
        assert_eq!(flagged.total_count, 1);
        assert_eq!(flagged.jobs[0].id, first.id);
        assert_eq!(flagged.jobs[0].flag_reason.as_deref(), Some("spam"));

        let unapproved = repository
            .list_jobs_for_moderation(ModerationFilter::Unapproved, PageRequest::new(1, 20))
            .expect("queue lists");
        assert_eq!(unapproved.total_count, 1);
        assert_eq!(unapproved.jobs[0].id, first.id);

        let missing = repository.moderate_job(JobId(99), ModerationAction::Approve, None);
        assert!(matches!(missing, Err(RepositoryError::NotFound)));
    }
}
