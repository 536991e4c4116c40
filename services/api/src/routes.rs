use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde_json::json;

use jobwire::jobs::domain::{HistoryId, JobDraft, JobId, ModerationAction, UserRole};
use jobwire::jobs::import::BulkJobImporter;
use jobwire::jobs::repository::{
    JobBoardRepository, JobQuery, ModerationFilter, PageRequest, RepositoryError,
};

use crate::infra::{AppState, AuthenticatedUser};

/// Shared handler state: the persistence handle plus the import pipeline
/// bound to it.
pub(crate) struct JobBoardState<R> {
    pub(crate) repository: Arc<R>,
    pub(crate) importer: BulkJobImporter<R>,
    pub(crate) max_upload_bytes: usize,
}

impl<R> Clone for JobBoardState<R> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            importer: self.importer.clone(),
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

/// Router builder exposing the job-board endpoints.
pub(crate) fn job_board_router<R>(state: JobBoardState<R>) -> Router
where
    R: JobBoardRepository + 'static,
{
    // The framework's default body cap is smaller than the configured upload
    // cap, so the bulk route carries its own limit; the handler still
    // enforces the exact file-size cap after decoding the multipart field.
    let bulk_body_limit = DefaultBodyLimit::max(upload_body_limit(state.max_upload_bytes));

    Router::new()
        .route(
            "/api/v1/jobs",
            get(list_jobs_handler::<R>).post(post_job_handler::<R>),
        )
        .route(
            "/api/v1/jobs/bulk",
            post(bulk_upload_handler::<R>).layer(bulk_body_limit),
        )
        .route("/api/v1/jobs/bulk/history", get(history_handler::<R>))
        .route(
            "/api/v1/jobs/bulk/:history_id/errors",
            get(error_report_handler::<R>),
        )
        .route(
            "/api/v1/admin/jobs",
            get(admin_jobs_handler::<R>).patch(moderate_job_handler::<R>),
        )
        .with_state(state)
}

/// Multipart framing adds boundary lines and part headers on top of the file
/// bytes, so the request-body cap sits a little above the file cap.
const UPLOAD_ENVELOPE_BYTES: usize = 64 * 1024;

fn upload_body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes.saturating_add(UPLOAD_ENVELOPE_BYTES)
}

/// Job-board routes plus the operational endpoints.
pub(crate) fn with_operational_routes<R>(state: JobBoardState<R>) -> Router
where
    R: JobBoardRepository + 'static,
{
    job_board_router(state)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Accepts the multipart upload, stages the run, and answers immediately.
/// The pipeline itself runs on a detached blocking task; callers poll the
/// history endpoint for progress.
pub(crate) async fn bulk_upload_handler<R>(
    State(state): State<JobBoardState<R>>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Response
where
    R: JobBoardRepository + 'static,
{
    if user.role != UserRole::Employer {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Unauthorized" })),
        )
            .into_response();
    }

    let mut upload: Option<(String, Vec<u8>)> = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let filename = field.file_name().unwrap_or("upload.csv").to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        upload = Some((filename, bytes.to_vec()));
                        break;
                    }
                    Err(error) => {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(json!({ "message": error.to_string() })),
                        )
                            .into_response();
                    }
                }
            }
            Ok(None) => break,
            Err(error) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "message": error.to_string() })),
                )
                    .into_response();
            }
        }
    }

    let Some((filename, contents)) = upload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "No file provided" })),
        )
            .into_response();
    };

    if contents.len() > state.max_upload_bytes {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(json!({ "message": "File exceeds the upload size limit" })),
        )
            .into_response();
    }

    match state.importer.begin(user.id, &filename, &contents) {
        Ok(pending) => {
            let history_id = pending.history_id;
            let importer = state.importer.clone();
            tokio::task::spawn_blocking(move || {
                importer.run(pending);
            });

            (
                StatusCode::ACCEPTED,
                Json(json!({
                    "message": "File uploaded successfully. Processing in progress.",
                    "history_id": history_id.0,
                })),
            )
                .into_response()
        }
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": error.to_string() })),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryParams {
    page: Option<u64>,
    limit: Option<u64>,
}

pub(crate) async fn history_handler<R>(
    State(state): State<JobBoardState<R>>,
    user: AuthenticatedUser,
    Query(params): Query<HistoryParams>,
) -> Response
where
    R: JobBoardRepository + 'static,
{
    let page = PageRequest::new(params.page.unwrap_or(1), params.limit.unwrap_or(5));
    match state.repository.list_upload_history(user.id, page) {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": error.to_string() })),
        )
            .into_response(),
    }
}

pub(crate) async fn error_report_handler<R>(
    State(state): State<JobBoardState<R>>,
    user: AuthenticatedUser,
    Path(history_id): Path<u64>,
) -> Response
where
    R: JobBoardRepository + 'static,
{
    let not_found = || {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Error file not found" })),
        )
            .into_response()
    };

    match state.repository.fetch_upload_history(HistoryId(history_id)) {
        Ok(Some(record)) if record.uploader == user.id => {
            let Some(path) = record.error_file else {
                return not_found();
            };
            match std::fs::read(&path) {
                Ok(bytes) => {
                    let content_type = mime_guess::from_path(&path).first_or_octet_stream();
                    (
                        StatusCode::OK,
                        [
                            (header::CONTENT_TYPE, content_type.to_string()),
                            (
                                header::CONTENT_DISPOSITION,
                                format!("attachment; filename=\"errors-{}.csv\"", record.id.0),
                            ),
                        ],
                        bytes,
                    )
                        .into_response()
                }
                Err(_) => not_found(),
            }
        }
        Ok(_) => not_found(),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": error.to_string() })),
        )
            .into_response(),
    }
}

pub(crate) async fn post_job_handler<R>(
    State(state): State<JobBoardState<R>>,
    user: AuthenticatedUser,
    Json(draft): Json<JobDraft>,
) -> Response
where
    R: JobBoardRepository + 'static,
{
    if user.role != UserRole::Employer {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "message": "Unauthorized. Only employers can post jobs." })),
        )
            .into_response();
    }

    if let Err(error) = draft.require_complete() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": error.to_string() })),
        )
            .into_response();
    }

    match state.repository.create_job(user.id, draft) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": error.to_string() })),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct JobListParams {
    page: Option<u64>,
    limit: Option<u64>,
    search: Option<String>,
    category: Option<String>,
    location: Option<String>,
}

pub(crate) async fn list_jobs_handler<R>(
    State(state): State<JobBoardState<R>>,
    user: AuthenticatedUser,
    Query(params): Query<JobListParams>,
) -> Response
where
    R: JobBoardRepository + 'static,
{
    // Employers browse their own postings; everyone else sees the full board.
    let posted_by = (user.role == UserRole::Employer).then_some(user.id);

    let query = JobQuery {
        search: params.search.filter(|value| !value.trim().is_empty()),
        category: params.category.filter(|value| !value.trim().is_empty()),
        location: params.location.filter(|value| !value.trim().is_empty()),
        posted_by,
        page: params.page.unwrap_or(1),
        limit: params.limit.unwrap_or(10),
    };

    match state.repository.list_jobs(query) {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": error.to_string() })),
        )
            .into_response(),
    }
}

fn admin_only(user: AuthenticatedUser) -> Option<Response> {
    (user.role != UserRole::Admin).then(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Unauthorized" })),
        )
            .into_response()
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModerationQueueParams {
    filter: Option<String>,
    page: Option<u64>,
    limit: Option<u64>,
}

/// Admin view of the full board: every posting regardless of owner, sliced
/// by moderation state.
pub(crate) async fn admin_jobs_handler<R>(
    State(state): State<JobBoardState<R>>,
    user: AuthenticatedUser,
    Query(params): Query<ModerationQueueParams>,
) -> Response
where
    R: JobBoardRepository + 'static,
{
    if let Some(rejection) = admin_only(user) {
        return rejection;
    }

    let filter = params
        .filter
        .as_deref()
        .map(ModerationFilter::parse)
        .unwrap_or_default();
    let page = PageRequest::new(params.page.unwrap_or(1), params.limit.unwrap_or(20));

    match state.repository.list_jobs_for_moderation(filter, page) {
        Ok(queue) => (
            StatusCode::OK,
            Json(json!({
                "jobs": queue.jobs,
                "pagination": {
                    "page": queue.page,
                    "limit": queue.limit,
                    "total_pages": queue.total_pages,
                    "total_count": queue.total_count,
                },
            })),
        )
            .into_response(),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": error.to_string() })),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModerationRequest {
    job_id: u64,
    action: String,
    #[serde(default)]
    flag_reason: Option<String>,
}

pub(crate) async fn moderate_job_handler<R>(
    State(state): State<JobBoardState<R>>,
    user: AuthenticatedUser,
    Json(request): Json<ModerationRequest>,
) -> Response
where
    R: JobBoardRepository + 'static,
{
    if let Some(rejection) = admin_only(user) {
        return rejection;
    }

    let Some(action) = ModerationAction::parse(&request.action) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Invalid action" })),
        )
            .into_response();
    };

    match state
        .repository
        .moderate_job(JobId(request.job_id), action, request.flag_reason)
    {
        Ok(job) => (
            StatusCode::OK,
            Json(json!({
                "job": job,
                "message": format!("Job {} successfully", action.applied_label()),
            })),
        )
            .into_response(),
        Err(RepositoryError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Job not found" })),
        )
            .into_response(),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": error.to_string() })),
        )
            .into_response(),
    }
}
