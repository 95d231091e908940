//! Progress polling endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use slidecast_models::{JobId, RenderProgress};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Progress snapshot.
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub progress: f64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
}

impl ProgressResponse {
    fn new(job_id: Option<JobId>, progress: RenderProgress) -> Self {
        Self {
            progress: progress.value,
            status: progress.status_text(),
            error: progress.error,
            job_id,
        }
    }
}

/// Progress of the most recently started job, or idle when there is none.
pub async fn get_progress(State(state): State<AppState>) -> Json<ProgressResponse> {
    let response = match state.jobs.latest().await {
        Some((job_id, progress)) => ProgressResponse::new(Some(job_id), progress),
        None => ProgressResponse::new(None, RenderProgress::default()),
    };
    Json(response)
}

/// Progress of one job.
pub async fn get_job_progress(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<ProgressResponse>> {
    let job_id = JobId::from_string(job_id);
    let progress = state
        .jobs
        .snapshot(&job_id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Job not found: {}", job_id)))?;

    Ok(Json(ProgressResponse::new(Some(job_id), progress)))
}
