//! Asynchronous job endpoints: submit, poll, download.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use slidecast_models::JobId;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::handlers::video::{attachment_name, stream_video, TopicSubmission};
use crate::services::{JobView, OutputClaim};
use crate::state::AppState;

/// Response to a job submission.
#[derive(Debug, Serialize)]
pub struct JobCreatedResponse {
    pub job_id: JobId,
    pub status_url: String,
    pub video_url: String,
}

/// Accept a topic and render it in the background.
pub async fn create_job(
    State(state): State<AppState>,
    TopicSubmission(topic): TopicSubmission,
) -> ApiResult<(StatusCode, Json<JobCreatedResponse>)> {
    let (job_id, progress) = state.jobs.register(&topic).await;

    info!(job_id = %job_id, "Queued video for topic: {}", topic);

    let task_state = state.clone();
    let task_job_id = job_id.clone();
    tokio::spawn(async move {
        match task_state.pipeline.run(&task_job_id, &topic, &progress).await {
            Ok(video) => task_state.jobs.set_output(&task_job_id, video.path).await,
            Err(e) => warn!(job_id = %task_job_id, "Background render failed: {}", e),
        }
    });

    let response = JobCreatedResponse {
        status_url: format!("/jobs/{}", job_id),
        video_url: format!("/jobs/{}/video", job_id),
        job_id,
    };
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Status of one job.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobView>> {
    let job_id = JobId::from_string(job_id);
    state
        .jobs
        .view(&job_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Job not found: {}", job_id)))
}

/// Download a finished job's video. Each video can be downloaded once.
pub async fn download_job_video(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let job_id = JobId::from_string(job_id);

    match state.jobs.claim_output(&job_id).await {
        OutputClaim::Ready { path, topic } => {
            stream_video(&path, &attachment_name(&topic), &job_id).await
        }
        OutputClaim::NotReady(status) => Err(ApiError::conflict(format!(
            "Video is not ready (status: {})",
            status
        ))),
        OutputClaim::AlreadyDownloaded => Err(ApiError::Gone(format!(
            "Video for job {} was already downloaded",
            job_id
        ))),
        OutputClaim::UnknownJob => Err(ApiError::not_found(format!("Job not found: {}", job_id))),
    }
}
