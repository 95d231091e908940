//! Synchronous generate-and-download endpoint.

use axum::extract::State;
use axum::response::Response;
use tracing::info;

use crate::error::ApiResult;
use crate::handlers::video::{attachment_name, stream_video, TopicSubmission};
use crate::state::AppState;

/// Generate a video for the submitted topic and return it as an attachment.
///
/// The request is held open for the whole render. Progress is available
/// from `/progress` or `/progress/{job_id}` meanwhile.
pub async fn generate_video(
    State(state): State<AppState>,
    TopicSubmission(topic): TopicSubmission,
) -> ApiResult<Response> {
    let (job_id, progress) = state.jobs.register(&topic).await;

    info!(job_id = %job_id, "Generating video for topic: {}", topic);

    let video = state.pipeline.run(&job_id, &topic, &progress).await?;

    stream_video(&video.path, &attachment_name(&topic), &job_id).await
}
