//! Shared pieces of the video endpoints: topic submission, filenames, file streaming.

use std::path::Path;

use axum::async_trait;
use axum::body::Body;
use axum::extract::multipart::MultipartError;
use axum::extract::{Form, FromRequest, Multipart, Request};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use serde::Deserialize;
use slidecast_models::JobId;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

use crate::error::{ApiError, ApiResult};

/// Header carrying the job ID on video responses.
pub const JOB_ID_HEADER: &str = "X-Job-Id";

/// Name of the form field carrying the topic.
const TOPIC_FIELD: &str = "topic";

/// Urlencoded topic form.
#[derive(Debug, Deserialize)]
pub struct TopicForm {
    pub topic: Option<String>,
}

/// A non-blank topic, from either a urlencoded or a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSubmission(pub String);

#[async_trait]
impl<S> FromRequest<S> for TopicSubmission
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let topic = if is_multipart(req.headers()) {
            match Multipart::from_request(req, state).await {
                Ok(multipart) => multipart_topic(multipart).await?,
                Err(rejection) => {
                    debug!("Unreadable multipart form: {}", rejection);
                    None
                }
            }
        } else {
            match Form::<TopicForm>::from_request(req, state).await {
                Ok(Form(form)) => form.topic,
                Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                    return Err(ApiError::PayloadTooLarge)
                }
                Err(rejection) => {
                    debug!("Unreadable topic form: {}", rejection);
                    None
                }
            }
        };

        require_topic(topic).map(TopicSubmission)
    }
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
}

async fn multipart_topic(mut multipart: Multipart) -> ApiResult<Option<String>> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(TOPIC_FIELD) {
            return field.text().await.map(Some).map_err(multipart_error);
        }
    }
    Ok(None)
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::PayloadTooLarge;
    }
    debug!("Malformed multipart body: {}", e);
    ApiError::bad_request("Topic is required")
}

/// Accept `topic` only when it has non-whitespace content.
pub fn require_topic(topic: Option<String>) -> ApiResult<String> {
    topic
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Topic is required"))
}

/// Reduce `name` to a safe ASCII filename component.
///
/// Accents are folded to ASCII (NFKD, then non-ASCII dropped),
/// whitespace-separated words are joined with `_`, anything outside
/// `[A-Za-z0-9_.-]` is dropped, and leading/trailing `.`/`_` are stripped.
/// Falls back to `video` when nothing remains.
pub fn secure_filename(name: &str) -> String {
    let folded: String = name.nfkd().filter(char::is_ascii).collect();
    let joined = folded
        .replace(['/', '\\'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");

    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "video".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Download filename for a video made from `topic`.
pub fn attachment_name(topic: &str) -> String {
    format!("{}_video.mp4", secure_filename(topic))
}

/// Stream a rendered video as an MP4 attachment, then forget the file.
///
/// The file is unlinked as soon as it is open; the open handle keeps the data
/// readable until the stream finishes.
pub async fn stream_video(path: &Path, filename: &str, job_id: &JobId) -> ApiResult<Response> {
    let file = tokio::fs::File::open(path).await?;
    let length = file.metadata().await?.len();

    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Failed to remove video file {}: {}", path.display(), e);
    }

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| ApiError::internal(format!("Invalid download name: {}", e)))?;
    let job_header = HeaderValue::from_str(job_id.as_str())
        .map_err(|e| ApiError::internal(format!("Invalid job id: {}", e)))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_LENGTH, length)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(JOB_ID_HEADER, job_header)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}
