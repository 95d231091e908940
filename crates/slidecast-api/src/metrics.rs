//! Prometheus metrics for the API server.

use std::sync::OnceLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "slidecast_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "slidecast_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "slidecast_http_requests_in_flight";

    // Content generation
    pub const CONTENT_DURATION_SECONDS: &str = "slidecast_content_duration_seconds";
    pub const CONTENT_FAILURES_TOTAL: &str = "slidecast_content_failures_total";

    // Rendering
    pub const RENDERS_STARTED_TOTAL: &str = "slidecast_renders_started_total";
    pub const RENDERS_COMPLETED_TOTAL: &str = "slidecast_renders_completed_total";
    pub const RENDERS_FAILED_TOTAL: &str = "slidecast_renders_failed_total";
    pub const RENDERS_IN_FLIGHT: &str = "slidecast_renders_in_flight";
    pub const RENDER_DURATION_SECONDS: &str = "slidecast_render_duration_seconds";
    pub const VIDEO_DURATION_SECONDS: &str = "slidecast_video_duration_seconds";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record one content generation call.
pub fn record_content_generation(generator: &str, success: bool, duration_secs: f64) {
    let labels = [("generator", generator.to_string())];
    histogram!(names::CONTENT_DURATION_SECONDS, &labels).record(duration_secs);
    if !success {
        counter!(names::CONTENT_FAILURES_TOTAL, &labels).increment(1);
    }
}

/// Record a render starting.
pub fn record_render_started() {
    counter!(names::RENDERS_STARTED_TOTAL).increment(1);
    gauge!(names::RENDERS_IN_FLIGHT).increment(1.0);
}

/// Record a render leaving the pipeline, successfully or not.
pub fn record_render_finished() {
    gauge!(names::RENDERS_IN_FLIGHT).decrement(1.0);
}

/// Record a successful render.
pub fn record_render_completed(render_secs: f64, video_secs: f64) {
    counter!(names::RENDERS_COMPLETED_TOTAL).increment(1);
    histogram!(names::RENDER_DURATION_SECONDS).record(render_secs);
    histogram!(names::VIDEO_DURATION_SECONDS).record(video_secs);
}

/// Record a failed render.
pub fn record_render_failed(stage: &str) {
    let labels = [("stage", stage.to_string())];
    counter!(names::RENDERS_FAILED_TOTAL, &labels).increment(1);
}

fn job_id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").ok()
        })
        .as_ref()
}

/// Sanitize path for metrics labels (job IDs become `:id`).
fn sanitize_path(path: &str) -> String {
    match job_id_pattern() {
        Some(pattern) => pattern.replace_all(path, ":id").into_owned(),
        None => path.to_string(),
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/jobs/550e8400-e29b-41d4-a716-446655440000/video"),
            "/jobs/:id/video"
        );
        assert_eq!(
            sanitize_path("/progress/550e8400-e29b-41d4-a716-446655440000"),
            "/progress/:id"
        );
        assert_eq!(sanitize_path("/generate"), "/generate");
    }
}
