//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{
    create_job, download_job_video, generate_video, get_job, get_job_progress, get_progress,
    health, index, ready,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, panic_response, payload_too_large, request_id, request_logging, security_headers,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let video_routes = Router::new()
        .route("/", get(index))
        // Synchronous generate-and-download
        .route("/generate", post(generate_video))
        // Progress polling
        .route("/progress", get(get_progress))
        .route("/progress/:job_id", get(get_job_progress))
        // Background jobs
        .route("/jobs", post(create_job))
        .route("/jobs/:job_id", get(get_job))
        .route("/jobs/:job_id/video", get(download_job_video));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(video_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        // Body size is enforced by the tower-http limit alone
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(payload_too_large))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
