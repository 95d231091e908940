//! API middleware.

use std::any::Any;
use std::time::Instant;

use axum::body::Body;
use axum::http::{header, HeaderValue, Method, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::Json;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tracing::{error, info, Span};
use uuid::Uuid;

use crate::error::{ApiError, ErrorResponse, INTERNAL_ERROR_MESSAGE};
use crate::handlers::video::JOB_ID_HEADER;

/// Create CORS layer.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed_headers = [header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN];

    // Headers to expose to the browser
    let exposed_headers = [
        header::CONTENT_LENGTH,
        header::CONTENT_TYPE,
        header::CONTENT_DISPOSITION,
        header::HeaderName::from_static("x-job-id"),
    ];

    let allowed_methods = [Method::GET, Method::POST, Method::OPTIONS];

    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_methods(AnyOrigin)
            .allow_headers(AnyOrigin)
            .expose_headers(AnyOrigin)
            .allow_origin(AnyOrigin)
            .max_age(std::time::Duration::from_secs(600))
    } else {
        let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_methods(allowed_methods)
            .allow_headers(allowed_headers)
            .expose_headers(exposed_headers)
            .allow_origin(origins)
            .max_age(std::time::Duration::from_secs(600))
    }
}

/// Security headers middleware.
pub async fn security_headers(request: Request<Body>, next: Next) -> Response<Body> {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "Cross-Origin-Resource-Policy",
        HeaderValue::from_static("same-origin"),
    );

    response
}

/// Request ID middleware.
pub async fn request_id(mut request: Request<Body>, next: Next) -> Response<Body> {
    let request_id = request
        .headers()
        .get("X-Request-ID")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(request_id.clone());
    Span::current().record("request_id", &request_id);

    let mut response = next.run(request).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-ID", header_value);
    }

    response
}

/// Request logging middleware.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let duration = start.elapsed();

    // Pollers hit these every second
    let quiet = matches!(uri.path(), "/health" | "/ready" | "/metrics")
        || uri.path().starts_with("/progress");

    if !quiet {
        info!(
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            job_id = response
                .headers()
                .get(JOB_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or(""),
            "Request completed"
        );
    }

    response
}

/// Give every 413 the JSON error body, whichever layer produced it.
pub async fn payload_too_large(request: Request<Body>, next: Next) -> Response<Body> {
    let response = next.run(request).await;

    if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::PayloadTooLarge.into_response();
    }

    response
}

/// Convert a handler panic into a JSON 500.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(INTERNAL_ERROR_MESSAGE)),
    )
        .into_response()
}
