//! Health check handlers.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use slidecast_media::{check_ffmpeg, check_ffprobe, MediaResult};

use crate::config::ContentMode;
use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub ffmpeg: CheckStatus,
    pub ffprobe: CheckStatus,
    pub content: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn ok(latency_ms: u64) -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
            latency_ms: Some(latency_ms),
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(msg.into()),
            latency_ms: None,
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

fn check_binary<T>(check: impl FnOnce() -> MediaResult<T>) -> CheckStatus {
    let start = Instant::now();
    match check() {
        Ok(_) => CheckStatus::ok(start.elapsed().as_millis() as u64),
        Err(e) => CheckStatus::error(e.to_string()),
    }
}

/// Readiness check endpoint (readiness probe).
/// Checks that FFmpeg tools are installed and content generation is configured.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let ffmpeg = check_binary(check_ffmpeg);
    let ffprobe = check_binary(check_ffprobe);

    // The credential is only read at call time; a missing one is reported but
    // does not stop the server from starting.
    let content = match state.config.content.mode {
        ContentMode::Heuristic => CheckStatus::ok(0),
        ContentMode::Ai => {
            let key_env = &state.config.content.api_key_env;
            match std::env::var(key_env) {
                Ok(key) if !key.trim().is_empty() => CheckStatus::ok(0),
                _ => CheckStatus::error(format!("{} is not set", key_env)),
            }
        }
    };

    let all_ok = ffmpeg.is_ok() && ffprobe.is_ok() && content.is_ok();

    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks: ReadinessChecks {
            ffmpeg,
            ffprobe,
            content,
        },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
