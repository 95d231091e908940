//! Axum HTTP API server for topic-to-video generation.
//!
//! This crate provides:
//! - Script generation from a chat-completion model or offline heuristics
//! - Synchronous generate-and-download and background job endpoints
//! - Per-job progress polling
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::{ApiConfig, ContentMode, TtsEngine};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{ContentError, ContentGenerator, JobRegistry, RenderPipeline};
pub use state::AppState;
