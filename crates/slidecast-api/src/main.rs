//! Axum API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use slidecast_api::{create_router, metrics, ApiConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = ApiConfig::from_env();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = config.json_logs();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("slidecast=info,slidecast_api=info,slidecast_media=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting slidecast-api");

    info!(
        "API config: env={}, host={}, port={}, content={:?}, tts={:?}",
        config.environment, config.host, config.port, config.content.mode, config.render.tts_engine
    );

    std::fs::create_dir_all(&config.work_dir)
        .with_context(|| format!("Failed to create work dir {}", config.work_dir.display()))?;

    let state = AppState::new(config.clone());

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        match metrics::init_metrics() {
            Ok(handle) => {
                info!("Prometheus metrics enabled at /metrics");
                Some(handle)
            }
            Err(e) => {
                error!("Failed to install Prometheus recorder: {}", e);
                None
            }
        }
    } else {
        None
    };

    // Prune finished jobs in the background
    let _sweeper = Arc::clone(&state.jobs).spawn_sweeper(config.job_retention);

    // Create router
    let app = create_router(state, metrics_handle);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid bind address")?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
