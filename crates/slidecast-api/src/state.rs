//! Application state.

use std::sync::Arc;

use slidecast_media::{CommandTts, GoogleTranslateTts, RenderConfig, SpeechSynthesizer, VideoRenderer};
use tracing::info;

use crate::config::{ApiConfig, TtsEngine};
use crate::services::{content_generator, ContentGenerator, JobRegistry, RenderPipeline};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: RenderPipeline,
    pub jobs: Arc<JobRegistry>,
}

impl AppState {
    /// Create state with the generator and engines selected by `config`.
    pub fn new(config: ApiConfig) -> Self {
        let content = content_generator(&config.content);

        let tts: Arc<dyn SpeechSynthesizer> = match config.render.tts_engine {
            TtsEngine::Google => Arc::new(GoogleTranslateTts::new(&config.render.tts_language)),
            TtsEngine::Espeak => Arc::new(CommandTts::espeak(&config.render.tts_language)),
        };

        info!(
            content = content.name(),
            tts = tts.name(),
            work_dir = %config.work_dir.display(),
            "Configured render pipeline"
        );

        let renderer = VideoRenderer::with_ffmpeg(render_config(&config), tts);
        Self::with_services(config, content, Arc::new(renderer))
    }

    /// Create state around explicit services.
    pub fn with_services(
        config: ApiConfig,
        content: Arc<dyn ContentGenerator>,
        renderer: Arc<VideoRenderer>,
    ) -> Self {
        Self {
            config,
            pipeline: RenderPipeline::new(content, renderer),
            jobs: Arc::new(JobRegistry::new()),
        }
    }
}

/// Renderer settings derived from the API config.
pub fn render_config(config: &ApiConfig) -> RenderConfig {
    RenderConfig {
        work_dir: config.work_dir.clone(),
        title_slide: config.render.title_slide,
        visual: config.render.visual,
        font_file: config.render.font_file.clone(),
        ffmpeg_timeout_secs: config.render.ffmpeg_timeout_secs,
    }
}
