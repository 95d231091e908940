//! Topic to video pipeline: content generation followed by rendering.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use slidecast_media::{RenderedVideo, VideoRenderer};
use slidecast_models::{JobId, RenderProgress};
use tokio::sync::watch;
use tracing::{error, info, info_span, warn, Instrument};

use crate::error::ApiResult;
use crate::metrics;
use crate::services::content::ContentGenerator;

/// Progress error recorded when a render stops without finishing.
pub const RENDER_ABORTED_MESSAGE: &str = "Render aborted";

/// Runs one job end to end.
#[derive(Clone)]
pub struct RenderPipeline {
    content: Arc<dyn ContentGenerator>,
    renderer: Arc<VideoRenderer>,
}

impl RenderPipeline {
    pub fn new(content: Arc<dyn ContentGenerator>, renderer: Arc<VideoRenderer>) -> Self {
        Self { content, renderer }
    }

    /// Where the video of `job_id` is written.
    pub fn output_path(&self, job_id: &JobId) -> PathBuf {
        self.renderer
            .config()
            .work_dir
            .join(format!("{}.mp4", job_id))
    }

    /// Generate a script for `topic` and render it.
    ///
    /// `progress` ends in `complete` on success and `error` on any failure,
    /// including failures before rendering starts. A render dropped or
    /// panicking midway also leaves `error` behind.
    pub async fn run(
        &self,
        job_id: &JobId,
        topic: &str,
        progress: &watch::Sender<RenderProgress>,
    ) -> ApiResult<RenderedVideo> {
        let span = info_span!("render_job", job_id = %job_id);
        let _unfinished = scopeguard::guard(progress, fail_if_unfinished);
        self.run_inner(job_id, topic, progress).instrument(span).await
    }

    async fn run_inner(
        &self,
        job_id: &JobId,
        topic: &str,
        progress: &watch::Sender<RenderProgress>,
    ) -> ApiResult<RenderedVideo> {
        metrics::record_render_started();
        let _in_flight = scopeguard::guard((), |_| metrics::record_render_finished());
        let started = Instant::now();

        info!("Generating content for topic: {}", topic);
        let content_started = Instant::now();
        let script = match self.content.generate_content(topic).await {
            Ok(script) => {
                metrics::record_content_generation(
                    self.content.name(),
                    true,
                    content_started.elapsed().as_secs_f64(),
                );
                script
            }
            Err(e) => {
                metrics::record_content_generation(
                    self.content.name(),
                    false,
                    content_started.elapsed().as_secs_f64(),
                );
                metrics::record_render_failed("content");
                error!("Error generating content: {}", e);
                progress.send_modify(|p| p.fail(e.to_string()));
                return Err(e.into());
            }
        };
        info!(sections = script.section_count(), "Content generated successfully");

        let output = self.output_path(job_id);
        let video = self
            .renderer
            .create_video(&script, &output, progress)
            .await
            .map_err(|e| {
                metrics::record_render_failed("render");
                e
            })?;

        metrics::record_render_completed(started.elapsed().as_secs_f64(), video.duration_secs);
        info!(path = %video.path.display(), "Video generated");
        Ok(video)
    }
}

fn fail_if_unfinished(progress: &watch::Sender<RenderProgress>) {
    let finished = progress.borrow().status.is_terminal();
    if !finished {
        warn!("Render abandoned before finishing");
        progress.send_modify(|p| p.fail(RENDER_ABORTED_MESSAGE));
    }
}
