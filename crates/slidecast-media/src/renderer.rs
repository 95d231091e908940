//! Script to narrated slideshow video.
//!
//! Sections are processed strictly in order. For each one the narration is
//! synthesized, its duration measured, and a slide of exactly that duration
//! rendered with the audio attached. The clips are then concatenated and
//! encoded to a single MP4.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use slidecast_models::{RenderProgress, Script};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::command::FfmpegRunner;
use crate::compositor::{concat_list_contents, ClipSpec, Compositor, FfmpegCompositor};
use crate::error::{MediaError, MediaResult};
use crate::scratch::ScratchFiles;
use crate::slide::{wrap_text, SlideStyle};
use crate::tts::SpeechSynthesizer;

/// Length of the title slide in seconds.
pub const TITLE_SLIDE_SECS: f64 = 5.0;

/// What is drawn behind the narration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualStyle {
    /// Section text drawn as a caption
    #[default]
    Caption,
    /// Plain background, no text
    Solid,
}

impl std::str::FromStr for VisualStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "caption" | "text" => Ok(VisualStyle::Caption),
            "solid" | "color" | "plain" => Ok(VisualStyle::Solid),
            other => Err(format!("Unknown visual style: {}", other)),
        }
    }
}

/// Renderer configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Directory for scratch files
    pub work_dir: PathBuf,
    /// Prepend a title slide
    pub title_slide: bool,
    /// Section visual
    pub visual: VisualStyle,
    /// Font file for drawn text
    pub font_file: Option<PathBuf>,
    /// Per-invocation FFmpeg timeout
    pub ffmpeg_timeout_secs: Option<u64>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("slidecast"),
            title_slide: true,
            visual: VisualStyle::Caption,
            font_file: None,
            ffmpeg_timeout_secs: None,
        }
    }
}

/// Result of a successful render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedVideo {
    /// Encoded video file
    pub path: PathBuf,
    /// Sum of all clip durations in seconds
    pub duration_secs: f64,
    /// Number of clips concatenated
    pub clip_count: usize,
}

/// Turns scripts into narrated videos.
#[derive(Clone)]
pub struct VideoRenderer {
    config: RenderConfig,
    tts: Arc<dyn SpeechSynthesizer>,
    compositor: Arc<dyn Compositor>,
}

impl VideoRenderer {
    /// Create a renderer with explicit engines.
    pub fn new(
        config: RenderConfig,
        tts: Arc<dyn SpeechSynthesizer>,
        compositor: Arc<dyn Compositor>,
    ) -> Self {
        Self {
            config,
            tts,
            compositor,
        }
    }

    /// Create a renderer that composes with FFmpeg.
    pub fn with_ffmpeg(config: RenderConfig, tts: Arc<dyn SpeechSynthesizer>) -> Self {
        let runner = match config.ffmpeg_timeout_secs {
            Some(secs) => FfmpegRunner::new().with_timeout(secs),
            None => FfmpegRunner::new(),
        };
        Self::new(config, tts, Arc::new(FfmpegCompositor::new(runner)))
    }

    /// Renderer configuration.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render `script` to `output`, reporting through `progress`.
    ///
    /// On success `progress` ends at `complete`/100; on failure at `error`.
    /// Scratch files are removed on both paths; removal failures are only
    /// logged.
    pub async fn create_video(
        &self,
        script: &Script,
        output: &Path,
        progress: &watch::Sender<RenderProgress>,
    ) -> MediaResult<RenderedVideo> {
        progress.send_modify(|p| p.start());

        let mut scratch =
            ScratchFiles::new(&self.config.work_dir).map_err(|e| fail(progress, e))?;

        // The encoder may leave a partial file behind on failure or when this
        // future is dropped mid-encode.
        let partial = scopeguard::guard(output.to_path_buf(), |path| remove_partial(&path));

        match self.render(script, output, progress, &mut scratch).await {
            Ok(video) => {
                scopeguard::ScopeGuard::into_inner(partial);
                progress.send_modify(|p| p.complete());

                let failures = scratch.cleanup();
                if failures > 0 {
                    warn!(failures, "Some scratch files could not be removed");
                }

                info!(
                    path = %video.path.display(),
                    duration_secs = video.duration_secs,
                    clips = video.clip_count,
                    "Video rendered"
                );
                Ok(video)
            }
            Err(e) => Err(fail(progress, e)),
        }
    }

    async fn render(
        &self,
        script: &Script,
        output: &Path,
        progress: &watch::Sender<RenderProgress>,
        scratch: &mut ScratchFiles,
    ) -> MediaResult<RenderedVideo> {
        if script.sections.is_empty() {
            return Err(MediaError::EmptyScript);
        }

        let total = script.sections.len();
        let caption_style = SlideStyle::caption().with_font_file(self.config.font_file.clone());
        let mut clips: Vec<PathBuf> = Vec::with_capacity(total + 1);
        let mut duration_secs = 0.0;

        if self.config.title_slide {
            info!("Creating title slide");
            let title_style = SlideStyle::title().with_font_file(self.config.font_file.clone());
            let text_file = scratch
                .write(
                    "title-",
                    ".txt",
                    wrap_text(&script.title, title_style.max_chars_per_line).as_bytes(),
                )
                .await?;
            let clip = scratch.create("clip-title-", ".mp4")?;

            self.compositor
                .render_clip(
                    &ClipSpec {
                        text_file: Some(&text_file),
                        style: &title_style,
                        duration: TITLE_SLIDE_SECS,
                        audio: None,
                    },
                    &clip,
                )
                .await?;

            clips.push(clip);
            duration_secs += TITLE_SLIDE_SECS;
        }

        for (idx, section) in script.sections.iter().enumerate() {
            progress.send_modify(|p| p.section(idx, total));
            info!(section = idx + 1, total, "Processing section");

            let clip_secs = self
                .render_section(idx, &section.text, &caption_style, scratch, &mut clips)
                .await
                .map_err(|e| {
                    error!(section = idx + 1, "Error processing section: {}", e.detail());
                    e
                })?;

            duration_secs += clip_secs;
        }

        progress.send_modify(|p| p.encoding());
        info!(clips = clips.len(), output = %output.display(), "Concatenating clips");

        let list_file = scratch
            .write("concat-", ".txt", concat_list_contents(&clips).as_bytes())
            .await?;
        self.compositor.concat(&list_file, output).await?;

        Ok(RenderedVideo {
            path: output.to_path_buf(),
            duration_secs,
            clip_count: clips.len(),
        })
    }

    /// Render one section clip; returns its duration.
    async fn render_section(
        &self,
        idx: usize,
        text: &str,
        style: &SlideStyle,
        scratch: &mut ScratchFiles,
        clips: &mut Vec<PathBuf>,
    ) -> MediaResult<f64> {
        let audio = scratch.create(&format!("speech-{}-", idx + 1), self.tts.file_extension())?;
        self.tts.synthesize(text, &audio).await?;

        // Slide length is taken from the speech, never chosen independently.
        let duration = self.compositor.audio_duration(&audio).await?;

        let text_file = match self.config.visual {
            VisualStyle::Caption => Some(
                scratch
                    .write(
                        &format!("caption-{}-", idx + 1),
                        ".txt",
                        wrap_text(text, style.max_chars_per_line).as_bytes(),
                    )
                    .await?,
            ),
            VisualStyle::Solid => None,
        };

        let clip = scratch.create(&format!("clip-{}-", idx + 1), ".mp4")?;
        self.compositor
            .render_clip(
                &ClipSpec {
                    text_file: text_file.as_deref(),
                    style,
                    duration,
                    audio: Some(&audio),
                },
                &clip,
            )
            .await?;

        clips.push(clip);
        Ok(duration)
    }
}

fn remove_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => info!("Removed partial output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial output {}: {}", path.display(), e),
    }
}

fn fail(progress: &watch::Sender<RenderProgress>, e: MediaError) -> MediaError {
    let detail = e.detail();
    error!("Video generation failed: {}", detail);
    progress.send_modify(|p| p.fail(detail));
    e
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use slidecast_models::{RenderStatus, Section};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Writes the text itself as "audio"; optionally fails on one section.
    struct FakeTts {
        fail_on: Option<String>,
        progress: watch::Receiver<RenderProgress>,
        seen: Mutex<Vec<RenderProgress>>,
    }

    #[async_trait]
    impl SpeechSynthesizer for FakeTts {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn file_extension(&self) -> &'static str {
            ".txt"
        }

        async fn synthesize(&self, text: &str, output: &Path) -> MediaResult<()> {
            self.seen.lock().unwrap().push(self.progress.borrow().clone());
            if self.fail_on.as_deref() == Some(text) {
                return Err(MediaError::speech_synthesis("engine offline"));
            }
            tokio::fs::write(output, text).await?;
            Ok(())
        }
    }

    /// How the fake encoder behaves after writing its output.
    #[derive(Default, Clone, Copy)]
    enum ConcatOutcome {
        #[default]
        Succeed,
        Fail,
        Hang,
    }

    /// Half a second per spoken word; records clips and writes a dummy output.
    #[derive(Default)]
    struct FakeCompositor {
        clips: Mutex<Vec<(f64, bool, bool)>>,
        concat_entries: Mutex<usize>,
        outcome: ConcatOutcome,
    }

    #[async_trait]
    impl Compositor for FakeCompositor {
        async fn audio_duration(&self, audio: &Path) -> MediaResult<f64> {
            let text = tokio::fs::read_to_string(audio).await?;
            Ok(text.split_whitespace().count() as f64 * 0.5)
        }

        async fn render_clip(&self, clip: &ClipSpec<'_>, output: &Path) -> MediaResult<()> {
            self.clips.lock().unwrap().push((
                clip.duration,
                clip.audio.is_some(),
                clip.text_file.is_some(),
            ));
            tokio::fs::write(output, b"clip").await?;
            Ok(())
        }

        async fn concat(&self, list_file: &Path, output: &Path) -> MediaResult<()> {
            let list = tokio::fs::read_to_string(list_file).await?;
            *self.concat_entries.lock().unwrap() = list.lines().count();
            tokio::fs::write(output, b"video").await?;
            match self.outcome {
                ConcatOutcome::Succeed => Ok(()),
                ConcatOutcome::Fail => Err(MediaError::ffmpeg_failed(
                    "FFmpeg exited with non-zero status",
                    Some("Conversion failed!".into()),
                    Some(1),
                )),
                ConcatOutcome::Hang => std::future::pending().await,
            }
        }
    }

    fn script(texts: &[&str]) -> Script {
        Script {
            title: "Tides".into(),
            sections: texts.iter().map(|t| Section::new(*t)).collect(),
            summary: "About tides.".into(),
        }
    }

    struct Harness {
        _dir: TempDir,
        work_dir: PathBuf,
        output: PathBuf,
        tts: Arc<FakeTts>,
        compositor: Arc<FakeCompositor>,
        renderer: VideoRenderer,
        progress: watch::Sender<RenderProgress>,
    }

    fn harness(title_slide: bool, visual: VisualStyle, fail_on: Option<&str>) -> Harness {
        harness_with(title_slide, visual, fail_on, ConcatOutcome::Succeed)
    }

    fn harness_with(
        title_slide: bool,
        visual: VisualStyle,
        fail_on: Option<&str>,
        outcome: ConcatOutcome,
    ) -> Harness {
        let dir = TempDir::new().unwrap();
        let work_dir = dir.path().join("work");
        let output = dir.path().join("out.mp4");
        let (progress, rx) = watch::channel(RenderProgress::default());
        let tts = Arc::new(FakeTts {
            fail_on: fail_on.map(str::to_string),
            progress: rx,
            seen: Mutex::new(Vec::new()),
        });
        let compositor = Arc::new(FakeCompositor {
            outcome,
            ..Default::default()
        });
        let config = RenderConfig {
            work_dir: work_dir.clone(),
            title_slide,
            visual,
            ..Default::default()
        };
        let renderer = VideoRenderer::new(config, tts.clone(), compositor.clone());

        Harness {
            _dir: dir,
            work_dir,
            output,
            tts,
            compositor,
            renderer,
            progress,
        }
    }

    fn work_dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).map(|mut d| d.next().is_none()).unwrap_or(true)
    }

    #[tokio::test]
    async fn test_duration_matches_speech_with_title() {
        let h = harness(true, VisualStyle::Caption, None);
        let script = script(&["One two three four.", "Five six.", "Seven."]);

        let video = h
            .renderer
            .create_video(&script, &h.output, &h.progress)
            .await
            .unwrap();

        // 4 + 2 + 1 words at 0.5s each, plus the title slide.
        assert!((video.duration_secs - (TITLE_SLIDE_SECS + 3.5)).abs() < 1e-9);
        assert_eq!(video.clip_count, 4);
        assert_eq!(video.path, h.output);
        assert!(h.output.exists());

        let clips = h.compositor.clips.lock().unwrap().clone();
        assert_eq!(clips[0], (TITLE_SLIDE_SECS, false, true));
        assert_eq!(clips[1], (2.0, true, true));
        assert_eq!(clips[2], (1.0, true, true));
        assert_eq!(clips[3], (0.5, true, true));
        assert_eq!(*h.compositor.concat_entries.lock().unwrap(), 4);
    }

    #[tokio::test]
    async fn test_duration_without_title_and_solid_visual() {
        let h = harness(false, VisualStyle::Solid, None);
        let script = script(&["Alpha beta.", "Gamma."]);

        let video = h
            .renderer
            .create_video(&script, &h.output, &h.progress)
            .await
            .unwrap();

        assert!((video.duration_secs - 1.5).abs() < 1e-9);
        assert_eq!(video.clip_count, 2);

        let clips = h.compositor.clips.lock().unwrap().clone();
        assert!(clips.iter().all(|(_, audio, text)| *audio && !*text));
    }

    #[tokio::test]
    async fn test_progress_sequence() {
        let h = harness(true, VisualStyle::Caption, None);
        let script = script(&["A.", "B.", "C.", "D."]);

        h.renderer
            .create_video(&script, &h.output, &h.progress)
            .await
            .unwrap();

        let seen = h.tts.seen.lock().unwrap().clone();
        let values: Vec<f64> = seen.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![0.0, 25.0, 50.0, 75.0]);
        assert_eq!(seen[0].status_text(), "Processing section 1/4");
        assert_eq!(seen[3].status_text(), "Processing section 4/4");

        let last = h.progress.borrow().clone();
        assert_eq!(last.status, RenderStatus::Complete);
        assert_eq!(last.value, 100.0);
    }

    #[tokio::test]
    async fn test_scratch_files_removed_on_success() {
        let h = harness(true, VisualStyle::Caption, None);
        h.renderer
            .create_video(&script(&["Hello there."]), &h.output, &h.progress)
            .await
            .unwrap();

        assert!(work_dir_is_empty(&h.work_dir));
    }

    #[tokio::test]
    async fn test_failure_sets_error_and_cleans_up() {
        let h = harness(true, VisualStyle::Caption, Some("Broken."));
        let script = script(&["Fine.", "Broken.", "Never reached."]);

        let err = h
            .renderer
            .create_video(&script, &h.output, &h.progress)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::SpeechSynthesis(_)));

        let last = h.progress.borrow().clone();
        assert_eq!(last.status, RenderStatus::Error);
        assert!(last.error.unwrap().contains("engine offline"));

        // Third section never started, nothing encoded, nothing left behind.
        assert_eq!(h.tts.seen.lock().unwrap().len(), 2);
        assert!(!h.output.exists());
        assert!(work_dir_is_empty(&h.work_dir));
    }

    #[tokio::test]
    async fn test_failed_encode_removes_partial_output() {
        let h = harness_with(true, VisualStyle::Caption, None, ConcatOutcome::Fail);

        let err = h
            .renderer
            .create_video(&script(&["Hello there."]), &h.output, &h.progress)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::FfmpegFailed { .. }));
        assert_eq!(h.progress.borrow().status, RenderStatus::Error);
        assert!(!h.output.exists());
        assert!(work_dir_is_empty(&h.work_dir));
    }

    #[tokio::test]
    async fn test_dropped_render_removes_partial_output() {
        let h = harness_with(true, VisualStyle::Caption, None, ConcatOutcome::Hang);

        let script = script(&["Hello there."]);
        let render = h
            .renderer
            .create_video(&script, &h.output, &h.progress);
        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(200), render).await;

        assert!(timed_out.is_err());
        assert!(!h.output.exists());
        assert!(work_dir_is_empty(&h.work_dir));
    }

    #[tokio::test]
    async fn test_empty_script_is_an_error() {
        let h = harness(true, VisualStyle::Caption, None);
        let err = h
            .renderer
            .create_video(&script(&[]), &h.output, &h.progress)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::EmptyScript));
        assert_eq!(h.progress.borrow().status, RenderStatus::Error);
    }

    #[test]
    fn test_visual_style_from_str() {
        assert_eq!("caption".parse::<VisualStyle>().unwrap(), VisualStyle::Caption);
        assert_eq!("Solid".parse::<VisualStyle>().unwrap(), VisualStyle::Solid);
        assert!("neon".parse::<VisualStyle>().is_err());
    }
}
