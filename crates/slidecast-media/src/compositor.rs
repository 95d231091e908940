//! Clip composition and encoding.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::probe;
use crate::slide::{color_source, drawtext_filter, silence_source, SlideStyle, FRAME_RATE};

/// Audio sample rate shared by every clip so the concat demuxer sees
/// identical stream layouts.
pub const AUDIO_SAMPLE_RATE: u32 = 44_100;

/// Video codec of clips and the final file.
pub const VIDEO_CODEC: &str = "libx264";
/// Audio codec of clips and the final file.
pub const AUDIO_CODEC: &str = "aac";

/// One visual clip to render.
#[derive(Debug, Clone)]
pub struct ClipSpec<'a> {
    /// Text to draw, already wrapped; plain background when `None`
    pub text_file: Option<&'a Path>,
    /// Slide look
    pub style: &'a SlideStyle,
    /// Exact clip length in seconds
    pub duration: f64,
    /// Audio track; silence when `None`
    pub audio: Option<&'a Path>,
}

/// Backend that measures audio and builds video clips.
#[async_trait]
pub trait Compositor: Send + Sync {
    /// Duration of an audio file in seconds.
    async fn audio_duration(&self, audio: &Path) -> MediaResult<f64>;

    /// Render one clip to `output`.
    async fn render_clip(&self, clip: &ClipSpec<'_>, output: &Path) -> MediaResult<()>;

    /// Concatenate the clips named in a concat list file and encode to `output`.
    async fn concat(&self, list_file: &Path, output: &Path) -> MediaResult<()>;
}

/// FFmpeg-backed compositor.
#[derive(Debug, Clone, Default)]
pub struct FfmpegCompositor {
    runner: FfmpegRunner,
}

impl FfmpegCompositor {
    /// Create a compositor with the given runner.
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }

    fn clip_command(clip: &ClipSpec<'_>, output: &Path) -> FfmpegCommand {
        let cmd = FfmpegCommand::new(output).lavfi(color_source(&clip.style.background));

        let cmd = match clip.audio {
            Some(audio) => cmd.input(audio),
            None => cmd.lavfi(silence_source(AUDIO_SAMPLE_RATE)),
        };

        let cmd = match clip.text_file {
            Some(text_file) => cmd.video_filter(drawtext_filter(text_file, clip.style)),
            None => cmd,
        };

        encode_args(cmd.map("0:v:0").map("1:a:0").duration(clip.duration)).preset("veryfast")
    }

    fn concat_command(list_file: &Path, output: &Path) -> FfmpegCommand {
        encode_args(FfmpegCommand::new(output).concat_list(list_file)).faststart()
    }
}

fn encode_args(cmd: FfmpegCommand) -> FfmpegCommand {
    cmd.frame_rate(FRAME_RATE)
        .video_codec(VIDEO_CODEC)
        .pixel_format("yuv420p")
        .audio_codec(AUDIO_CODEC)
        .audio_layout(AUDIO_SAMPLE_RATE, 2)
}

#[async_trait]
impl Compositor for FfmpegCompositor {
    async fn audio_duration(&self, audio: &Path) -> MediaResult<f64> {
        probe::audio_duration(audio).await
    }

    async fn render_clip(&self, clip: &ClipSpec<'_>, output: &Path) -> MediaResult<()> {
        self.runner.run(&Self::clip_command(clip, output)).await
    }

    async fn concat(&self, list_file: &Path, output: &Path) -> MediaResult<()> {
        self.runner.run(&Self::concat_command(list_file, output)).await
    }
}

/// Contents of a concat demuxer list naming `clips` in order.
pub fn concat_list_contents(clips: &[PathBuf]) -> String {
    clips
        .iter()
        .map(|clip| {
            format!(
                "file '{}'\n",
                clip.to_string_lossy().replace('\'', r"'\''")
            )
        })
        .collect()
}
