//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Maximum number of stderr bytes kept for error messages.
const STDERR_TAIL_BYTES: usize = 2048;

/// FFmpeg `-v` level; only errors end up in the captured stderr.
const LOG_LEVEL: &str = "error";

/// One `-i` input together with the arguments that precede it.
#[derive(Debug, Clone)]
struct Input {
    args: Vec<String>,
    source: String,
}

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Inputs in `-i` order
    inputs: Vec<Input>,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after all inputs)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
        }
    }

    /// Add a file input.
    pub fn input(self, path: impl AsRef<Path>) -> Self {
        let source = path.as_ref().to_string_lossy().to_string();
        self.input_with_args(Vec::<String>::new(), source)
    }

    /// Add an input preceded by its own arguments (e.g. `-f lavfi`).
    pub fn input_with_args<I, S>(mut self, args: I, source: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.push(Input {
            args: args.into_iter().map(Into::into).collect(),
            source: source.into(),
        });
        self
    }

    /// Add a lavfi virtual source such as `color=c=black:s=1920x1080`.
    pub fn lavfi(self, expr: impl Into<String>) -> Self {
        self.input_with_args(["-f", "lavfi"], expr)
    }

    /// Add a concat demuxer list file as input.
    pub fn concat_list(self, list: impl AsRef<Path>) -> Self {
        let source = list.as_ref().to_string_lossy().to_string();
        self.input_with_args(["-f", "concat", "-safe", "0"], source)
    }

    /// Add output arguments.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Select a stream for the output (`-map`).
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(spec)
    }

    /// Limit output duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set output frame rate.
    pub fn frame_rate(self, fps: u32) -> Self {
        self.output_arg("-r").output_arg(fps.to_string())
    }

    /// Set pixel format.
    pub fn pixel_format(self, format: impl Into<String>) -> Self {
        self.output_arg("-pix_fmt").output_arg(format)
    }

    /// Set audio sample rate and channel count.
    pub fn audio_layout(self, sample_rate: u32, channels: u8) -> Self {
        self.output_arg("-ar")
            .output_arg(sample_rate.to_string())
            .output_arg("-ac")
            .output_arg(channels.to_string())
    }

    /// Set preset.
    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Move the moov atom to the front for progressive download.
    pub fn faststart(self) -> Self {
        self.output_arg("-movflags").output_arg("+faststart")
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-hide_banner".to_string());
        args.push("-nostdin".to_string());
        args.push("-v".to_string());
        args.push(LOG_LEVEL.to_string());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.source.clone());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with an optional timeout.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    /// Create a new runner without a timeout.
    pub fn new() -> Self {
        Self { timeout_secs: None }
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run an FFmpeg command to completion.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match self.timeout_secs {
            Some(secs) => {
                match tokio::time::timeout(Duration::from_secs(secs), child.wait_with_output())
                    .await
                {
                    Ok(result) => result?,
                    Err(_) => {
                        // Dropping the future drops the child, which kills it.
                        warn!("FFmpeg timed out after {} seconds, killing process", secs);
                        return Err(MediaError::Timeout(secs));
                    }
                }
            }
            None => child.wait_with_output().await?,
        };

        if output.status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(stderr_tail(&output.stderr)),
                output.status.code(),
            ))
        }
    }
}

/// Keep the end of a stderr buffer, where FFmpeg prints the actual failure.
pub(crate) fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= STDERR_TAIL_BYTES {
        return text.to_string();
    }

    let mut start = text.len() - STDERR_TAIL_BYTES;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}
