//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during speech synthesis and rendering.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("{program} not found in PATH")]
    ProgramNotFound { program: String },

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Speech synthesis failed: {0}")]
    SpeechSynthesis(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid audio file: {0}")]
    InvalidAudio(String),

    #[error("Script has no sections to render")]
    EmptyScript,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a speech synthesis failure error.
    pub fn speech_synthesis(message: impl Into<String>) -> Self {
        Self::SpeechSynthesis(message.into())
    }

    /// Human-readable detail, including captured FFmpeg stderr when present.
    pub fn detail(&self) -> String {
        match self {
            MediaError::FfmpegFailed {
                stderr: Some(stderr),
                ..
            }
            | MediaError::FfprobeFailed {
                stderr: Some(stderr),
                ..
            } if !stderr.trim().is_empty() => format!("{}: {}", self, stderr.trim()),
            _ => self.to_string(),
        }
    }
}
