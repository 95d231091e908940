#![deny(unreachable_patterns)]
//! Speech synthesis and FFmpeg slideshow rendering.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and execution
//! - Text-to-speech engines (Google Translate TTS, local command)
//! - Slide composition with exact per-section durations
//! - Scoped scratch file handling

pub mod command;
pub mod compositor;
pub mod error;
pub mod probe;
pub mod renderer;
pub mod scratch;
pub mod slide;
pub mod tts;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use compositor::{ClipSpec, Compositor, FfmpegCompositor};
pub use error::{MediaError, MediaResult};
pub use probe::{audio_duration, probe_media, MediaInfo};
pub use renderer::{RenderConfig, RenderedVideo, VideoRenderer, VisualStyle, TITLE_SLIDE_SECS};
pub use scratch::ScratchFiles;
pub use slide::{SlideStyle, FRAME_HEIGHT, FRAME_RATE, FRAME_WIDTH};
pub use tts::{CommandTts, GoogleTranslateTts, SpeechSynthesizer};
