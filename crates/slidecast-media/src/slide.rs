//! FFmpeg filter definitions for text slides.

use std::path::{Path, PathBuf};

/// Output frame width.
pub const FRAME_WIDTH: u32 = 1920;
/// Output frame height.
pub const FRAME_HEIGHT: u32 = 1080;
/// Output frame rate.
pub const FRAME_RATE: u32 = 24;

/// Look of one text slide.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideStyle {
    /// Background color (FFmpeg color name or hex)
    pub background: String,
    /// Text color
    pub font_color: String,
    /// Font size in pixels
    pub font_size: u32,
    /// Wrap column for caption text
    pub max_chars_per_line: usize,
    /// Explicit font file; fontconfig default when `None`
    pub font_file: Option<PathBuf>,
}

impl SlideStyle {
    /// Large centered title text.
    pub fn title() -> Self {
        Self {
            background: "black".to_string(),
            font_color: "white".to_string(),
            font_size: 70,
            max_chars_per_line: 40,
            font_file: None,
        }
    }

    /// Caption text for narrated sections.
    pub fn caption() -> Self {
        Self {
            background: "black".to_string(),
            font_color: "white".to_string(),
            font_size: 40,
            max_chars_per_line: 70,
            font_file: None,
        }
    }

    /// Use a specific font file.
    pub fn with_font_file(mut self, font_file: Option<PathBuf>) -> Self {
        self.font_file = font_file;
        self
    }
}

/// Solid background source at the output size and frame rate.
pub fn color_source(background: &str) -> String {
    format!(
        "color=c={}:s={}x{}:r={}",
        background, FRAME_WIDTH, FRAME_HEIGHT, FRAME_RATE
    )
}

/// Silent stereo audio source.
pub fn silence_source(sample_rate: u32) -> String {
    format!("anullsrc=channel_layout=stereo:sample_rate={}", sample_rate)
}

/// Centered `drawtext` filter reading its text from `text_file`.
pub fn drawtext_filter(text_file: &Path, style: &SlideStyle) -> String {
    let mut filter = format!(
        "drawtext=textfile={}:expansion=none:fontcolor={}:fontsize={}:line_spacing={}:x=(w-text_w)/2:y=(h-text_h)/2",
        quote_filter_value(&text_file.to_string_lossy()),
        style.font_color,
        style.font_size,
        style.font_size / 3,
    );

    if let Some(font_file) = &style.font_file {
        filter.push_str(":fontfile=");
        filter.push_str(&quote_filter_value(&font_file.to_string_lossy()));
    }

    filter
}

/// Greedy word wrap at `max_chars` columns. Words longer than a line are
/// kept whole on their own line.
pub fn wrap_text(text: &str, max_chars: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines.join("\n")
}

fn quote_filter_value(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
