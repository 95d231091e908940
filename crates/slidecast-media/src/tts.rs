//! Text-to-speech engines.
//!
//! Engines take plain text and write one audio file. Voice selection is not
//! supported; each engine speaks in its configured language.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::command::stderr_tail;
use crate::error::{MediaError, MediaResult};

/// Default Google Translate TTS endpoint.
pub const GOOGLE_TTS_URL: &str = "https://translate.google.com/translate_tts";

/// Maximum characters per Google TTS request.
const GOOGLE_TTS_MAX_CHARS: usize = 100;

/// Placeholder replaced by the output path in command engine arguments.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// A speech synthesis engine.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &'static str;

    /// Extension (with dot) of the audio files this engine writes.
    fn file_extension(&self) -> &'static str;

    /// Synthesize `text` into an audio file at `output`.
    async fn synthesize(&self, text: &str, output: &Path) -> MediaResult<()>;
}

/// Google Translate TTS, the same HTTP endpoint gTTS uses. Produces MP3.
#[derive(Debug, Clone)]
pub struct GoogleTranslateTts {
    client: Client,
    endpoint: String,
    language: String,
}

impl GoogleTranslateTts {
    /// Create an engine speaking `language` (e.g. "en").
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: GOOGLE_TTS_URL.to_string(),
            language: language.into(),
        }
    }

    /// Override the endpoint URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn fetch_chunk(&self, chunk: &str, idx: usize, total: usize) -> MediaResult<Vec<u8>> {
        let total_param = total.to_string();
        let idx_param = idx.to_string();
        let textlen = chunk.chars().count().to_string();

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", self.language.as_str()),
                ("q", chunk),
                ("total", total_param.as_str()),
                ("idx", idx_param.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::speech_synthesis(format!(
                "TTS endpoint returned {} for chunk {}/{}: {}",
                status,
                idx + 1,
                total,
                body.chars().take(200).collect::<String>()
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    fn name(&self) -> &'static str {
        "google"
    }

    fn file_extension(&self) -> &'static str {
        ".mp3"
    }

    async fn synthesize(&self, text: &str, output: &Path) -> MediaResult<()> {
        let chunks = speech_chunks(text, GOOGLE_TTS_MAX_CHARS);
        if chunks.is_empty() {
            return Err(MediaError::speech_synthesis("No text to speak"));
        }

        // MP3 frames are self-delimiting, so chunk responses concatenate cleanly.
        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            debug!("Fetching TTS chunk {}/{}", idx + 1, chunks.len());
            audio.extend(self.fetch_chunk(chunk, idx, chunks.len()).await?);
        }

        if audio.is_empty() {
            return Err(MediaError::speech_synthesis("TTS endpoint returned no audio"));
        }

        tokio::fs::write(output, &audio).await?;
        Ok(())
    }
}

/// A local TTS program fed the text on stdin.
///
/// Arguments may contain [`OUTPUT_PLACEHOLDER`], replaced by the target path.
#[derive(Debug, Clone)]
pub struct CommandTts {
    program: String,
    args: Vec<String>,
    extension: &'static str,
}

impl CommandTts {
    /// Create an engine running `program` with `args`.
    pub fn new<I, S>(program: impl Into<String>, args: I, extension: &'static str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            extension,
        }
    }

    /// `espeak-ng` writing WAV output.
    pub fn espeak(language: &str) -> Self {
        Self::new(
            "espeak-ng",
            ["-v", language, "-w", OUTPUT_PLACEHOLDER, "--stdin"],
            ".wav",
        )
    }

    fn build_args(&self, output: &Path) -> Vec<String> {
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|a| a.replace(OUTPUT_PLACEHOLDER, &output))
            .collect()
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandTts {
    fn name(&self) -> &'static str {
        "command"
    }

    fn file_extension(&self) -> &'static str {
        self.extension
    }

    async fn synthesize(&self, text: &str, output: &Path) -> MediaResult<()> {
        if text.trim().is_empty() {
            return Err(MediaError::speech_synthesis("No text to speak"));
        }

        which::which(&self.program).map_err(|_| MediaError::ProgramNotFound {
            program: self.program.clone(),
        })?;

        let mut child = Command::new(&self.program)
            .args(self.build_args(output))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let result = child.wait_with_output().await?;
        if !result.status.success() {
            return Err(MediaError::speech_synthesis(format!(
                "{} exited with {}: {}",
                self.program,
                result.status,
                stderr_tail(&result.stderr)
            )));
        }

        let written = tokio::fs::metadata(output).await.map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(MediaError::speech_synthesis(format!(
                "{} produced no audio",
                self.program
            )));
        }

        Ok(())
    }
}

/// Split text into chunks of at most `max_chars` characters on word
/// boundaries. Words longer than `max_chars` are split mid-word.
pub fn speech_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let current_len = current.chars().count();
        if current.is_empty() {
            current.push_str(word);
        } else if current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
