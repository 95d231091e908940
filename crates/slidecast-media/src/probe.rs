//! FFprobe media information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::{check_ffprobe, stderr_tail};
use crate::error::{MediaError, MediaResult};

/// Media file information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Whether the file carries an audio stream
    pub has_audio: bool,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    duration: Option<String>,
}

/// Probe a media file for information.
pub async fn probe_media(path: impl AsRef<Path>) -> MediaResult<MediaInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("FFprobe failed on {}", path.display()),
            stderr: Some(stderr_tail(&output.stderr)),
        });
    }

    parse_probe_output(&output.stdout)
}

/// Get the duration of an audio file in seconds.
pub async fn audio_duration(path: impl AsRef<Path>) -> MediaResult<f64> {
    let path = path.as_ref();
    let info = probe_media(path).await?;

    if !info.has_audio {
        return Err(MediaError::InvalidAudio(format!(
            "{} has no audio stream",
            path.display()
        )));
    }
    if info.duration <= 0.0 {
        return Err(MediaError::InvalidAudio(format!(
            "{} has zero duration",
            path.display()
        )));
    }

    Ok(info.duration)
}

fn parse_probe_output(stdout: &[u8]) -> MediaResult<MediaInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let audio_stream = probe.streams.iter().find(|s| s.codec_type == "audio");

    // Container duration first, stream duration as fallback (raw MP3 streams
    // sometimes only report one of them).
    let duration = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| {
            audio_stream
                .and_then(|s| s.duration.as_deref())
                .and_then(|d| d.parse::<f64>().ok())
        })
        .unwrap_or(0.0);

    Ok(MediaInfo {
        duration,
        has_audio: audio_stream.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_audio_only_output() {
        let json = br#"{
            "streams": [{"codec_type": "audio", "duration": "3.456"}],
            "format": {"size": "5529"}
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert!(info.has_audio);
        assert!((info.duration - 3.456).abs() < 1e-9);
    }

    #[test]
    fn test_container_duration_wins() {
        let json = br#"{
            "streams": [
                {"codec_type": "video", "avg_frame_rate": "24/1"},
                {"codec_type": "audio"}
            ],
            "format": {"duration": "12.5", "size": "1000"}
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert!(info.has_audio);
        assert!((info.duration - 12.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let err = probe_media("/nonexistent/clip.mp3").await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
