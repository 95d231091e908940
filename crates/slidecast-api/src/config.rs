//! API configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use slidecast_media::VisualStyle;

/// Default chat-completions endpoint.
pub const DEFAULT_CONTENT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
/// Default content model.
pub const DEFAULT_CONTENT_MODEL: &str = "openai/gpt-4o-mini";
/// Environment variable holding the content API credential.
pub const CONTENT_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// How scripts are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentMode {
    /// Remote chat-completion model
    #[default]
    Ai,
    /// Local sentence grouping, no network
    Heuristic,
}

impl FromStr for ContentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ai" | "llm" => Ok(ContentMode::Ai),
            "heuristic" | "offline" => Ok(ContentMode::Heuristic),
            other => Err(format!("Unknown content mode: {}", other)),
        }
    }
}

/// Speech engine selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtsEngine {
    /// Google Translate TTS over HTTP
    #[default]
    Google,
    /// Local espeak-ng
    Espeak,
}

impl FromStr for TtsEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google" | "gtts" => Ok(TtsEngine::Google),
            "espeak" | "espeak-ng" => Ok(TtsEngine::Espeak),
            other => Err(format!("Unknown TTS engine: {}", other)),
        }
    }
}

/// Content generation settings.
#[derive(Debug, Clone)]
pub struct ContentConfig {
    /// Generation mode
    pub mode: ContentMode,
    /// Chat-completions endpoint
    pub api_url: String,
    /// Model name
    pub model: String,
    /// Sent as `HTTP-Referer`
    pub app_url: String,
    /// Sent as `X-Title`
    pub app_title: String,
    /// Environment variable read for the credential on every call
    pub api_key_env: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            mode: ContentMode::Ai,
            api_url: DEFAULT_CONTENT_API_URL.to_string(),
            model: DEFAULT_CONTENT_MODEL.to_string(),
            app_url: "http://localhost:5000".to_string(),
            app_title: "Slidecast".to_string(),
            api_key_env: CONTENT_API_KEY_ENV.to_string(),
        }
    }
}

/// Rendering settings.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Speech engine
    pub tts_engine: TtsEngine,
    /// Speech language code
    pub tts_language: String,
    /// Prepend a title slide
    pub title_slide: bool,
    /// Section visual
    pub visual: VisualStyle,
    /// Font file for slide text
    pub font_file: Option<PathBuf>,
    /// Per-invocation FFmpeg timeout
    pub ffmpeg_timeout_secs: Option<u64>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            tts_engine: TtsEngine::Google,
            tts_language: "en".to_string(),
            title_slide: true,
            visual: VisualStyle::Caption,
            font_file: None,
            ffmpeg_timeout_secs: None,
        }
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Log output format (`json` or `text`), unset picks by environment
    pub log_format: Option<String>,
    /// Scratch files and rendered videos
    pub work_dir: PathBuf,
    /// How long finished jobs are kept
    pub job_retention: Duration,
    /// Expose /metrics
    pub metrics_enabled: bool,
    /// Content generation
    pub content: ContentConfig,
    /// Rendering
    pub render: RenderSettings,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_origins: vec!["*".to_string()],
            max_body_size: 16 * 1024 * 1024, // 16MB
            environment: "development".to_string(),
            log_format: None,
            work_dir: std::env::temp_dir().join("slidecast"),
            job_retention: Duration::from_secs(3600),
            metrics_enabled: true,
            content: ContentConfig::default(),
            render: RenderSettings::default(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("API_PORT").unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_size: env_parse("MAX_BODY_SIZE").unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            log_format: std::env::var("LOG_FORMAT").ok(),
            work_dir: std::env::var("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            job_retention: env_parse("JOB_RETENTION_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.job_retention),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.metrics_enabled),
            content: ContentConfig {
                mode: env_parse("CONTENT_MODE").unwrap_or(defaults.content.mode),
                api_url: std::env::var("CONTENT_API_URL").unwrap_or(defaults.content.api_url),
                model: std::env::var("CONTENT_MODEL").unwrap_or(defaults.content.model),
                app_url: std::env::var("CONTENT_APP_URL").unwrap_or(defaults.content.app_url),
                app_title: std::env::var("CONTENT_APP_TITLE")
                    .unwrap_or(defaults.content.app_title),
                api_key_env: defaults.content.api_key_env,
            },
            render: RenderSettings {
                tts_engine: env_parse("TTS_ENGINE").unwrap_or(defaults.render.tts_engine),
                tts_language: std::env::var("TTS_LANGUAGE")
                    .unwrap_or(defaults.render.tts_language),
                title_slide: std::env::var("VIDEO_TITLE_SLIDE")
                    .map(|v| !(v == "false" || v == "0"))
                    .unwrap_or(defaults.render.title_slide),
                visual: env_parse("VIDEO_VISUAL").unwrap_or(defaults.render.visual),
                font_file: std::env::var("VIDEO_FONT_FILE").ok().map(PathBuf::from),
                ffmpeg_timeout_secs: env_parse("RENDER_FFMPEG_TIMEOUT_SECS"),
            },
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }

    /// Whether logs are emitted as JSON. Production defaults to JSON.
    pub fn json_logs(&self) -> bool {
        match &self.log_format {
            Some(format) => format.eq_ignore_ascii_case("json"),
            None => self.is_production(),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.max_body_size, 16 * 1024 * 1024);
        assert_eq!(config.content.mode, ContentMode::Ai);
        assert_eq!(config.content.api_key_env, "OPENROUTER_API_KEY");
        assert!(config.render.title_slide);
        assert!(!config.is_production());
        assert!(!config.json_logs());
    }

    #[test]
    fn test_json_logs_follow_environment() {
        let production = ApiConfig {
            environment: "Production".to_string(),
            ..Default::default()
        };
        assert!(production.json_logs());

        let text_in_production = ApiConfig {
            log_format: Some("text".to_string()),
            ..production.clone()
        };
        assert!(!text_in_production.json_logs());

        let json_in_dev = ApiConfig {
            log_format: Some("JSON".to_string()),
            ..Default::default()
        };
        assert!(json_in_dev.json_logs());
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("heuristic".parse::<ContentMode>().unwrap(), ContentMode::Heuristic);
        assert_eq!(" AI ".parse::<ContentMode>().unwrap(), ContentMode::Ai);
        assert!("magic".parse::<ContentMode>().is_err());
        assert_eq!("espeak-ng".parse::<TtsEngine>().unwrap(), TtsEngine::Espeak);
    }
}
