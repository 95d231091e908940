//! Script generation.

use std::sync::Arc;

use async_trait::async_trait;
use slidecast_models::{Script, ScriptDecodeError};
use thiserror::Error;

use crate::config::{ContentConfig, ContentMode};
use crate::services::chat::ChatContentGenerator;
use crate::services::heuristic::HeuristicContentGenerator;

/// Content generation errors. The display text is what callers see.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Content API credential not configured: set {0}")]
    Configuration(String),

    #[error("Content API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Content API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to parse content response: {0}")]
    ResponseParse(String),

    #[error("Generated script is invalid: {0}")]
    SchemaViolation(String),

    #[error("Failed to generate content: {0}")]
    Generation(String),
}

impl From<ScriptDecodeError> for ContentError {
    fn from(e: ScriptDecodeError) -> Self {
        match e {
            ScriptDecodeError::Malformed(msg) => ContentError::ResponseParse(msg),
            ScriptDecodeError::SchemaViolation(msg) => ContentError::SchemaViolation(msg),
        }
    }
}

/// Produces a [`Script`] from a topic or raw text.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generator name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Build a script for `input`.
    async fn generate_content(&self, input: &str) -> Result<Script, ContentError>;
}

/// Build the generator selected by `config.mode`.
pub fn content_generator(config: &ContentConfig) -> Arc<dyn ContentGenerator> {
    match config.mode {
        ContentMode::Ai => Arc::new(ChatContentGenerator::new(config)),
        ContentMode::Heuristic => Arc::new(HeuristicContentGenerator),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_errors_keep_their_kind() {
        let malformed: ContentError = ScriptDecodeError::Malformed("eof".into()).into();
        assert!(matches!(malformed, ContentError::ResponseParse(_)));

        let shape: ContentError = ScriptDecodeError::SchemaViolation("no sections".into()).into();
        assert!(matches!(shape, ContentError::SchemaViolation(_)));
    }

    #[test]
    fn test_mode_selects_generator() {
        let mut config = ContentConfig::default();
        assert_eq!(content_generator(&config).name(), "chat");

        config.mode = ContentMode::Heuristic;
        assert_eq!(content_generator(&config).name(), "heuristic");
    }
}
