//! Narration script produced by content generation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One narration unit, rendered as one audio-backed clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    /// Optional section heading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Text spoken over this section
    pub text: String,
}

impl Section {
    /// Create an untitled section.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            title: None,
            text: text.into(),
        }
    }
}

/// A complete video script: title, ordered sections and summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Script {
    /// Video title, shown on the title slide
    pub title: String,
    /// Ordered narration sections
    pub sections: Vec<Section>,
    /// Short summary of the whole video
    pub summary: String,
}

/// Errors decoding a script from untrusted model output.
#[derive(Debug, Error)]
pub enum ScriptDecodeError {
    /// The text is not JSON at all.
    #[error("Model returned malformed JSON: {0}")]
    Malformed(String),

    /// JSON, but not a usable script.
    #[error("Model output does not match the script schema: {0}")]
    SchemaViolation(String),
}

impl Script {
    /// Number of sections in the script.
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Validate the script shape.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Script title must not be empty".to_string());
        }

        if self.sections.is_empty() {
            return Err("Script must contain at least one section".to_string());
        }

        if let Some(idx) = self.sections.iter().position(|s| s.text.trim().is_empty()) {
            return Err(format!("Section {} has no text", idx + 1));
        }

        Ok(())
    }

    /// Decode and validate a script from model-generated text.
    ///
    /// A surrounding Markdown code fence is tolerated. Text that is not JSON is
    /// reported as [`ScriptDecodeError::Malformed`]; JSON with the wrong shape
    /// as [`ScriptDecodeError::SchemaViolation`].
    pub fn from_model_output(text: &str) -> Result<Self, ScriptDecodeError> {
        let text = strip_code_fence(text);

        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| ScriptDecodeError::Malformed(e.to_string()))?;

        let script: Script = serde_json::from_value(value)
            .map_err(|e| ScriptDecodeError::SchemaViolation(e.to_string()))?;

        script
            .validate()
            .map_err(ScriptDecodeError::SchemaViolation)?;

        Ok(script)
    }
}

/// JSON schema of [`Script`], pretty-printed for inclusion in prompts.
pub fn script_json_schema() -> String {
    let schema = schemars::schema_for!(Script);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}
