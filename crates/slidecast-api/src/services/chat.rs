//! Chat-completion client for script generation.
//!
//! Speaks the OpenAI-compatible chat-completions protocol (OpenRouter by
//! default). The model's reply is untrusted JSON and goes through
//! [`Script::from_model_output`] before use.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use slidecast_models::{script_json_schema, Script};
use tracing::{error, info};

use crate::config::ContentConfig;
use crate::services::content::{ContentError, ContentGenerator};

/// Chat-completion backed script generator.
#[derive(Debug, Clone)]
pub struct ChatContentGenerator {
    client: Client,
    endpoint: String,
    model: String,
    app_url: String,
    app_title: String,
    api_key_env: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatContentGenerator {
    /// Create a generator from config. The credential is read on each call.
    pub fn new(config: &ContentConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.api_url.clone(),
            model: config.model.clone(),
            app_url: config.app_url.clone(),
            app_title: config.app_title.clone(),
            api_key_env: config.api_key_env.clone(),
            api_key: None,
        }
    }

    /// Use a fixed credential instead of the environment.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn credential(&self) -> Result<String, ContentError> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ContentError::Configuration(self.api_key_env.clone()))
    }

    async fn request_completion(&self, api_key: &str, input: &str) -> Result<String, ContentError> {
        let system_prompt = system_prompt();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: input,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.app_url)
            .header("X-Title", &self.app_title)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ContentError::Api {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        let completion: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ContentError::ResponseParse(format!("invalid completion body: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ContentError::Generation("Content API returned no message content".into()))
    }
}

#[async_trait::async_trait]
impl ContentGenerator for ChatContentGenerator {
    fn name(&self) -> &'static str {
        "chat"
    }

    async fn generate_content(&self, input: &str) -> Result<Script, ContentError> {
        let api_key = self.credential()?;

        info!(model = %self.model, "Requesting script from content API");

        let content = self.request_completion(&api_key, input).await.map_err(|e| {
            error!("Content API call failed: {}", e);
            e
        })?;

        let script = Script::from_model_output(&content).map_err(|e| {
            error!("Rejected model output: {}", e);
            ContentError::from(e)
        })?;

        info!(sections = script.section_count(), title = %script.title, "Script generated");
        Ok(script)
    }
}

/// System prompt sent with every request.
pub fn system_prompt() -> String {
    format!(
        r#"You write scripts for short narrated slideshow videos.

Given a topic or a piece of text from the user, produce an engaging, factual script:
- "title": a short video title
- "sections": 3 to 6 sections in speaking order; each "text" is 2-3 sentences of narration written to be read aloud, and may have a short "title"
- "summary": one or two sentences summarising the video

Respond with ONLY a JSON object matching this JSON schema, no commentary:
{}"#,
        script_json_schema()
    )
}

/// Human-readable failure detail from an error response body.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let message = value
            .pointer("/error/message")
            .or_else(|| value.get("error").filter(|e| e.is_string()))
            .or_else(|| value.get("message"))
            .and_then(|m| m.as_str());

        if let Some(message) = message.filter(|m| !m.trim().is_empty()) {
            return message.to_string();
        }
    }

    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }

    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generator(server: &MockServer) -> ChatContentGenerator {
        let config = ContentConfig {
            api_url: format!("{}/api/v1/chat/completions", server.uri()),
            api_key_env: "SLIDECAST_TEST_UNSET_KEY".to_string(),
            ..Default::default()
        };
        ChatContentGenerator::new(&config)
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
    }

    #[test]
    fn test_error_message_extraction() {
        let status = StatusCode::TOO_MANY_REQUESTS;
        assert_eq!(
            error_message(status, r#"{"error":{"message":"Rate limit exceeded","code":429}}"#),
            "Rate limit exceeded"
        );
        assert_eq!(error_message(status, r#"{"error":"quota"}"#), "quota");
        assert_eq!(error_message(status, r#"{"message":"slow down"}"#), "slow down");
        assert_eq!(error_message(status, "upstream exploded"), "upstream exploded");
        assert_eq!(error_message(status, ""), "Too Many Requests");
    }

    #[test]
    fn test_system_prompt_embeds_schema() {
        let prompt = system_prompt();
        assert!(prompt.contains("\"sections\""));
        assert!(prompt.contains("\"summary\""));
    }

    #[tokio::test]
    async fn test_generate_content_success() {
        let server = MockServer::start().await;
        let script = json!({
            "title": "Honeybees",
            "sections": [
                { "title": "Hive", "text": "Bees live in colonies." },
                { "text": "They make honey." }
            ],
            "summary": "All about bees."
        });

        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(header("x-title", "Slidecast"))
            .and(body_partial_json(json!({
                "model": "openai/gpt-4o-mini",
                "response_format": { "type": "json_object" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(&script.to_string())))
            .expect(1)
            .mount(&server)
            .await;

        let result = generator(&server)
            .with_api_key("test-key")
            .generate_content("honeybees")
            .await
            .unwrap();

        assert_eq!(result.title, "Honeybees");
        assert_eq!(result.section_count(), 2);
        assert_eq!(result.sections[0].title.as_deref(), Some("Hive"));
    }

    #[tokio::test]
    async fn test_fenced_output_is_accepted() {
        let server = MockServer::start().await;
        let fenced = "```json\n{\"title\":\"T\",\"sections\":[{\"text\":\"S.\"}],\"summary\":\"\"}\n```";

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(fenced)))
            .mount(&server)
            .await;

        let result = generator(&server)
            .with_api_key("k")
            .generate_content("t")
            .await
            .unwrap();
        assert_eq!(result.sections[0].text, "S.");
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = generator(&server).generate_content("topic").await.unwrap_err();
        assert!(matches!(err, ContentError::Configuration(_)));
        assert!(err.to_string().contains("SLIDECAST_TEST_UNSET_KEY"));
    }

    #[tokio::test]
    async fn test_rate_limited_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(json!({ "error": { "message": "Rate limit exceeded" } })),
            )
            .mount(&server)
            .await;

        let err = generator(&server)
            .with_api_key("k")
            .generate_content("topic")
            .await
            .unwrap_err();

        assert!(matches!(err, ContentError::Api { status: 429, .. }));
        assert_eq!(err.to_string(), "Content API returned 429: Rate limit exceeded");
    }

    #[tokio::test]
    async fn test_malformed_model_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Sure! Here is")))
            .mount(&server)
            .await;

        let err = generator(&server)
            .with_api_key("k")
            .generate_content("topic")
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::ResponseParse(_)));
    }

    #[tokio::test]
    async fn test_schema_violation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion(r#"{"title":"T","sections":[],"summary":""}"#)),
            )
            .mount(&server)
            .await;

        let err = generator(&server)
            .with_api_key("k")
            .generate_content("topic")
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::SchemaViolation(_)));
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = generator(&server)
            .with_api_key("k")
            .generate_content("topic")
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Generation(_)));
    }
}
