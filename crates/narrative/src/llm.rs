use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::schema::{ChatMessage, NarrativePrompt};

#[derive(Clone)]
pub struct CompletionConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub request_timeout_secs: u64,
}

impl CompletionConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: api_key.into(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            request_timeout_secs: 30,
        }
    }
}

impl fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// A single chat completion. Returns the raw message content.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &NarrativePrompt) -> Result<String>;
}

#[derive(Clone)]
pub struct CompletionClient {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl ChatResponse {
    fn into_content(self) -> Result<String> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .context("Completion response contained no choices")?;

        choice
            .message
            .content
            .context("Completion response message had no content")
    }
}

impl CompletionClient {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build completion HTTP client")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionService for CompletionClient {
    async fn complete(&self, prompt: &NarrativePrompt) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: prompt.messages(),
            temperature: self.temperature,
        };

        let response = self.client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to completion service")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("Completion request failed: {} {}", status, detail.trim());
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse completion response")?;

        chat_response.into_content()
    }
}

/// Turns a prompt into story text through a [`CompletionService`].
#[derive(Clone)]
pub struct NarrativeGenerator {
    service: Arc<dyn CompletionService>,
}

impl NarrativeGenerator {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self { service }
    }

    pub async fn generate(&self, prompt: &NarrativePrompt) -> Result<String> {
        let content = self.service
            .complete(prompt)
            .await
            .context("Story generation failed")?;

        let story = content.trim().to_string();

        info!(story_chars = story.chars().count(), "Generated story");
        Ok(story)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo(&'static str);

    #[async_trait]
    impl CompletionService for Echo {
        async fn complete(&self, _prompt: &NarrativePrompt) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Unauthorized;

    #[async_trait]
    impl CompletionService for Unauthorized {
        async fn complete(&self, _prompt: &NarrativePrompt) -> Result<String> {
            anyhow::bail!("Completion request failed: 401 Unauthorized")
        }
    }

    fn prompt() -> NarrativePrompt {
        NarrativePrompt::new("system", "user")
    }

    #[test]
    fn test_debug_hides_api_key() {
        let config = CompletionConfig::new("sk-very-secret");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("sk-very-secret"));
        assert!(printed.contains("gpt-3.5-turbo"));
    }

    #[test]
    fn test_chat_response_content_extracted() {
        let response: ChatResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "  Era uma vez...\n"}}
            ]
        }))
        .unwrap();

        assert_eq!(response.into_content().unwrap(), "  Era uma vez...\n");
    }

    #[test]
    fn test_chat_response_without_choices_rejected() {
        let response: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(response.into_content().is_err());
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "gpt-3.5-turbo".to_string(),
            messages: prompt().messages(),
            temperature: 0.7,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][1]["content"], "user");
    }

    #[tokio::test]
    async fn test_generated_story_trimmed() {
        let generator = NarrativeGenerator::new(Arc::new(Echo("\n  A long time ago...  \n")));
        let story = generator.generate(&prompt()).await.unwrap();
        assert_eq!(story, "A long time ago...");
    }

    #[tokio::test]
    async fn test_blank_story_trimmed_to_empty() {
        let generator = NarrativeGenerator::new(Arc::new(Echo("   \n ")));
        let story = generator.generate(&prompt()).await.unwrap();
        assert_eq!(story, "");
    }

    /// Chat-completions endpoint that accepts one key and echoes the model back.
    async fn spawn_completion_service() -> String {
        use axum::{Json, Router, http::HeaderMap, http::StatusCode, routing::post};
        use serde_json::Value;

        async fn chat(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
            let authorized = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                == Some("Bearer sk-good");
            if !authorized {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"error": {"message": "Incorrect API key provided"}})),
                );
            }

            let content = format!(
                "  {} at {} with {} messages  ",
                body["model"].as_str().unwrap_or_default(),
                body["temperature"],
                body["messages"].as_array().map(Vec::len).unwrap_or_default()
            );
            (
                StatusCode::OK,
                Json(json!({"choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]})),
            )
        }

        let app = Router::new().route("/v1/chat/completions", post(chat));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}/v1", addr)
    }

    async fn client_with_key(api_key: &str) -> CompletionClient {
        let config = CompletionConfig {
            base_url: spawn_completion_service().await,
            ..CompletionConfig::new(api_key)
        };
        CompletionClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_client_sends_model_temperature_and_messages() {
        let client = client_with_key("sk-good").await;

        let content = client.complete(&prompt()).await.unwrap();

        assert_eq!(content, "  gpt-3.5-turbo at 0.7 with 2 messages  ");
    }

    #[tokio::test]
    async fn test_client_rejected_credential_is_err() {
        let client = client_with_key("sk-revoked").await;

        let err = client.complete(&prompt()).await.unwrap_err();

        let message = err.to_string();
        assert!(message.contains("401"));
        assert!(message.contains("Incorrect API key provided"));
    }

    #[tokio::test]
    async fn test_service_error_propagates() {
        let generator = NarrativeGenerator::new(Arc::new(Unauthorized));
        let err = generator.generate(&prompt()).await.unwrap_err();
        assert!(format!("{:#}", err).contains("401 Unauthorized"));
    }
}
