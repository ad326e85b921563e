//! Text-generation provider seam and its OpenAI-compatible HTTP backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ConfigError, LlmConfig};

/// Errors from a single generation call. Never leaves the generator: every
/// variant is answered with a fallback document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("provider response had no text content")]
    EmptyContent,

    #[error("malformed output: {0}")]
    MalformedShape(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::Transport(err.to_string())
    }
}

/// One system + user prompt pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Run one completion and return its raw text.
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone)]
pub struct HttpParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for HttpParams {
    fn default() -> Self {
        Self {
            max_tokens: 8192,
            temperature: 0.2,
        }
    }
}

/// Chat-completions backend (`POST {base_url}/chat/completions`).
pub struct ChatCompletionsProvider {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    params: HttpParams,
}

impl ChatCompletionsProvider {
    pub fn new(config: &LlmConfig, params: HttpParams) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            params,
        })
    }

    fn request_body(&self, request: &GenerationRequest) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.prompt.clone(),
                },
            ],
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
        }
    }
}

#[async_trait]
impl GenerationProvider for ChatCompletionsProvider {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        debug!(
            model = %self.model,
            max_tokens = self.params.max_tokens,
            prompt_chars = request.prompt.len(),
            "Invoking generation provider"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(300)
                .collect();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response.json().await?;
        extract_text(body)
    }
}

fn extract_text(body: ChatResponse) -> Result<String, GenerationError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(GenerationError::EmptyContent)
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> ChatCompletionsProvider {
        let config = LlmConfig {
            api_key: "sk-test".to_string(),
            base_url: "https://llm.example.com/v1/".to_string(),
            model: "test-model".to_string(),
        };
        ChatCompletionsProvider::new(&config, HttpParams::default()).unwrap()
    }

    #[test]
    fn endpoint_joins_base_url() {
        assert_eq!(
            provider().endpoint,
            "https://llm.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn request_body_carries_system_and_user_messages() {
        let body = provider().request_body(&GenerationRequest {
            system: "be terse".to_string(),
            prompt: "make a page".to_string(),
        });
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "test-model");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "make a page");
    }

    #[test]
    fn extracts_first_choice_text() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"<!DOCTYPE html>"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(body).unwrap(), "<!DOCTYPE html>");
    }

    #[test]
    fn missing_or_blank_content_is_empty() {
        let body: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(extract_text(body), Err(GenerationError::EmptyContent));

        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"  "}}]}"#).unwrap();
        assert_eq!(extract_text(body), Err(GenerationError::EmptyContent));
    }
}
