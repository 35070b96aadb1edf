//! Text-generation backend.
//!
//! [`TextGeneration`] is the seam the service talks to; [`OllamaClient`] is
//! the production implementation over an Ollama-compatible `/api/chat`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::InferenceConfig;
use crate::db::ChatMessage;
use crate::error::{InferenceError, ServiceError, ServiceResult};

/// One non-streaming completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    /// Overrides the backend's configured temperature
    pub temperature: Option<f32>,
    /// Ask the backend to constrain output to JSON
    pub json_output: bool,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            json_output: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn json(mut self) -> Self {
        self.json_output = true;
        self
    }
}

#[async_trait]
pub trait TextGeneration: Send + Sync {
    /// Run a chat completion and return the generated text
    async fn complete(&self, request: CompletionRequest) -> Result<String, InferenceError>;

    /// Single-prompt convenience wrapper around [`TextGeneration::complete`]
    async fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
        self.complete(CompletionRequest::new(vec![ChatMessage::user(prompt)]))
            .await
    }

    /// Whether the backend is reachable
    async fn health_check(&self) -> bool;
}

/// Ollama API client
pub struct OllamaClient {
    client: Client,
    config: InferenceConfig,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: InferenceConfig) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                ServiceError::Inference(InferenceError::Connection {
                    url: config.base_url.clone(),
                    source: e,
                })
            })?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl TextGeneration for OllamaClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, InferenceError> {
        let url = format!("{}/api/chat", self.config.base_url);

        let body = OllamaChatRequest {
            model: &self.config.model,
            messages: &request.messages,
            stream: false,
            format: request.json_output.then_some("json"),
            options: OllamaOptions {
                temperature: request.temperature.unwrap_or(self.config.temperature),
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::Timeout {
                        secs: self.config.request_timeout_secs,
                    }
                } else {
                    InferenceError::Connection {
                        url: url.clone(),
                        source: e,
                    }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(InferenceError::Generation { status, message });
        }

        let text = response.text().await.map_err(|e| InferenceError::Connection {
            url: url.clone(),
            source: e,
        })?;

        let chat_response: OllamaChatResponse = serde_json::from_str(&text)
            .map_err(|e| InferenceError::InvalidResponse { source: e })?;

        Ok(chat_response.message.content)
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);

        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!(error = %e, "Inference health check failed");
                false
            }
        }
    }
}

// Internal Ollama API types

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_format() {
        let messages = vec![ChatMessage::system("persona"), ChatMessage::user("hi")];
        let body = OllamaChatRequest {
            model: "llama3.1:8b",
            messages: &messages,
            stream: false,
            format: Some("json"),
            options: OllamaOptions { temperature: 0.5 },
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "model": "llama3.1:8b",
                "messages": [
                    {"role": "system", "content": "persona"},
                    {"role": "user", "content": "hi"}
                ],
                "stream": false,
                "format": "json",
                "options": {"temperature": 0.5}
            })
        );
    }

    #[test]
    fn test_response_without_content_is_empty() {
        let parsed: OllamaChatResponse =
            serde_json::from_str(r#"{"message": {"role": "assistant"}}"#).unwrap();
        assert_eq!(parsed.message.content, "");
    }

    #[tokio::test]
    async fn test_generate_wraps_prompt_as_user_message() {
        let backend = testing::ScriptedInference::replying("ok");

        let reply = backend.generate("what is 2+2?").await.unwrap();

        assert_eq!(reply, "ok");
        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages, vec![ChatMessage::user("what is 2+2?")]);
        assert!(!requests[0].json_output);
    }
}
