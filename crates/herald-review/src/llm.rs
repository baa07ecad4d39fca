use std::time::Duration;

use async_trait::async_trait;
use herald_core::{HeraldError, LlmConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capability::TextGenerator;

/// A message in a chat conversation with the LLM.
///
/// # Examples
///
/// ```
/// use herald_review::llm::{ChatMessage, Role};
///
/// let msg = ChatMessage::user("Summarize this change");
/// assert!(matches!(msg.role, Role::User));
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Text content of the message.
    pub content: String,
}

impl ChatMessage {
    /// A user-role message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Role in the chat conversation.
///
/// # Examples
///
/// ```
/// use herald_review::llm::Role;
///
/// let role = Role::System;
/// assert_eq!(serde_json::to_string(&role).unwrap(), "\"system\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

/// OpenAI-compatible chat completions client.
///
/// Works with any provider that exposes the `/v1/chat/completions` endpoint:
/// OpenAI, Azure OpenAI behind a proxy, Ollama, vLLM, LiteLLM, etc.
///
/// # Examples
///
/// ```
/// use herald_core::LlmConfig;
/// use herald_review::llm::LlmClient;
///
/// let config = LlmConfig {
///     api_key: Some("test-key".into()),
///     ..LlmConfig::default()
/// };
/// let client = LlmClient::new(&config).unwrap().with_temperature(0.2);
/// assert_eq!(client.temperature(), 0.2);
/// ```
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
    temperature: f64,
}

impl LlmClient {
    /// Create a new LLM client from configuration, sampling at
    /// [`LlmConfig::temperature`].
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::Llm`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, HeraldError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| HeraldError::Llm(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            temperature: config.temperature,
            config: config.clone(),
        })
    }

    /// Same client, different sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Return the model name from the configuration.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Sampling temperature sent with every request.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Send a chat completion request and return the text response.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::Llm`] on HTTP errors or response parsing failures.
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, HeraldError> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://api.openai.com")
            .trim_end_matches('/');
        let url = format!("{base_url}/v1/chat/completions");

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.temperature,
        });

        let mut request = self.client.post(&url);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }
        request = request.header("Content-Type", "application/json");

        debug!(model = %self.config.model, temperature = self.temperature, "chat completion");
        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| HeraldError::Llm(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(HeraldError::Llm(format!(
                "LLM API error {status}: {body_text}"
            )));
        }

        let response_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| HeraldError::Llm(format!("failed to parse response: {e}")))?;

        let content = response_body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                HeraldError::Llm(format!("unexpected response structure: {response_body}"))
            })?;

        Ok(content.to_string())
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<String, HeraldError> {
        self.chat(vec![ChatMessage::user(prompt)]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::LlmConfig;
    use mockito::Matcher;

    fn config_for(server: &mockito::Server) -> LlmConfig {
        LlmConfig {
            api_key: Some("sk-test".into()),
            base_url: Some(server.url()),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn client_construction_succeeds() {
        let config = LlmConfig::default();
        let client = LlmClient::new(&config);
        assert!(client.is_ok());
    }

    #[test]
    fn model_and_temperature_come_from_config() {
        let config = LlmConfig {
            model: "gpt-4o".into(),
            ..LlmConfig::default()
        };
        let client = LlmClient::new(&config).unwrap();
        assert_eq!(client.model(), "gpt-4o");
        assert_eq!(client.temperature(), 0.1);
        assert_eq!(client.with_temperature(0.2).temperature(), 0.2);
    }

    #[test]
    fn chat_message_serializes() {
        let msg = ChatMessage {
            role: Role::System,
            content: "hello".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "hello");
    }

    #[tokio::test]
    async fn generate_sends_single_user_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4o-mini",
                "temperature": 0.2,
                "messages": [{ "role": "user", "content": "describe" }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "choices": [{ "message": { "role": "assistant", "content": "  A summary.\n" } }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = LlmClient::new(&config_for(&server))
            .unwrap()
            .with_temperature(0.2);
        let text = client.generate("describe").await.unwrap();
        assert_eq!(text, "  A summary.\n");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_error_is_llm_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let client = LlmClient::new(&config_for(&server)).unwrap();
        let err = client.generate("x").await.unwrap_err();
        assert!(matches!(err, HeraldError::Llm(ref m) if m.contains("429")));
    }

    #[tokio::test]
    async fn missing_choices_is_llm_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let client = LlmClient::new(&config_for(&server)).unwrap();
        assert!(matches!(
            client.generate("x").await,
            Err(HeraldError::Llm(_))
        ));
    }
}
