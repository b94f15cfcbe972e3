use super::{CompletionProvider, LLMError, Message};
use crate::config::LLMConfig;
use crate::secrets::{scrub_secrets, SecretStore, OPENAI_API_KEY};
use async_trait::async_trait;
use serde_json::json;

/// OpenAI-compatible chat completions client
pub struct OpenAIProvider {
    config: LLMConfig,
    secrets: SecretStore,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: LLMConfig, secrets: SecretStore) -> Self {
        Self {
            config,
            secrets,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, messages: &[Message]) -> super::Result<String> {
        let api_key = self
            .secrets
            .get(OPENAI_API_KEY)
            .map_err(|e| LLMError::AuthenticationFailed(e.to_string()))?;

        let api_messages: Vec<_> = messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.to_string(),
                    "content": msg.content
                })
            })
            .collect();

        let payload = json!({
            "model": self.config.model,
            "messages": api_messages,
            "temperature": self.config.temperature,
        });

        tracing::debug!(model = %self.config.model, "Requesting chat completion");

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", api_key.expose()))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| LLMError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = scrub_secrets(&response.text().await.unwrap_or_default());
            tracing::warn!(status = status.as_u16(), "Chat completion request failed");

            return Err(match status.as_u16() {
                401 | 403 => LLMError::AuthenticationFailed(text),
                429 => LLMError::RateLimitExceeded,
                _ => LLMError::InvalidRequest(format!("HTTP {}: {}", status.as_u16(), text)),
            });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        let message = data
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|choice| choice.get("message"))
            .ok_or_else(|| LLMError::ParseError("No message in response".to_string()))?;

        message
            .get("content")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| LLMError::ParseError("Empty content".to_string()))
    }
}
