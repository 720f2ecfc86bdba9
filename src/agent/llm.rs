/// Minimal client for OpenAI-compatible chat completion endpoints
use crate::config::LlmConfig;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API key variable {0} is not set")]
    MissingApiKey(String),

    #[error("LLM request failed: {0}")]
    Http(String),

    #[error("LLM response has no message content")]
    MissingContent,
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Http(err.to_string())
    }
}

pub struct ChatClient {
    client: Client,
    url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl ChatClient {
    pub fn new(cfg: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = cfg
            .api_key()
            .ok_or_else(|| LlmError::MissingApiKey(cfg.api_key_env.clone()))?;
        let client = Client::builder().timeout(cfg.timeout()).build()?;

        Ok(Self {
            client,
            url: format!("{}{}", cfg.api_base.trim_end_matches('/'), cfg.path),
            api_key,
            model: cfg.model.clone(),
            temperature: cfg.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a system and a user message, returning the first choice's content
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let started = std::time::Instant::now();
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let json: Value = response.error_for_status()?.json().await?;

        tracing::debug!(
            model = %self.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Chat completion finished"
        );

        message_content(&json)
            .map(str::to_string)
            .ok_or(LlmError::MissingContent)
    }
}

/// `choices[0].message.content` of a chat completion response
pub fn message_content(json: &Value) -> Option<&str> {
    json.get("choices")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(|c| c.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_choice_content() {
        let json = serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": "search_hybrid" } }
            ]
        });
        assert_eq!(message_content(&json), Some("search_hybrid"));
    }

    #[test]
    fn missing_choices_has_no_content() {
        assert_eq!(message_content(&serde_json::json!({ "error": "rate limited" })), None);
        assert_eq!(message_content(&serde_json::json!({ "choices": [] })), None);
    }

    #[test]
    fn client_requires_api_key() {
        let cfg = LlmConfig {
            api_key_env: "ARTSCOUT_TEST_LLM_KEY_NEVER_SET".to_string(),
            ..crate::config::Config::default().llm
        };
        assert!(matches!(ChatClient::new(&cfg), Err(LlmError::MissingApiKey(_))));
    }
}
