use async_trait::async_trait;
use serde_json::Value;

use crate::{config::DEFAULT_TEMPERATURE, error::ExtractionBackendError, provider::Provider};

/// Text completion backend used by the extraction engine.
///
/// Construct one per process and share it (`Arc<dyn LlmClient>`); the HTTP
/// implementation pools its connections.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ExtractionBackendError>;

    /// Model identifier, for logs.
    fn model(&self) -> &str;
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl ChatCompletionsClient {
    /// Build a client for `provider`, reading its API key from the environment.
    pub fn from_provider(provider: Provider) -> Result<Self, ExtractionBackendError> {
        let config = provider.config();
        let api_key = provider.validate_api_key()?;
        Ok(Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.to_string(),
            api_key,
            model: config.model.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn request_body(&self, prompt: &str) -> Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": prompt,
                },
            ],
            "temperature": self.temperature,
        })
    }
}

#[async_trait]
impl LlmClient for ChatCompletionsClient {
    async fn complete(&self, prompt: &str) -> Result<String, ExtractionBackendError> {
        let response = self
            .http
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionBackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response = response.json::<Value>().await?;
        message_content(&response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Pull `choices[0].message.content` out of a chat completion response.
pub fn message_content(response: &Value) -> Result<String, ExtractionBackendError> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ExtractionBackendError::InvalidResponse {
            reason: format!("no message content in {response}"),
        })
}
