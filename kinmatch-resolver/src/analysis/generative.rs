//! Generative text provider boundary
//!
//! The orchestrator only sees [`GenerativeProvider`]: a prompt pair in, text
//! out. [`ChatCompletionsProvider`] is the concrete client for any
//! OpenAI-compatible `chat/completions` endpoint.

use async_trait::async_trait;
use kinmatch_common::config::{resolve_generative_api_key, ModelEndpointConfig, TomlConfig};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Generation request, independent of the model it is sent to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// JSON schema the response should follow, when the endpoint supports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

/// One model in the cascade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEndpoint {
    pub model: String,
    /// Overrides the provider's base URL
    pub base_url: Option<String>,
}

impl ModelEndpoint {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            base_url: None,
        }
    }
}

impl From<&ModelEndpointConfig> for ModelEndpoint {
    fn from(config: &ModelEndpointConfig) -> Self {
        Self {
            model: config.model.clone(),
            base_url: config.base_url.clone(),
        }
    }
}

/// Generative provider errors
#[derive(Debug, Error)]
pub enum GenerativeError {
    #[error("No generative provider configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {0}: {1}")]
    Status(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Response failed validation: {0}")]
    InvalidShape(String),
}

/// What the cascade does after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Try the next model endpoint
    NextModel,
    /// Stop using the provider for this call
    Abandon,
}

impl GenerativeError {
    pub fn disposition(&self) -> Disposition {
        match self {
            GenerativeError::NotConfigured => Disposition::Abandon,
            GenerativeError::Status(401 | 403 | 429, _) => Disposition::Abandon,
            _ => Disposition::NextModel,
        }
    }
}

impl From<reqwest::Error> for GenerativeError {
    fn from(e: reqwest::Error) -> Self {
        GenerativeError::Network(e.to_string())
    }
}

/// Text generation backend
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Model endpoints in cascade order
    fn models(&self) -> &[ModelEndpoint];

    /// Generate a completion with one specific model
    async fn generate(
        &self,
        request: &GenerationRequest,
        model: &ModelEndpoint,
    ) -> Result<String, GenerativeError>;
}

// ============================================================================
// OpenAI-compatible chat completions
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client
pub struct ChatCompletionsProvider {
    client: Client,
    api_key: String,
    base_url: String,
    models: Vec<ModelEndpoint>,
    timeout: Duration,
}

impl ChatCompletionsProvider {
    pub fn new(
        client: Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        models: Vec<ModelEndpoint>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
            models,
            timeout: Duration::from_secs(45),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Provider from `[generative]`; `None` when disabled or no key resolves
    pub fn from_config(config: &TomlConfig, client: Client) -> Option<Self> {
        let generative = &config.generative;
        if !generative.enabled {
            debug!("Generative analysis disabled in configuration");
            return None;
        }
        let api_key = resolve_generative_api_key(config)?;
        let models = generative.models.iter().map(ModelEndpoint::from).collect();
        Some(
            Self::new(client, api_key, generative.base_url.clone(), models)
                .with_timeout(Duration::from_secs(generative.timeout_secs)),
        )
    }

    fn body(request: &GenerationRequest, model: &str) -> Value {
        let mut body = json!({
            "model": model,
            "messages": [
                {"role": "system", "content": request.system_prompt},
                {"role": "user", "content": request.user_prompt},
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });
        if let Some(schema) = &request.response_schema {
            body["response_format"] = json!({
                "type": "json_schema",
                "json_schema": {"name": "response", "schema": schema},
            });
        }
        body
    }
}

#[async_trait]
impl GenerativeProvider for ChatCompletionsProvider {
    fn models(&self) -> &[ModelEndpoint] {
        &self.models
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        model: &ModelEndpoint,
    ) -> Result<String, GenerativeError> {
        let url = model.base_url.as_deref().unwrap_or(self.base_url.as_str());
        debug!(model = %model.model, url = %url, "Sending generation request");

        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .timeout(self.timeout)
            .json(&Self::body(request, &model.model))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerativeError::Status(status.as_u16(), body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerativeError::Parse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| GenerativeError::InvalidShape("response has no message content".to_string()))
    }
}
