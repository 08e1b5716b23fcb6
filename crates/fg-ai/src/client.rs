//! HTTP verdict client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

use fg_core::verdict::parse_verdict_payload;
use fg_core::{AiVerdict, ProviderConfig, ProviderKind, VerdictClient, VerdictError};

use crate::prompt::build_prompt;
use crate::{gemini, openai};

/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Provider endpoints that are not part of the user's settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub timeout: Duration,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            gemini_base_url: gemini::DEFAULT_BASE_URL.to_string(),
            gemini_model: gemini::DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// [`VerdictClient`] backed by the configured provider's HTTP API.
#[derive(Debug, Clone)]
pub struct AiClient {
    http: Client,
    endpoints: Endpoints,
}

impl AiClient {
    pub fn new(endpoints: Endpoints) -> Result<Self, VerdictError> {
        let http = Client::builder()
            .timeout(endpoints.timeout)
            .build()
            .map_err(|e| VerdictError::Transport(e.to_string()))?;
        Ok(Self { http, endpoints })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Chat-capable models offered by an OpenAI-compatible endpoint.
    pub async fn list_models(&self, config: &ProviderConfig) -> Result<Vec<String>, VerdictError> {
        let url = required(&config.openai_api_url, "openai_api_url")?;
        let key = required(&config.openai_api_key, "openai_api_key")?;
        let listing = self
            .send(self.http.get(openai::models_url(url)).bearer_auth(key))
            .await?;
        Ok(openai::chat_models(&listing))
    }

    async fn ask_gemini(&self, config: &ProviderConfig, prompt: &str) -> Result<String, VerdictError> {
        let key = required(&config.gemini_api_key, "api_key")?;
        let request = self
            .http
            .post(gemini::generate_url(&self.endpoints.gemini_base_url, &self.endpoints.gemini_model))
            .query(&[("key", key)])
            .json(&gemini::request_body(prompt));
        let envelope = self.send(request).await?;
        gemini::extract_text(&envelope).map(str::to_string)
    }

    async fn ask_openai(&self, config: &ProviderConfig, prompt: &str) -> Result<String, VerdictError> {
        let url = required(&config.openai_api_url, "openai_api_url")?;
        let key = required(&config.openai_api_key, "openai_api_key")?;
        let model = required(&config.openai_model, "openai_model")?;
        let request = self
            .http
            .post(openai::chat_url(url))
            .bearer_auth(key)
            .json(&openai::request_body(model, prompt));
        let envelope = self.send(request).await?;
        openai::extract_text(&envelope).map(str::to_string)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, VerdictError> {
        let response = request
            .send()
            .await
            .map_err(|e| VerdictError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VerdictError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| VerdictError::Envelope(e.to_string()))
    }
}

#[async_trait]
impl VerdictClient for AiClient {
    async fn evaluate(&self, title: &str, intent: &str, config: &ProviderConfig) -> Result<AiVerdict, VerdictError> {
        if !config.is_configured() {
            log::warn!("AI [{}] is not configured, allowing by default", config.provider);
            return Ok(AiVerdict::UNKNOWN);
        }

        log::debug!("AI [{}] judging title {:?}", config.provider, title);
        let prompt = build_prompt(intent, title);
        let text = match config.provider {
            ProviderKind::Gemini => self.ask_gemini(config, &prompt).await?,
            ProviderKind::Openai => self.ask_openai(config, &prompt).await?,
        };
        log::debug!("AI [{}] raw answer: {:?}", config.provider, text);
        Ok(parse_verdict_payload(&text))
    }

    async fn validate(&self, config: &ProviderConfig) -> Result<(), VerdictError> {
        if !config.is_configured() {
            return Err(VerdictError::NotConfigured(config.provider.to_string()));
        }

        let request = match config.provider {
            ProviderKind::Gemini => self
                .http
                .get(gemini::models_url(&self.endpoints.gemini_base_url))
                .query(&[("key", required(&config.gemini_api_key, "api_key")?)]),
            ProviderKind::Openai => self
                .http
                .get(openai::models_url(required(&config.openai_api_url, "openai_api_url")?))
                .bearer_auth(required(&config.openai_api_key, "openai_api_key")?),
        };
        self.send(request).await.map(|_| ())
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, VerdictError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| VerdictError::NotConfigured(name.to_string()))
}
