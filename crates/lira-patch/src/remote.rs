//! Remote text generation
//!
//! [`RemoteGenerator`] is the only capability the patch generator needs from
//! a model: prompt in, text out. [`GeminiClient`] speaks the Gemini
//! `generateContent` wire format over HTTPS.

use crate::error::RemoteError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default API base
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default deadline for one remote call, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Text generation capability
#[async_trait]
pub trait RemoteGenerator: Send + Sync {
    /// Generate text for a prompt
    ///
    /// # Errors
    /// Returns error on transport failure, non-success status or an empty
    /// response
    async fn generate(&self, prompt: &str) -> Result<String, RemoteError>;

    /// Name used in logs
    fn name(&self) -> &str {
        "remote"
    }
}

/// Remote model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// API base URL
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// API key; remote generation is disabled without one
    pub api_key: Option<String>,
    /// Per-call deadline
    pub timeout_secs: u64,
    /// Sampling temperature
    pub temperature: f64,
    /// Output token cap
    pub max_output_tokens: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            temperature: 0.7,
            max_output_tokens: 2048,
        }
    }
}

impl RemoteConfig {
    /// Create default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API key
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the model
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the per-call deadline
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Whether a non-empty API key is set
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Per-call deadline as a duration
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content
            .parts
            .into_iter()
            .next()
            .map(|p| p.text)
            .filter(|t| !t.trim().is_empty())
    }
}

fn request_body<'a>(config: &RemoteConfig, prompt: &'a str) -> GenerateRequest<'a> {
    GenerateRequest {
        contents: vec![RequestContent {
            parts: vec![RequestPart { text: prompt }],
        }],
        generation_config: GenerationConfig {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        },
    }
}

/// HTTP client for the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http_client: reqwest::Client,
    config: RemoteConfig,
    api_key: String,
}

impl GeminiClient {
    /// Create a client
    ///
    /// # Errors
    /// Returns [`RemoteError::Disabled`] without an API key, or a transport
    /// error if the HTTP client cannot be built
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let api_key = match config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => return Err(RemoteError::Disabled),
        };
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
            api_key,
        })
    }

    /// Settings in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }
}

#[async_trait]
impl RemoteGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, RemoteError> {
        tracing::debug!(model = %self.config.model, chars = prompt.len(), "Calling remote model");

        let response = self
            .http_client
            .post(self.config.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body(&self.config, prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RemoteError::Timeout(self.config.timeout_secs)
                } else {
                    RemoteError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Http {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;

        body.first_text().ok_or(RemoteError::EmptyResponse)
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_shape() {
        let config = RemoteConfig::new();
        let body = serde_json::to_value(request_body(&config, "hello")).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{"parts": [{"text": "hello"}]}],
                "generationConfig": {"temperature": 0.7, "maxOutputTokens": 2048}
            })
        );
    }

    #[test]
    fn response_text_extraction() {
        let raw = json!({
            "candidates": [{"content": {"parts": [{"text": "print('ok')"}]}}]
        });
        let parsed: GenerateResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.first_text().as_deref(), Some("print('ok')"));

        let empty: GenerateResponse = serde_json::from_value(json!({"candidates": []})).unwrap();
        assert!(empty.first_text().is_none());

        let blank: GenerateResponse =
            serde_json::from_value(json!({"candidates": [{"content": {"parts": [{"text": "  "}]}}]}))
                .unwrap();
        assert!(blank.first_text().is_none());
    }

    #[test]
    fn client_requires_key() {
        assert!(matches!(GeminiClient::new(RemoteConfig::new()), Err(RemoteError::Disabled)));
        assert!(matches!(
            GeminiClient::new(RemoteConfig::new().with_api_key("  ")),
            Err(RemoteError::Disabled)
        ));
        assert!(GeminiClient::new(RemoteConfig::new().with_api_key("k")).is_ok());
    }

    #[test]
    fn url_and_defaults() {
        let config = RemoteConfig::new().with_model("gemini-pro");
        assert_eq!(
            config.url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent"
        );
        assert_eq!(config.timeout(), Duration::from_secs(20));
        assert!(!config.is_enabled());
    }
}
