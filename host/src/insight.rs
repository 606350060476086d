//! ==============================================================================
//! insight.rs - one-sentence advisory from a hosted language model
//! ==============================================================================
//!
//! purpose:
//!     turns a snapshot into a prompt, asks the completion service for a short
//!     friendly remark in traditional chinese, and always hands back text:
//!     the model's answer, a default phrase for an empty answer, or a fixed
//!     fallback sentence when the call fails.
//!
//! relationships:
//!     - used by: runtime.rs (after each published snapshot)
//!     - implements: CompletionService for the gemini generateContent api
//!     - returns: error.rs CompletionError from the service, never from generate()
//!
//! ==============================================================================

use crate::config::InsightConfig;
use crate::domain::{EnvironmentSnapshot, Location};
use crate::error::CompletionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// shown before the first advisory resolves
pub const INSIGHT_PLACEHOLDER: &str = "正在分析環境數據...";
/// the service answered, but with no text
pub const INSIGHT_EMPTY: &str = "數據更新中...";
/// the service failed
pub const INSIGHT_FALLBACK: &str = "環境品質良好，適宜活動。";

/// text-completion capability: prompt in, text out
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

// ==============================================================================
// generator
// ==============================================================================

#[derive(Clone)]
pub struct InsightGenerator {
    service: Arc<dyn CompletionService>,
}

impl InsightGenerator {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self { service }
    }

    /// advisory for one location and snapshot; never fails
    pub async fn generate(&self, location: &Location, snapshot: &EnvironmentSnapshot) -> String {
        let prompt = build_prompt(location, snapshot);

        match self.service.complete(&prompt).await {
            Ok(text) if text.trim().is_empty() => INSIGHT_EMPTY.to_string(),
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(location = %location.id, "insight generation failed: {}", e);
                INSIGHT_FALLBACK.to_string()
            }
        }
    }
}

pub fn build_prompt(location: &Location, snapshot: &EnvironmentSnapshot) -> String {
    format!(
        "Current readings at {}:\n\
         PM2.5: {}μg/m³,\n\
         Temperature: {}°C,\n\
         CO2: {}ppm.\n\
         Reply with one very short, friendly sentence of health advice or status, \
         written in Traditional Chinese (Taiwan).",
        location.name, snapshot.pm25, snapshot.temperature, snapshot.co2
    )
}

// ==============================================================================
// gemini client
// ==============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// text of the first candidate; empty when the model produced none
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect::<Vec<_>>().join(""))
            .unwrap_or_default()
    }
}

/// minimal client for the generateContent endpoint
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl GeminiClient {
    /// reads the api key from the env var named in the config
    ///
    /// a missing key is not fatal: every call then fails with MissingApiKey
    /// and the generator falls back.
    pub fn from_config(config: &InsightConfig) -> Result<Self, CompletionError> {
        let api_key = config.api_key();
        if api_key.is_none() {
            tracing::warn!(env = %config.api_key_env, "completion api key not set; advisories will use the fallback");
        }
        Self::new(config, api_key)
    }

    pub fn new(config: &InsightConfig, api_key: Option<String>) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            api_key_env: config.api_key_env.clone(),
        })
    }
}

#[async_trait]
impl CompletionService for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| CompletionError::MissingApiKey(self.api_key_env.clone()))?;

        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateRequest {
            contents: [RequestContent { parts: [RequestPart { text: prompt }] }],
        };

        tracing::debug!(model = %self.model, "requesting completion");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api { status: status.as_u16(), message });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Format(e.to_string()))?;

        Ok(parsed.text())
    }
}
