use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::GeminiConfig;
use crate::error::{ensure_success, ProviderError};
use crate::LlmProvider;

#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    pub fn new(client: Client, config: GeminiConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let payload = json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": prompt }]
                }
            ]
        });

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", self.config.api_key.as_str())
            .json(&payload)
            .send()
            .await?;
        let body: Value = ensure_success(response, "gemini").await?.json().await?;

        let text = extract_candidate_text(&body)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ProviderError::Malformed("gemini output text missing".to_string()))?;
        debug!(model = %self.config.model, chars = text.len(), "completion received");
        Ok(text)
    }
}

fn extract_candidate_text(payload: &Value) -> Option<String> {
    let parts = payload
        .pointer("/candidates/0/content/parts")?
        .as_array()?
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>();

    if parts.is_empty() {
        None
    } else {
        Some(parts.concat())
    }
}
