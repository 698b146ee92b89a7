//! Adapter for Ollama's local `/api/generate` wire protocol.

use serde::Deserialize;
use serde_json::json;

use crate::client::LlmClient;
use crate::config::LlmConfig;
use crate::error::{LlmError, Result};

pub struct OllamaClient {
    agent: ureq::Agent,
    config: LlmConfig,
}

impl OllamaClient {
    pub fn new(config: LlmConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .build()
            .into();
        Self { agent, config }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.config.base_url.trim_end_matches('/'))
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl LlmClient for OllamaClient {
    fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
        });
        let parsed: GenerateResponse = send(&self.agent, &self.endpoint(), &body)?;
        Ok(parsed.response)
    }

    fn generate_structured(&self, prompt: &str, schema: &serde_json::Value) -> Result<serde_json::Value> {
        let body = json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
            "format": schema,
        });
        let parsed: GenerateResponse = send(&self.agent, &self.endpoint(), &body)?;
        serde_json::from_str(&parsed.response)
            .map_err(|e| LlmError::InvalidResponse(format!("structured response was not valid JSON: {e}")))
    }
}

fn send<T: for<'de> Deserialize<'de>>(agent: &ureq::Agent, url: &str, body: &serde_json::Value) -> Result<T> {
    tracing::debug!(url, "sending ollama request");
    let mut response = agent
        .post(url)
        .send_json(body)
        .map_err(|e| {
            let mapped = match e {
                ureq::Error::Timeout(_) => LlmError::Timeout(std::time::Duration::default()),
                ureq::Error::StatusCode(code) => LlmError::ErrorStatus(format!("HTTP {code}")),
                other => LlmError::Transport(other.to_string()),
            };
            tracing::warn!(url, error = %mapped, "ollama request failed");
            mapped
        })?;
    response
        .body_mut()
        .read_json::<T>()
        .map_err(|e| LlmError::InvalidResponse(e.to_string()))
}
