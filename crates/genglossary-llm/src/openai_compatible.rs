//! Adapter for OpenAI-compatible chat-completion endpoints (vLLM, LM Studio,
//! llama.cpp's server, the real OpenAI API, etc).

use serde::Deserialize;
use serde_json::json;

use crate::client::LlmClient;
use crate::config::LlmConfig;
use crate::error::{LlmError, Result};

pub struct OpenAiCompatibleClient {
    agent: ureq::Agent,
    config: LlmConfig,
    api_key: Option<String>,
}

impl OpenAiCompatibleClient {
    pub fn new(config: LlmConfig, api_key: Option<String>) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .build()
            .into();
        Self { agent, config, api_key }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn send(&self, body: &serde_json::Value) -> Result<String> {
        let mut request = self.agent.post(self.endpoint()).header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", &format!("Bearer {key}"));
        }
        tracing::debug!(endpoint = %self.endpoint(), "sending openai-compatible request");
        let mut response = request.send_json(body).map_err(|e| {
            let mapped = match e {
                ureq::Error::Timeout(_) => LlmError::Timeout(self.config.timeout),
                ureq::Error::StatusCode(code) => LlmError::ErrorStatus(format!("HTTP {code}")),
                other => LlmError::Transport(other.to_string()),
            };
            tracing::warn!(error = %mapped, "openai-compatible request failed");
            mapped
        })?;
        let parsed: ChatCompletionResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response had no choices".into()))
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: String,
}

impl LlmClient for OpenAiCompatibleClient {
    fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
        });
        self.send(&body)
    }

    fn generate_structured(&self, prompt: &str, schema: &serde_json::Value) -> Result<serde_json::Value> {
        let body = json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
            "response_format": {
                "type": "json_schema",
                "json_schema": { "name": "genglossary_structured_output", "schema": schema, "strict": true },
            },
        });
        let content = self.send(&body)?;
        serde_json::from_str(&content)
            .map_err(|e| LlmError::InvalidResponse(format!("structured response was not valid JSON: {e}")))
    }
}
