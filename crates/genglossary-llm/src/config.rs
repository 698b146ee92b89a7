//! Shared configuration every LLM adapter is built from.

use std::time::Duration;

use genglossary_core::enums::LlmProvider;

/// `{provider, model, base_url, timeout}` -- the one shape every adapter
/// accepts, so the executor can construct whichever adapter a project's
/// `metadata` row names without knowing its wire format.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn new(provider: LlmProvider, model: impl Into<String>, base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| default_base_url(provider).to_string());
        Self { provider, model: model.into(), base_url, timeout: Duration::from_secs(120) }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn default_base_url(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::Ollama => "http://localhost:11434",
        LlmProvider::OpenAiCompatible => "http://localhost:8080/v1",
    }
}
