//! LLM client trait and adapters.
//!
//! The executor depends only on [`LlmClient`]; which wire protocol is
//! actually spoken is an adapter-level concern decided once, from a
//! project's `metadata.llm_provider`, and injected at run-start time.

pub mod client;
pub mod config;
pub mod error;
pub mod mock;
pub mod ollama;
pub mod openai_compatible;

pub use client::LlmClient;
pub use config::LlmConfig;
pub use error::{LlmError, Result};
pub use mock::MockLlmClient;
pub use ollama::OllamaClient;
pub use openai_compatible::OpenAiCompatibleClient;

use genglossary_core::enums::LlmProvider;
use std::sync::Arc;

/// Builds the adapter named by `config.provider`.
pub fn build_client(config: LlmConfig, api_key: Option<String>) -> Arc<dyn LlmClient> {
    match config.provider {
        LlmProvider::Ollama => Arc::new(OllamaClient::new(config)),
        LlmProvider::OpenAiCompatible => Arc::new(OpenAiCompatibleClient::new(config, api_key)),
    }
}
