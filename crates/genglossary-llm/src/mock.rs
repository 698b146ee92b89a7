//! An in-memory [`LlmClient`] for pipeline tests.
//!
//! Lets tests script per-prompt responses and force specific prompts to
//! fail, without needing a real model server -- the per-term resilience
//! scenario in the executor's test suite depends on configuring exactly one
//! term to fail.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::client::LlmClient;
use crate::error::{LlmError, Result};

#[derive(Default)]
pub struct MockLlmClient {
    /// Prompts containing this substring return `Err(LlmError::Transport(..))`.
    fail_on_substring: Mutex<Vec<String>>,
    /// Canned text responses, tried in order against the prompt.
    text_responses: Mutex<HashMap<String, String>>,
    default_structured: Mutex<Option<serde_json::Value>>,
    calls: Mutex<Vec<String>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_when_prompt_contains(&self, substring: impl Into<String>) {
        self.fail_on_substring.lock().unwrap().push(substring.into());
    }

    pub fn respond_to(&self, substring: impl Into<String>, response: impl Into<String>) {
        self.text_responses.lock().unwrap().insert(substring.into(), response.into());
    }

    pub fn set_default_structured(&self, value: serde_json::Value) {
        *self.default_structured.lock().unwrap() = Some(value);
    }

    pub fn recorded_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn check_failure(&self, prompt: &str) -> Result<()> {
        if self.fail_on_substring.lock().unwrap().iter().any(|s| prompt.contains(s.as_str())) {
            return Err(LlmError::Transport("mock adapter configured to fail for this prompt".into()));
        }
        Ok(())
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.lock().unwrap().push(prompt.to_string());
        self.check_failure(prompt)?;
        let responses = self.text_responses.lock().unwrap();
        for (substring, response) in responses.iter() {
            if prompt.contains(substring.as_str()) {
                return Ok(response.clone());
            }
        }
        Ok(String::new())
    }

    fn generate_structured(&self, prompt: &str, _schema: &serde_json::Value) -> Result<serde_json::Value> {
        self.calls.lock().unwrap().push(prompt.to_string());
        self.check_failure(prompt)?;
        if let Some(value) = self.default_structured.lock().unwrap().clone() {
            return Ok(value);
        }
        Ok(serde_json::json!({}))
    }
}
