//! The narrow interface every executor stage calls through.

use crate::error::Result;

/// Two operations, both blocking (adapters are built on a blocking `ureq`
/// agent so they compose with the executor's synchronous call sites without
/// requiring an async runtime in the pipeline).
pub trait LlmClient: Send + Sync {
    /// Free-form text completion.
    fn generate(&self, prompt: &str) -> Result<String>;

    /// Completion constrained to a JSON Schema. Adapters that support
    /// native structured output use it directly; others fall back to
    /// prompting for JSON and parsing the result.
    fn generate_structured(&self, prompt: &str, schema: &serde_json::Value) -> Result<serde_json::Value>;
}
