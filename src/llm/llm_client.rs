//! LLM Client Trait
//!
//! Unified interface for the providers that can act as the interpretation
//! oracle (Anthropic, OpenAI).

use anyhow::Result;
use async_trait::async_trait;

/// Unified LLM client interface
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Call the LLM expecting a JSON object response
    /// - OpenAI: uses response_format json_object mode
    /// - Anthropic: adds a JSON-only instruction to the system prompt
    async fn chat_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Get the model name for logging
    fn model_name(&self) -> &str;

    /// Get the provider name for logging
    fn provider_name(&self) -> &str;
}
