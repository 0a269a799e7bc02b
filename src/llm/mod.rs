//! LLM client abstraction for the interpretation oracle
//!
//! Set `AGENT_BACKEND` to pick the provider:
//! - `anthropic` (default): Anthropic Claude API
//! - `openai`: OpenAI API

pub mod anthropic_client;
pub mod backend;
pub mod client_factory;
pub mod llm_client;
pub mod openai_client;

pub use anthropic_client::AnthropicClient;
pub use backend::AgentBackend;
pub use client_factory::create_llm_client;
pub use llm_client::LlmClient;
pub use openai_client::OpenAiClient;
