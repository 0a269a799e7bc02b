//! Backend Selection
//!
//! Selects the LLM provider that plays the interpretation oracle.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ConfigError;

/// LLM backend provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentBackend {
    /// Anthropic Claude (default)
    #[default]
    Anthropic,
    /// OpenAI GPT
    OpenAi,
}

impl AgentBackend {
    /// Get display name
    pub fn name(&self) -> &'static str {
        match self {
            AgentBackend::Anthropic => "Anthropic",
            AgentBackend::OpenAi => "OpenAI",
        }
    }

    /// Environment variable holding this backend's API key
    pub fn api_key_var(&self) -> &'static str {
        match self {
            AgentBackend::Anthropic => "ANTHROPIC_API_KEY",
            AgentBackend::OpenAi => "OPENAI_API_KEY",
        }
    }

    /// Environment variable overriding this backend's model
    pub fn model_var(&self) -> &'static str {
        match self {
            AgentBackend::Anthropic => "ANTHROPIC_MODEL",
            AgentBackend::OpenAi => "OPENAI_MODEL",
        }
    }
}

impl FromStr for AgentBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(AgentBackend::Anthropic),
            "openai" | "gpt" => Ok(AgentBackend::OpenAi),
            other => Err(ConfigError::InvalidValue {
                key: "AGENT_BACKEND",
                value: other.to_string(),
                reason: "valid values: anthropic, claude, openai, gpt".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for AgentBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
