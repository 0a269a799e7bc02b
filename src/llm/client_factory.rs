//! Client construction from configuration

use std::sync::Arc;

use super::anthropic_client::AnthropicClient;
use super::backend::AgentBackend;
use super::llm_client::LlmClient;
use super::openai_client::OpenAiClient;
use crate::config::VoiceConfig;

/// Build the oracle client selected by `config`
pub fn create_llm_client(config: &VoiceConfig) -> Arc<dyn LlmClient> {
    let client: Arc<dyn LlmClient> = match config.backend {
        AgentBackend::Anthropic => {
            let client = match &config.model {
                Some(model) => AnthropicClient::with_model(config.api_key.clone(), model),
                None => AnthropicClient::new(config.api_key.clone()),
            };
            Arc::new(client.with_temperature(config.temperature))
        }
        AgentBackend::OpenAi => {
            let client = match &config.model {
                Some(model) => OpenAiClient::with_model(config.api_key.clone(), model),
                None => OpenAiClient::new(config.api_key.clone()),
            };
            Arc::new(client.with_temperature(config.temperature))
        }
    };

    tracing::info!(
        provider = client.provider_name(),
        model = client.model_name(),
        "Created interpretation client"
    );
    client
}
