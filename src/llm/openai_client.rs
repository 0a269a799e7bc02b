//! OpenAI Client
//!
//! Oracle client for the OpenAI chat completions API.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::llm_client::LlmClient;

/// Default OpenAI model
const DEFAULT_MODEL: &str = "gpt-4o";

const API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI API client
#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    client: reqwest::Client,
    model: String,
    temperature: f32,
}

impl OpenAiClient {
    /// Create a new OpenAI client with the given API key
    pub fn new(api_key: String) -> Self {
        Self::with_model(api_key, DEFAULT_MODEL)
    }

    /// Create with a specific model
    pub fn with_model(api_key: String, model: &str) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            model: model.to_string(),
            temperature: 0.1,
        }
    }

    /// Set sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    async fn call_api_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": &self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt}
            ],
            "temperature": self.temperature,
            "response_format": {"type": "json_object"}
        });

        tracing::debug!(model = %self.model, "Calling OpenAI");

        let response = self
            .client
            .post(API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("OpenAI API error {}: {}", status, body));
        }

        #[derive(Deserialize)]
        struct Message {
            content: Option<String>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            choices: Vec<Choice>,
        }

        let api_response: ApiResponse = response.json().await?;
        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("OpenAI returned no choices"))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.call_api_json(system_prompt, user_prompt).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "OpenAI"
    }
}
