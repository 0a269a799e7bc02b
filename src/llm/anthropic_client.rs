//! Oracle client for the Anthropic Messages API
//!
//! The API has no JSON response mode, so the JSON-only constraint rides on
//! the system prompt and a reply cut off at the token limit is an error
//! rather than half an object.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::llm_client::LlmClient;

const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_MAX_TOKENS: u32 = 2048;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

const JSON_ONLY: &str =
    "Respond with a single valid JSON object only. No markdown code blocks, no explanations.";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Clone)]
pub struct AnthropicClient {
    api_key: String,
    http: reqwest::Client,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(api_key: String) -> Self {
        Self::with_model(api_key, DEFAULT_MODEL)
    }

    pub fn with_model(api_key: String, model: &str) -> Self {
        Self {
            api_key,
            http: reqwest::Client::new(),
            model: model.to_string(),
            temperature: 0.1,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn build_request<'a>(&'a self, system_prompt: &str, user_prompt: &'a str) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: format!("{}\n\n{}", system_prompt, JSON_ONLY),
            messages: [Message {
                role: "user",
                content: user_prompt,
            }],
        }
    }
}

/// Join the text blocks of a reply, refusing truncated or empty ones
fn extract_text(response: MessagesResponse) -> Result<String> {
    if response.stop_reason.as_deref() == Some("max_tokens") {
        bail!("Anthropic reply was cut off at the token limit");
    }
    let text: String = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .collect();
    if text.trim().is_empty() {
        bail!("Anthropic reply had no text content");
    }
    Ok(text)
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn chat_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = self.build_request(system_prompt, user_prompt);
        tracing::debug!(model = %self.model, max_tokens = self.max_tokens, "Calling Anthropic");

        let response = self
            .http
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Anthropic API error {}: {}", status, body));
        }

        extract_text(response.json().await?)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "Anthropic"
    }
}
