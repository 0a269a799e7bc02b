//! Engine configuration
//!
//! Loaded from environment variables (binaries call `dotenvy::dotenv()`
//! first):
//!
//! - `AGENT_BACKEND`: `anthropic` (default) or `openai`
//! - `ANTHROPIC_API_KEY` / `OPENAI_API_KEY`: key for the selected backend
//! - `ANTHROPIC_MODEL` / `OPENAI_MODEL`: optional model override
//! - `VOICE_TEMPERATURE`: sampling temperature for interpretation
//! - `VOICE_INTERPRETER_TIMEOUT_SECS`: optional bound on the oracle call
//! - `VOICE_TRANSCRIPTION_MODEL`: Whisper model name (default `whisper-1`)

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;
use crate::llm::AgentBackend;

const DEFAULT_TEMPERATURE: f32 = 0.1;
const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

/// Voice engine configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub backend: AgentBackend,

    /// API key for the interpretation backend
    #[serde(skip_serializing, default)]
    pub api_key: String,

    /// Model override; the client default is used when unset
    pub model: Option<String>,

    pub temperature: f32,

    /// Bound on the interpretation call; `None` waits indefinitely
    pub interpreter_timeout_seconds: Option<u64>,

    /// OpenAI key used for transcription, if available
    #[serde(skip_serializing, default)]
    pub transcription_api_key: Option<String>,

    pub transcription_model: String,
}

impl std::fmt::Debug for VoiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceConfig")
            .field("backend", &self.backend)
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field(
                "interpreter_timeout_seconds",
                &self.interpreter_timeout_seconds,
            )
            .field(
                "transcription_api_key",
                &self.transcription_api_key.as_ref().map(|_| "***"),
            )
            .field("transcription_model", &self.transcription_model)
            .finish()
    }
}

impl VoiceConfig {
    /// Create a configuration for `backend` with the given key
    pub fn new(backend: AgentBackend, api_key: impl Into<String>) -> Self {
        Self {
            backend,
            api_key: api_key.into(),
            model: None,
            temperature: DEFAULT_TEMPERATURE,
            interpreter_timeout_seconds: None,
            transcription_api_key: None,
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
        }
    }

    /// Set model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set interpretation timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.interpreter_timeout_seconds = Some(timeout_seconds);
        self
    }

    /// Set transcription key
    pub fn with_transcription_key(mut self, api_key: impl Into<String>) -> Self {
        self.transcription_api_key = Some(api_key.into());
        self
    }

    pub fn interpreter_timeout(&self) -> Option<Duration> {
        self.interpreter_timeout_seconds.map(Duration::from_secs)
    }

    /// Load from process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend = match lookup("AGENT_BACKEND") {
            Some(value) => value.parse()?,
            None => AgentBackend::default(),
        };

        let api_key = lookup(backend.api_key_var())
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingEnv(backend.api_key_var()))?;

        let mut config = Self::new(backend, api_key);
        config.model = lookup(backend.model_var()).filter(|m| !m.trim().is_empty());

        if let Some(raw) = lookup("VOICE_TEMPERATURE") {
            config.temperature = parse_var("VOICE_TEMPERATURE", &raw)?;
            if !(0.0..=1.0).contains(&config.temperature) {
                return Err(ConfigError::InvalidValue {
                    key: "VOICE_TEMPERATURE",
                    value: raw,
                    reason: "must be between 0.0 and 1.0".to_string(),
                });
            }
        }

        if let Some(raw) = lookup("VOICE_INTERPRETER_TIMEOUT_SECS") {
            let seconds: u64 = parse_var("VOICE_INTERPRETER_TIMEOUT_SECS", &raw)?;
            config.interpreter_timeout_seconds = (seconds > 0).then_some(seconds);
        }

        config.transcription_api_key = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());
        if let Some(model) = lookup("VOICE_TRANSCRIPTION_MODEL").filter(|m| !m.trim().is_empty()) {
            config.transcription_model = model;
        }

        Ok(config)
    }
}

fn parse_var<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
