//! Transcription boundary
//!
//! Audio in, text out. The engine only sees [`Transcriber`]; the Whisper
//! client is one implementation of it.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const WHISPER_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Captured audio for one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBuffer {
    pub bytes: Vec<u8>,
    /// MIME type reported by the recorder, e.g. `audio/webm`
    pub mime_type: String,
}

impl AudioBuffer {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn mime_or_default(&self) -> &str {
        match self.mime_type.trim() {
            "" => "audio/webm",
            mime => mime,
        }
    }

    /// File name sent with the upload; the extension is what the API sniffs
    pub fn file_name(&self) -> String {
        let subtype = self
            .mime_or_default()
            .split(';')
            .next()
            .and_then(|m| m.split('/').nth(1))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("webm");
        let extension = match subtype {
            "mpeg" => "mp3",
            "x-wav" | "wave" => "wav",
            "mp4" | "x-m4a" => "m4a",
            other => other,
        };
        format!("recording.{}", extension)
    }
}

/// Text produced from an audio buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
}

impl Transcript {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Speech-to-text service
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &AudioBuffer) -> Result<Transcript>;

    fn model_name(&self) -> &str;
}

/// OpenAI Whisper HTTP client
#[derive(Clone)]
pub struct WhisperTranscriber {
    api_key: String,
    client: reqwest::Client,
    model: String,
}

impl WhisperTranscriber {
    pub fn new(api_key: String, model: &str) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio: &AudioBuffer) -> Result<Transcript> {
        tracing::debug!(
            model = %self.model,
            bytes = audio.bytes.len(),
            mime = %audio.mime_type,
            "Uploading audio for transcription"
        );

        let file = reqwest::multipart::Part::bytes(audio.bytes.clone())
            .file_name(audio.file_name())
            .mime_str(audio.mime_or_default())?;
        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "json")
            .part("file", file);

        let response = self
            .client
            .post(WHISPER_URL)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Transcription API error {}: {}", status, body));
        }

        let transcript: Transcript = response.json().await?;
        Ok(transcript)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
