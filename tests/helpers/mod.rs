//! Scripted oracle and transcriber doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use voice_fill::{
    AudioBuffer, FieldSchemaRegistry, LlmClient, Transcriber, Transcript, UtteranceInterpreter,
    VoiceCommandEngine,
};

/// Oracle that replays canned responses in order
#[derive(Default)]
pub struct ScriptedClient {
    responses: Mutex<VecDeque<anyhow::Result<String>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(self: &Arc<Self>, body: serde_json::Value) -> Arc<Self> {
        self.push(Ok(body.to_string()))
    }

    pub fn reply_raw(self: &Arc<Self>, body: &str) -> Arc<Self> {
        self.push(Ok(body.to_string()))
    }

    pub fn fail(self: &Arc<Self>, reason: &str) -> Arc<Self> {
        self.push(Err(anyhow::anyhow!("{}", reason)))
    }

    fn push(self: &Arc<Self>, response: anyhow::Result<String>) -> Arc<Self> {
        self.responses.lock().unwrap().push_back(response);
        self.clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_user_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn chat_json(&self, _system_prompt: &str, user_prompt: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(user_prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow::anyhow!("no scripted response left")))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }

    fn provider_name(&self) -> &str {
        "Test"
    }
}

/// Transcriber returning a fixed text or error
pub struct ScriptedTranscriber {
    result: Result<String, String>,
    calls: AtomicUsize,
}

impl ScriptedTranscriber {
    pub fn text(text: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Err(reason.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, _audio: &AudioBuffer) -> anyhow::Result<Transcript> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Ok(text) => Ok(Transcript::new(text.clone())),
            Err(reason) => Err(anyhow::anyhow!("{}", reason)),
        }
    }

    fn model_name(&self) -> &str {
        "scripted-stt"
    }
}

pub fn engine(client: Arc<ScriptedClient>) -> VoiceCommandEngine {
    VoiceCommandEngine::new(
        FieldSchemaRegistry::business_document(),
        UtteranceInterpreter::new(client),
    )
}

pub fn engine_with_transcriber(
    client: Arc<ScriptedClient>,
    transcriber: Arc<ScriptedTranscriber>,
) -> VoiceCommandEngine {
    engine(client).with_transcriber(transcriber)
}

pub fn audio() -> AudioBuffer {
    AudioBuffer::new(vec![0x1a, 0x45, 0xdf, 0xa3], "audio/webm")
}
