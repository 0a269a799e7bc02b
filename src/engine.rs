//! Voice command engine
//!
//! Drives one voice turn at a time through transcription, interpretation,
//! normalization, growth resolution and merge. Fatal errors end the turn and
//! put the engine back in `Idle`; nothing from a failed turn reaches the form.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::VoiceConfig;
use crate::context::{ContextSnapshot, FocusedField};
use crate::error::{VoiceError, VoiceResult};
use crate::form::FormStore;
use crate::growth::ArrayGrowthResolver;
use crate::interpreter::UtteranceInterpreter;
use crate::llm::create_llm_client;
use crate::merge::{MergeApplier, MergeReport};
use crate::mode::{PendingConfirmation, TurnMode, TurnState};
use crate::normalize::UpdateNormalizer;
use crate::schema::{FieldSchemaRegistry, SchemaDescription};
use crate::transcription::{AudioBuffer, Transcriber, WhisperTranscriber};

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// Updates were merged into the form
    Applied {
        turn_id: Uuid,
        summary: String,
        report: MergeReport,
    },
    /// Bulk result held for review
    AwaitingConfirmation(PendingConfirmation),
    /// The oracle answered but nothing matched the form
    NoActionableData { turn_id: Uuid, summary: String },
    /// Stopped with no audio, or discarded during review
    Cancelled,
}

pub struct VoiceCommandEngine {
    registry: FieldSchemaRegistry,
    schema: SchemaDescription,
    interpreter: UtteranceInterpreter,
    transcriber: Option<Arc<dyn Transcriber>>,
    merger: MergeApplier,
    auto_apply: bool,
    state: TurnState,
}

impl VoiceCommandEngine {
    pub fn new(registry: FieldSchemaRegistry, interpreter: UtteranceInterpreter) -> Self {
        let schema = registry.describe();
        Self {
            registry,
            schema,
            interpreter,
            transcriber: None,
            merger: MergeApplier::new(),
            auto_apply: true,
            state: TurnState::Idle,
        }
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    /// With `false`, field-scoped turns are held for review like bulk ones;
    /// the focused field still steers the oracle
    pub fn with_auto_apply(mut self, enabled: bool) -> Self {
        self.auto_apply = enabled;
        self
    }

    /// Engine wired to the configured oracle and, when a key is set, Whisper
    pub fn from_config(config: &VoiceConfig, registry: FieldSchemaRegistry) -> Self {
        let interpreter = UtteranceInterpreter::new(create_llm_client(config))
            .with_timeout(config.interpreter_timeout());
        let engine = Self::new(registry, interpreter);
        match &config.transcription_api_key {
            Some(key) => engine.with_transcriber(Arc::new(WhisperTranscriber::new(
                key.clone(),
                &config.transcription_model,
            ))),
            None => engine,
        }
    }

    pub fn registry(&self) -> &FieldSchemaRegistry {
        &self.registry
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn status_line(&self) -> Option<String> {
        self.state.status_line()
    }

    /// Begin a turn; a focused field makes it field-scoped
    ///
    /// The form is snapshotted here, so the oracle and growth resolution see
    /// the form as it was when the user started speaking.
    pub fn start_recording<F: FormStore + ?Sized>(
        &mut self,
        focused: Option<FocusedField>,
        form: &F,
    ) -> VoiceResult<Uuid> {
        if !self.state.is_idle() {
            tracing::warn!(state = self.state.name(), "Rejected recording start");
            return Err(VoiceError::TurnInProgress {
                state: self.state.name(),
            });
        }

        if let Some(field) = &focused {
            if field.resolve(&self.registry).is_none() {
                tracing::warn!(field = %field.name, "Focused field is not in the form schema");
            }
        }

        let snapshot = ContextSnapshot::capture(form, &self.registry, focused.clone())?;
        let turn_id = Uuid::new_v4();
        let mode = TurnMode::from_focus(focused);
        tracing::info!(
            turn_id = %turn_id,
            field_scoped = mode.auto_applies(),
            "Voice turn started"
        );
        self.state = TurnState::Recording {
            turn_id,
            mode,
            snapshot,
            started_at: Utc::now(),
        };
        Ok(turn_id)
    }

    /// Stop recording and run the turn on the captured audio
    pub async fn stop_recording<F: FormStore + ?Sized>(
        &mut self,
        audio: AudioBuffer,
        form: &mut F,
    ) -> VoiceResult<TurnOutcome> {
        let (turn_id, mode, snapshot) = self.take_recording("stop recording")?;

        if audio.is_empty() {
            tracing::info!(turn_id = %turn_id, "No audio captured; turn cancelled");
            return Ok(TurnOutcome::Cancelled);
        }

        let Some(transcriber) = self.transcriber.clone() else {
            return Err(VoiceError::transcription("no transcriber configured"));
        };

        tracing::debug!(
            turn_id = %turn_id,
            model = transcriber.model_name(),
            bytes = audio.bytes.len(),
            "Transcribing turn audio"
        );
        let transcript = transcriber.transcribe(&audio).await.map_err(|e| {
            tracing::error!(turn_id = %turn_id, error = %e, "Transcription failed");
            VoiceError::transcription(e)
        })?;

        if transcript.is_blank() {
            tracing::info!(turn_id = %turn_id, "Transcript is empty; nothing to interpret");
            return Err(VoiceError::EmptyTranscript);
        }

        self.interpret_turn(turn_id, mode, snapshot, transcript.text, form)
            .await
    }

    /// Run the current turn on typed or externally transcribed text
    pub async fn submit_transcript<F: FormStore + ?Sized>(
        &mut self,
        transcript: &str,
        form: &mut F,
    ) -> VoiceResult<TurnOutcome> {
        let (turn_id, mode, snapshot) = self.take_recording("submit a transcript")?;
        self.interpret_turn(turn_id, mode, snapshot, transcript.to_string(), form)
            .await
    }

    /// Re-interpret an edited transcript while reviewing a bulk result
    ///
    /// The earlier update set is replaced, never merged. The form is
    /// snapshotted again, since the new interpretation starts now.
    pub async fn resubmit<F: FormStore + ?Sized>(
        &mut self,
        edited_transcript: &str,
        form: &mut F,
    ) -> VoiceResult<TurnOutcome> {
        let pending = self.take_pending("resubmit")?;
        tracing::info!(turn_id = %pending.turn_id, "Resubmitting edited transcript");
        let snapshot =
            ContextSnapshot::capture(&*form, &self.registry, pending.mode.focused().cloned())?;
        self.interpret_turn(
            pending.turn_id,
            pending.mode,
            snapshot,
            edited_transcript.to_string(),
            form,
        )
        .await
    }

    /// Commit the pending bulk result
    pub fn confirm<F: FormStore + ?Sized>(&mut self, form: &mut F) -> VoiceResult<TurnOutcome> {
        let pending = self.take_pending("confirm")?;
        let report = self.merger.apply(&pending.update_set, form)?;
        tracing::info!(turn_id = %pending.turn_id, applied = report.count, "Confirmed voice updates");
        Ok(TurnOutcome::Applied {
            turn_id: pending.turn_id,
            summary: pending.summary,
            report,
        })
    }

    /// Abandon whatever turn is in progress; a pending result is discarded unmerged
    pub fn cancel(&mut self) -> TurnOutcome {
        let previous = std::mem::take(&mut self.state);
        if let Some(turn_id) = previous.turn_id() {
            tracing::info!(turn_id = %turn_id, state = previous.name(), "Voice turn cancelled");
        }
        TurnOutcome::Cancelled
    }

    fn take_recording(
        &mut self,
        action: &'static str,
    ) -> VoiceResult<(Uuid, TurnMode, ContextSnapshot)> {
        match std::mem::take(&mut self.state) {
            TurnState::Recording {
                turn_id,
                mode,
                snapshot,
                ..
            } => Ok((turn_id, mode, snapshot)),
            other => {
                let state = other.name();
                self.state = other;
                Err(VoiceError::InvalidTransition { action, state })
            }
        }
    }

    fn take_pending(&mut self, action: &'static str) -> VoiceResult<PendingConfirmation> {
        match std::mem::take(&mut self.state) {
            TurnState::AwaitingConfirmation(pending) => Ok(pending),
            other => {
                let state = other.name();
                self.state = other;
                Err(VoiceError::InvalidTransition { action, state })
            }
        }
    }

    async fn interpret_turn<F: FormStore + ?Sized>(
        &mut self,
        turn_id: Uuid,
        mode: TurnMode,
        snapshot: ContextSnapshot,
        transcript: String,
        form: &mut F,
    ) -> VoiceResult<TurnOutcome> {
        self.state = TurnState::Interpreting {
            turn_id,
            mode: mode.clone(),
            started_at: Utc::now(),
        };
        let result = self
            .run_pipeline(turn_id, &mode, &snapshot, transcript, form)
            .await;
        match &result {
            Ok(TurnOutcome::AwaitingConfirmation(pending)) => {
                self.state = TurnState::AwaitingConfirmation(pending.clone());
            }
            Ok(_) => self.state = TurnState::Idle,
            Err(e) => {
                tracing::warn!(turn_id = %turn_id, error = %e, "Voice turn failed");
                self.state = TurnState::Idle;
            }
        }
        result
    }

    async fn run_pipeline<F: FormStore + ?Sized>(
        &self,
        turn_id: Uuid,
        mode: &TurnMode,
        snapshot: &ContextSnapshot,
        transcript: String,
        form: &mut F,
    ) -> VoiceResult<TurnOutcome> {
        let raw = self
            .interpreter
            .interpret(&transcript, &self.schema, snapshot)
            .await?;

        let normalization = UpdateNormalizer::new(&self.registry).normalize(raw);
        if !normalization.is_actionable() {
            tracing::info!(turn_id = %turn_id, "No actionable data in oracle response");
            return Ok(TurnOutcome::NoActionableData {
                turn_id,
                summary: normalization.summary,
            });
        }

        let update_set =
            ArrayGrowthResolver::new(&self.registry).resolve(normalization.updates, snapshot);

        if mode.auto_applies() && self.auto_apply {
            let report = self.merger.apply(&update_set, form)?;
            return Ok(TurnOutcome::Applied {
                turn_id,
                summary: normalization.summary,
                report,
            });
        }

        tracing::info!(
            turn_id = %turn_id,
            updates = update_set.len(),
            "Result awaiting confirmation"
        );
        Ok(TurnOutcome::AwaitingConfirmation(PendingConfirmation::new(
            turn_id,
            mode.clone(),
            transcript.trim().to_string(),
            normalization.summary,
            update_set,
            normalization.rejected,
            &self.registry,
        )))
    }
}
