//! Voice command resolution engine
//!
//! Turns a spoken utterance into validated updates on a structured
//! business-document form. A turn is recorded, transcribed, interpreted by an
//! LLM oracle against the form schema and a snapshot of the form, filtered to
//! known paths, and merged, growing repeating sections as needed.
//!
//! ```text
//! audio ─► Transcriber ─► UtteranceInterpreter ─► UpdateNormalizer
//!                                                      │
//!            FormStore ◄── MergeApplier ◄── ArrayGrowthResolver
//! ```
//!
//! With a focused field the result is applied immediately; without one it
//! waits in [`TurnState::AwaitingConfirmation`] until confirmed.

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod form;
pub mod growth;
pub mod interpreter;
pub mod llm;
pub mod merge;
pub mod mode;
pub mod normalize;
pub mod schema;
pub mod transcription;

pub use config::VoiceConfig;
pub use context::{ContextSnapshot, FocusedField};
pub use engine::{TurnOutcome, VoiceCommandEngine};
pub use error::{ConfigError, FormError, PathError, VoiceError, VoiceResult};
pub use form::{FormStore, FormTree, SharedForm};
pub use growth::{ArrayGrowthResolver, GrowthPlan, SectionGrowth, UpdateSet};
pub use interpreter::{RawInterpretationResult, UtteranceInterpreter};
pub use llm::{create_llm_client, AgentBackend, LlmClient};
pub use merge::{MergeApplier, MergeReport};
pub use mode::{PendingChange, PendingConfirmation, TurnMode, TurnState};
pub use normalize::{FieldUpdate, Normalization, RejectedPath, UpdateNormalizer};
pub use schema::{FieldPath, FieldSchemaRegistry, SchemaDescription, ValueKind};
pub use transcription::{AudioBuffer, Transcript, Transcriber, WhisperTranscriber};
