//! Error types for the voice command engine
//!
//! Engine-boundary errors use thiserror. The HTTP client layers return
//! `anyhow::Result` and are folded into [`VoiceError`] where a turn fails.

use thiserror::Error;

/// Errors that abort a voice turn
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("No speech captured: transcript is empty")]
    EmptyTranscript,

    #[error("Transcription failed: {0}")]
    TranscriptionFailure(String),

    #[error("Interpretation failed: {0}")]
    InterpretationFailure(String),

    #[error("A voice turn is already in progress ({state})")]
    TurnInProgress { state: &'static str },

    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("Form error: {0}")]
    Form(#[from] FormError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl VoiceError {
    /// Create an interpretation failure from any displayable reason
    pub fn interpretation(reason: impl std::fmt::Display) -> Self {
        Self::InterpretationFailure(reason.to_string())
    }

    /// Create a transcription failure from any displayable reason
    pub fn transcription(reason: impl std::fmt::Display) -> Self {
        Self::TranscriptionFailure(reason.to_string())
    }

    /// Whether this error ends the turn (every variant except state misuse does)
    pub fn is_fatal_for_turn(&self) -> bool {
        !matches!(
            self,
            VoiceError::TurnInProgress { .. } | VoiceError::InvalidTransition { .. }
        )
    }
}

/// Field path parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Empty field path")]
    Empty,

    #[error("Unknown field path '{path}'")]
    UnknownPath { path: String },

    #[error("Invalid row index '{index}' in '{path}'")]
    InvalidIndex { path: String, index: String },

    #[error("Row index {index} in '{path}' exceeds the {max_rows}-row limit")]
    IndexOutOfRange {
        path: String,
        index: usize,
        max_rows: usize,
    },

    #[error("Unknown attribute '{attribute}' for section '{section}'")]
    UnknownAttribute { section: String, attribute: String },

    #[error("Malformed indexed path '{path}': expected <section>.<index>.<attribute>")]
    Malformed { path: String },
}

/// Form tree access errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Section '{section}' is not a list")]
    NotAList { section: String },

    #[error("Row {index} does not exist in section '{section}' (length {length})")]
    RowOutOfBounds {
        section: String,
        index: usize,
        length: usize,
    },

    #[error("Path '{path}' crosses a non-object value")]
    NotAnObject { path: String },

    #[error("Unknown repeating section '{section}'")]
    UnknownSection { section: String },

    #[error("Form lock poisoned")]
    Poisoned,
}

/// Configuration loading errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    MissingEnv(&'static str),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Result type for engine operations
pub type VoiceResult<T> = Result<T, VoiceError>;
