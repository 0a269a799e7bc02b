//! Turn modes and the voice turn state machine
//!
//! ```text
//! Idle -> Recording -> Interpreting -> Idle                  (field-scoped, auto-applied)
//!                                   -> AwaitingConfirmation  (bulk)
//! AwaitingConfirmation -> Interpreting   (edited transcript resubmitted)
//! AwaitingConfirmation -> Idle           (confirmed or discarded)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::{ContextSnapshot, FocusedField};
use crate::growth::UpdateSet;
use crate::normalize::RejectedPath;
use crate::schema::{FieldPath, FieldSchemaRegistry};

/// How a turn's result reaches the form, fixed when recording starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TurnMode {
    /// A field had focus; results are applied without review
    FieldScoped { focused: FocusedField },
    /// No focus; results wait for the user to confirm
    Bulk,
}

impl TurnMode {
    pub fn from_focus(focused: Option<FocusedField>) -> Self {
        match focused {
            Some(focused) => TurnMode::FieldScoped { focused },
            None => TurnMode::Bulk,
        }
    }

    pub fn auto_applies(&self) -> bool {
        matches!(self, TurnMode::FieldScoped { .. })
    }

    pub fn focused(&self) -> Option<&FocusedField> {
        match self {
            TurnMode::FieldScoped { focused } => Some(focused),
            TurnMode::Bulk => None,
        }
    }

    pub fn recording_status(&self) -> String {
        match self {
            TurnMode::FieldScoped { focused } => {
                format!("Recording for: {}", focused.display_label)
            }
            TurnMode::Bulk => "Listening for multiple fields".to_string(),
        }
    }
}

/// One proposed change, as shown for review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChange {
    pub path: FieldPath,
    pub label: String,
    pub value: String,
    pub append: bool,
}

/// A turn's result, held until confirmed or discarded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingConfirmation {
    pub turn_id: Uuid,
    /// Mode the turn started in; kept for resubmission
    pub mode: TurnMode,
    /// Transcript the update set came from; editable before resubmitting
    pub transcript: String,
    pub summary: String,
    pub update_set: UpdateSet,
    pub changes: Vec<PendingChange>,
    pub rejected: Vec<RejectedPath>,
    pub interpreted_at: DateTime<Utc>,
}

impl PendingConfirmation {
    pub fn new(
        turn_id: Uuid,
        mode: TurnMode,
        transcript: String,
        summary: String,
        update_set: UpdateSet,
        rejected: Vec<RejectedPath>,
        registry: &FieldSchemaRegistry,
    ) -> Self {
        let changes = update_set
            .updates
            .iter()
            .map(|u| PendingChange {
                path: u.path.clone(),
                label: registry
                    .label_for(&u.path)
                    .unwrap_or_else(|| u.path.to_string()),
                value: u.value.clone(),
                append: u.append,
            })
            .collect();
        Self {
            turn_id,
            mode,
            transcript,
            summary,
            update_set,
            changes,
            rejected,
            interpreted_at: Utc::now(),
        }
    }
}

/// Where the current voice turn stands
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TurnState {
    /// No turn in progress
    #[default]
    Idle,

    Recording {
        turn_id: Uuid,
        mode: TurnMode,
        /// Form as it was when recording started
        snapshot: ContextSnapshot,
        started_at: DateTime<Utc>,
    },

    /// Waiting on the oracle
    Interpreting {
        turn_id: Uuid,
        mode: TurnMode,
        started_at: DateTime<Utc>,
    },

    /// Result waiting for review
    AwaitingConfirmation(PendingConfirmation),
}

impl TurnState {
    pub fn is_idle(&self) -> bool {
        matches!(self, TurnState::Idle)
    }

    pub fn is_awaiting_confirmation(&self) -> bool {
        matches!(self, TurnState::AwaitingConfirmation(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            TurnState::Idle => "idle",
            TurnState::Recording { .. } => "recording",
            TurnState::Interpreting { .. } => "interpreting",
            TurnState::AwaitingConfirmation(_) => "awaiting confirmation",
        }
    }

    pub fn turn_id(&self) -> Option<Uuid> {
        match self {
            TurnState::Idle => None,
            TurnState::Recording { turn_id, .. } | TurnState::Interpreting { turn_id, .. } => {
                Some(*turn_id)
            }
            TurnState::AwaitingConfirmation(pending) => Some(pending.turn_id),
        }
    }

    pub fn pending(&self) -> Option<&PendingConfirmation> {
        match self {
            TurnState::AwaitingConfirmation(pending) => Some(pending),
            _ => None,
        }
    }

    /// Short line for the voice control; none while idle
    pub fn status_line(&self) -> Option<String> {
        match self {
            TurnState::Idle => None,
            TurnState::Recording { mode, .. } => Some(mode.recording_status()),
            TurnState::Interpreting { .. } => Some("Interpreting…".to_string()),
            TurnState::AwaitingConfirmation(_) => Some("Review changes".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FormTree;
    use crate::normalize::FieldUpdate;

    #[test]
    fn test_mode_from_focus() {
        let focused = FocusedField::new("clientDetails.email", "email", "Client email");
        let mode = TurnMode::from_focus(Some(focused.clone()));
        assert!(mode.auto_applies());
        assert_eq!(mode.focused(), Some(&focused));
        assert!(!TurnMode::from_focus(None).auto_applies());
    }

    #[test]
    fn test_status_lines() {
        let recording = |mode| TurnState::Recording {
            turn_id: Uuid::new_v4(),
            mode,
            snapshot: ContextSnapshot::capture(
                &FormTree::new(),
                &FieldSchemaRegistry::business_document(),
                None,
            )
            .unwrap(),
            started_at: Utc::now(),
        };
        let focused = FocusedField::new("documentDetails.dueDate", "date", "Due date");

        assert_eq!(TurnState::Idle.status_line(), None);
        assert_eq!(
            recording(TurnMode::from_focus(Some(focused))).status_line().as_deref(),
            Some("Recording for: Due date")
        );
        assert_eq!(
            recording(TurnMode::Bulk).status_line().as_deref(),
            Some("Listening for multiple fields")
        );
    }

    #[test]
    fn test_pending_changes_carry_labels() {
        let registry = FieldSchemaRegistry::business_document();
        let update_set = UpdateSet {
            updates: vec![FieldUpdate {
                path: FieldPath::indexed("items", 1, "rate"),
                value: "5000".to_string(),
                append: false,
            }],
            ..Default::default()
        };
        let pending = PendingConfirmation::new(
            Uuid::new_v4(),
            TurnMode::Bulk,
            "add another item, rate five thousand".to_string(),
            "Added an item".to_string(),
            update_set,
            Vec::new(),
            &registry,
        );
        assert_eq!(pending.changes[0].label, "Line items #2: Rate");
    }

    #[test]
    fn test_state_serialization_is_tagged() {
        let json = serde_json::to_value(TurnState::Idle).unwrap();
        assert_eq!(json["state"], "idle");

        let state = TurnState::Interpreting {
            turn_id: Uuid::new_v4(),
            mode: TurnMode::Bulk,
            started_at: Utc::now(),
        };
        let round: TurnState = serde_json::from_value(serde_json::to_value(&state).unwrap()).unwrap();
        assert_eq!(round, state);
    }
}
