//! Save/validate state machine.
//!
//! ```text
//! Idle ──Submit──▶ Validating ──Invalid──▶ IdleWithErrors
//!                      │
//!                    Valid
//!                      ▼
//!                   Saving ──Succeeded──▶ Idle
//!                      └────Failed─────▶ IdleWithError
//! ```
//!
//! The three idle states accept a new `Submit`; `Validating` and `Saving`
//! ignore it, which is what keeps the save button disabled while a request
//! is in flight.

use serde::Serialize;

use crate::error::CoreError;
use crate::validation::FieldError;

/// Shown when the backend gives no error message of its own.
pub const GENERIC_SAVE_ERROR: &str = "Failed to save settings";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SaveState {
    Idle,
    Validating,
    IdleWithErrors { errors: Vec<FieldError> },
    Saving,
    IdleWithError { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveEvent {
    Submit,
    Valid,
    Invalid(Vec<FieldError>),
    Succeeded,
    /// Backend or transport failure, with the backend's message if it sent one.
    Failed(Option<String>),
}

impl SaveState {
    pub fn is_idle(&self) -> bool {
        matches!(
            self,
            Self::Idle | Self::IdleWithErrors { .. } | Self::IdleWithError { .. }
        )
    }

    /// Whether the save control is enabled.
    pub fn accepts_submit(&self) -> bool {
        self.is_idle()
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Validating => "Validating",
            Self::IdleWithErrors { .. } => "IdleWithErrors",
            Self::Saving => "Saving",
            Self::IdleWithError { .. } => "IdleWithError",
        }
    }

    /// Compute the next state, or an error for a transition the table does
    /// not allow.
    pub fn transition(&self, event: SaveEvent) -> Result<SaveState, CoreError> {
        let next = match (self, event) {
            (s, SaveEvent::Submit) if s.is_idle() => SaveState::Validating,
            (SaveState::Validating, SaveEvent::Valid) => SaveState::Saving,
            (SaveState::Validating, SaveEvent::Invalid(errors)) => {
                SaveState::IdleWithErrors { errors }
            }
            (SaveState::Saving, SaveEvent::Succeeded) => SaveState::Idle,
            (SaveState::Saving, SaveEvent::Failed(message)) => SaveState::IdleWithError {
                message: message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| GENERIC_SAVE_ERROR.to_string()),
            },
            (state, event) => {
                return Err(CoreError::InvalidTransition(format!(
                    "{event:?} is not accepted in state {}",
                    state.name()
                )))
            }
        };
        Ok(next)
    }
}
