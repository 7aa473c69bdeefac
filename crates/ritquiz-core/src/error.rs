//! Error types for item bank loading and session control.
//!
//! `BankError` covers load-time data problems; `SessionError` covers
//! everything that can go wrong while a session is being started, driven or
//! finalized. Both are typed so callers can tell recoverable input mistakes
//! from fatal conditions without string matching.

use thiserror::Error;

use crate::session::SessionPhase;

/// A problem with a single start-of-session input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The input field at fault (e.g. "username").
    pub field: &'static str,
    /// Warning message.
    pub message: String,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors raised while assembling an item bank from its source tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BankError {
    /// A band string did not parse into integers with `low < high`.
    #[error("item {item_id}: malformed RIT band '{raw}': {reason}")]
    MalformedBand {
        item_id: String,
        raw: String,
        reason: String,
    },

    /// The answer-choice table has no (non-empty) entry for the item.
    #[error("item {0}: no answer choices")]
    MissingChoices(String),

    /// The correctness table has no entry for the item.
    #[error("item {0}: no correct answer key")]
    MissingKey(String),

    /// The keyed answer is not one of the item's choices.
    #[error("item {item_id}: correct answer '{key}' is not among its choices")]
    KeyNotInChoices { item_id: String, key: String },

    /// Two question rows share an id.
    #[error("duplicate item id: {0}")]
    DuplicateId(String),

    /// The question text is blank.
    #[error("item {0}: question text is empty")]
    EmptyQuestion(String),

    /// No valid items remain.
    #[error("item bank contains no valid items")]
    EmptyBank,

    /// Some rows were rejected and a partial bank was not accepted.
    #[error("{} item(s) rejected at load; refusing a partial item bank", .rejected.len())]
    PartialBank { rejected: Vec<BankError> },
}

impl BankError {
    /// The id of the offending item, if the error concerns a single item.
    pub fn item_id(&self) -> Option<&str> {
        match self {
            BankError::MalformedBand { item_id, .. }
            | BankError::KeyNotInChoices { item_id, .. } => Some(item_id.as_str()),
            BankError::MissingChoices(id)
            | BankError::MissingKey(id)
            | BankError::DuplicateId(id)
            | BankError::EmptyQuestion(id) => Some(id.as_str()),
            BankError::EmptyBank | BankError::PartialBank { .. } => None,
        }
    }
}

/// Errors that can occur while running an adaptive session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Start inputs are missing or invalid. The session stays unstarted.
    #[error("cannot start session: {}", join_warnings(.0))]
    Validation(Vec<ValidationWarning>),

    /// The bank has no item in any of the selected strands.
    #[error("no items available for strands: {}", .strands.join(", "))]
    NoMatchingItems { strands: Vec<String> },

    /// An event arrived in a phase that does not accept it.
    #[error("'{event}' is not valid while the session is {phase}")]
    InvalidTransition {
        event: &'static str,
        phase: SessionPhase,
    },

    /// The result sink rejected the session record.
    #[error("failed to persist session record: {0}")]
    PersistenceFailure(String),

    /// The session was abandoned before it finished; nothing was persisted.
    #[error("session abandoned after {administered} item(s)")]
    Abandoned { administered: usize },
}

impl SessionError {
    /// Returns `true` if the caller can correct its input and try again
    /// without discarding the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SessionError::Validation(_) | SessionError::PersistenceFailure(_)
        )
    }

    /// The validation warnings, if this is a validation error.
    pub fn warnings(&self) -> &[ValidationWarning] {
        match self {
            SessionError::Validation(w) => w,
            _ => &[],
        }
    }
}

fn join_warnings(warnings: &[ValidationWarning]) -> String {
    warnings
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
