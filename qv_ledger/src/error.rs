//! Ledger error kinds.
//!
//! Every failing operation returns exactly one of these and leaves the
//! ledger state untouched.

use thiserror::Error;

use crate::domain::{EventId, ParticipantId, ProjectId};

/// Typed failure of a ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Unknown event.
    #[error("event {event_id} not found")]
    NotFound { event_id: EventId },

    /// Caller lacks the admin role, or the access code did not match.
    #[error("unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// Event exists but no longer accepts activity.
    #[error("event {event_id} is inactive")]
    Inactive { event_id: EventId },

    #[error("participant {participant} already initialized credits for event {event_id}")]
    AlreadyInitialized {
        event_id: EventId,
        participant: ParticipantId,
    },

    #[error("participant {participant} has not initialized credits for event {event_id}")]
    NotInitialized {
        event_id: EventId,
        participant: ParticipantId,
    },

    #[error("insufficient credits: required {required}, available {available}")]
    InsufficientCredits { required: u64, available: u64 },

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("metadata reference must not be empty")]
    EmptyMetadata,

    #[error("project {project_id} does not exist in event {event_id}")]
    InvalidProjectId {
        event_id: EventId,
        project_id: ProjectId,
    },

    /// Journaled command arrived out of order.
    #[error("sequence violation: expected {expected}, got {got}")]
    SequenceViolation { expected: u64, got: u64 },

    #[error("schema version mismatch: expected {expected}, got {got}")]
    SchemaVersion { expected: u32, got: u32 },
}

impl LedgerError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        LedgerError::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub(crate) fn unauthorized(reason: impl Into<String>) -> Self {
        LedgerError::Unauthorized {
            reason: reason.into(),
        }
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::NotFound { .. } => "not_found",
            LedgerError::Unauthorized { .. } => "unauthorized",
            LedgerError::Inactive { .. } => "inactive",
            LedgerError::AlreadyInitialized { .. } => "already_initialized",
            LedgerError::NotInitialized { .. } => "not_initialized",
            LedgerError::InsufficientCredits { .. } => "insufficient_credits",
            LedgerError::InvalidArgument { .. } => "invalid_argument",
            LedgerError::EmptyMetadata => "empty_metadata",
            LedgerError::InvalidProjectId { .. } => "invalid_project_id",
            LedgerError::SequenceViolation { .. } => "sequence_violation",
            LedgerError::SchemaVersion { .. } => "schema_version",
        }
    }
}
