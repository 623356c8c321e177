//! Append-only notification records.
//!
//! One record per committed mutation: what changed, by whom, and the
//! resulting quantities. Read-side aggregators build their projections
//! from this stream alone.

use serde::{Deserialize, Serialize};

use crate::domain::{EventId, ParticipantId, ProjectId, VoteReceipt};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Sequence of the command that produced this record.
    pub sequence: u64,
    pub actor: ParticipantId,
    pub kind: NotificationKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationKind {
    EventCreated {
        event_id: EventId,
        name: String,
        admin: ParticipantId,
    },
    EventActiveChanged {
        event_id: EventId,
        active: bool,
    },
    CreditsInitialized {
        event_id: EventId,
        participant: ParticipantId,
        balance: u64,
    },
    ProjectSubmitted {
        event_id: EventId,
        project_id: ProjectId,
        submitter: ParticipantId,
        metadata_ref: String,
        project_count: u64,
    },
    VoteCast {
        participant: ParticipantId,
        receipt: VoteReceipt,
    },
    BallotCast {
        event_id: EventId,
        participant: ParticipantId,
        receipts: Vec<VoteReceipt>,
        total_charged: u64,
    },
}

impl NotificationKind {
    pub fn event_id(&self) -> EventId {
        match self {
            NotificationKind::EventCreated { event_id, .. }
            | NotificationKind::EventActiveChanged { event_id, .. }
            | NotificationKind::CreditsInitialized { event_id, .. }
            | NotificationKind::ProjectSubmitted { event_id, .. }
            | NotificationKind::BallotCast { event_id, .. } => *event_id,
            NotificationKind::VoteCast { receipt, .. } => receipt.event_id,
        }
    }
}
