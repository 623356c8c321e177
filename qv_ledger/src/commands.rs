//! Ledger commands.
//!
//! A command is pure data: the intent of one mutating call plus its
//! arguments. The caller identity travels in the envelope. Accepted
//! envelopes form the journal the runtime replays.

use serde::{Deserialize, Serialize};

use crate::domain::{EventId, ParticipantId, ProjectId, VoteReceipt};

/// Schema version for v1 commands. Envelopes with any other version are
/// rejected by the ledger.
pub const SCHEMA_VERSION: u32 = 1;

/// One `(project, increment)` line of a ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotEntry {
    pub project_id: ProjectId,
    pub votes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    CreateEvent {
        name: String,
        access_code: String,
    },
    SetEventActive {
        event_id: EventId,
        active: bool,
    },
    InitializeCredits {
        event_id: EventId,
    },
    SubmitProject {
        event_id: EventId,
        metadata_ref: String,
        access_code: String,
    },
    CastVote {
        event_id: EventId,
        project_id: ProjectId,
        votes: i64,
    },
    /// Several casts in one event, committed together or not at all.
    CastBallot {
        event_id: EventId,
        entries: Vec<BallotEntry>,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateEvent { .. } => "create_event",
            Command::SetEventActive { .. } => "set_event_active",
            Command::InitializeCredits { .. } => "initialize_credits",
            Command::SubmitProject { .. } => "submit_project",
            Command::CastVote { .. } => "cast_vote",
            Command::CastBallot { .. } => "cast_ballot",
        }
    }

    /// The existing event this command targets. `None` for `CreateEvent`.
    pub fn event_id(&self) -> Option<EventId> {
        match self {
            Command::CreateEvent { .. } => None,
            Command::SetEventActive { event_id, .. }
            | Command::InitializeCredits { event_id }
            | Command::SubmitProject { event_id, .. }
            | Command::CastVote { event_id, .. }
            | Command::CastBallot { event_id, .. } => Some(*event_id),
        }
    }
}

/// A command bound to its position in the total order and its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub sequence: u64,
    pub caller: ParticipantId,
    pub command: Command,
    pub schema_version: u32,
}

impl CommandEnvelope {
    pub fn new(sequence: u64, caller: ParticipantId, command: Command) -> Self {
        Self {
            sequence,
            caller,
            command,
            schema_version: SCHEMA_VERSION,
        }
    }
}

/// What a committed command produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    EventCreated {
        event_id: EventId,
    },
    EventActiveChanged {
        event_id: EventId,
        active: bool,
    },
    CreditsInitialized {
        event_id: EventId,
        balance: u64,
    },
    ProjectSubmitted {
        event_id: EventId,
        project_id: ProjectId,
    },
    VoteCast(VoteReceipt),
    BallotCast {
        event_id: EventId,
        receipts: Vec<VoteReceipt>,
        total_charged: u64,
    },
}
