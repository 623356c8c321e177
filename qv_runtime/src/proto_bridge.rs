//! Proto ↔ kernel conversion bridge.
//!
//! Converts between the journal's protobuf frames (proto_types.rs) and
//! the kernel's `CommandEnvelope`. Journaled envelopes keep the schema
//! version they were written with; the kernel decides whether to accept it.

use thiserror::Error;

use qv_ledger::commands::BallotEntry;
use qv_ledger::{Command, CommandEnvelope, ParticipantId};

use crate::proto_types::*;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("envelope {sequence} carries no command")]
    MissingCommand { sequence: u64 },
    #[error("envelope {sequence} carries an empty command")]
    MissingKind { sequence: u64 },
}

/// Convert a journal frame to the kernel's envelope.
pub fn proto_to_kernel(proto: &ProtoCommandEnvelope) -> Result<CommandEnvelope, BridgeError> {
    let sequence = proto.sequence;
    let kind = proto
        .command
        .as_ref()
        .ok_or(BridgeError::MissingCommand { sequence })?
        .kind
        .as_ref()
        .ok_or(BridgeError::MissingKind { sequence })?;

    let command = match kind {
        CommandKind::CreateEvent(c) => Command::CreateEvent {
            name: c.name.clone(),
            access_code: c.access_code.clone(),
        },
        CommandKind::SetEventActive(c) => Command::SetEventActive {
            event_id: c.event_id,
            active: c.active,
        },
        CommandKind::InitializeCredits(c) => Command::InitializeCredits {
            event_id: c.event_id,
        },
        CommandKind::SubmitProject(c) => Command::SubmitProject {
            event_id: c.event_id,
            metadata_ref: c.metadata_ref.clone(),
            access_code: c.access_code.clone(),
        },
        CommandKind::CastVote(c) => Command::CastVote {
            event_id: c.event_id,
            project_id: c.project_id,
            votes: c.votes,
        },
        CommandKind::CastBallot(c) => Command::CastBallot {
            event_id: c.event_id,
            entries: c
                .entries
                .iter()
                .map(|line| BallotEntry {
                    project_id: line.project_id,
                    votes: line.votes,
                })
                .collect(),
        },
    };

    Ok(CommandEnvelope {
        sequence,
        caller: ParticipantId::new(proto.caller.clone()),
        command,
        schema_version: proto.schema_version,
    })
}

/// Convert a kernel envelope to a journal frame.
pub fn kernel_to_proto(kernel: &CommandEnvelope) -> ProtoCommandEnvelope {
    let kind = match &kernel.command {
        Command::CreateEvent { name, access_code } => CommandKind::CreateEvent(CreateEvent {
            name: name.clone(),
            access_code: access_code.clone(),
        }),
        Command::SetEventActive { event_id, active } => {
            CommandKind::SetEventActive(SetEventActive {
                event_id: *event_id,
                active: *active,
            })
        }
        Command::InitializeCredits { event_id } => {
            CommandKind::InitializeCredits(InitializeCredits {
                event_id: *event_id,
            })
        }
        Command::SubmitProject {
            event_id,
            metadata_ref,
            access_code,
        } => CommandKind::SubmitProject(SubmitProject {
            event_id: *event_id,
            metadata_ref: metadata_ref.clone(),
            access_code: access_code.clone(),
        }),
        Command::CastVote {
            event_id,
            project_id,
            votes,
        } => CommandKind::CastVote(CastVote {
            event_id: *event_id,
            project_id: *project_id,
            votes: *votes,
        }),
        Command::CastBallot { event_id, entries } => CommandKind::CastBallot(CastBallot {
            event_id: *event_id,
            entries: entries
                .iter()
                .map(|e| BallotLine {
                    project_id: e.project_id,
                    votes: e.votes,
                })
                .collect(),
        }),
    };

    ProtoCommandEnvelope {
        sequence: kernel.sequence,
        caller: kernel.caller.as_str().to_string(),
        schema_version: kernel.schema_version,
        command: Some(ProtoCommand { kind: Some(kind) }),
    }
}
