//! Command dispatch.
//!
//! A command mutates only the event it targets (or, for `CreateEvent`, the
//! event it allocates). Before it runs, that one `EventBook` and the id
//! allocator are copied into a [`Checkpoint`]; if the handler fails the
//! checkpoint is written back, so callers never observe a half-applied
//! command. The cost of a mutation is bounded by the size of its event,
//! not of the whole ledger.

use crate::arithmetic::checked_add;
use crate::catalog;
use crate::commands::{BallotEntry, Command, Outcome};
use crate::credits;
use crate::domain::{EventBook, EventId, LedgerState, ParticipantId};
use crate::error::LedgerError;
use crate::notifications::NotificationKind;
use crate::registry;
use crate::voting;

/// Everything a single command can change, as it was before the command.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    next_event_id: EventId,
    event_id: EventId,
    book: Option<EventBook>,
}

impl Checkpoint {
    pub fn capture(state: &LedgerState, command: &Command) -> Self {
        let event_id = command.event_id().unwrap_or(state.next_event_id);
        Self {
            next_event_id: state.next_event_id,
            event_id,
            book: state.events.get(&event_id).cloned(),
        }
    }

    /// The event the command touched.
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Put the captured event and allocator back.
    pub fn restore(self, state: &mut LedgerState) {
        state.next_event_id = self.next_event_id;
        match self.book {
            Some(book) => {
                state.events.insert(self.event_id, book);
            }
            None => {
                state.events.remove(&self.event_id);
            }
        }
    }
}

/// Apply `command` issued by `caller` to `state` in place.
///
/// On success returns the outcome, the notification and the checkpoint
/// that undoes the command. On failure `state` is left as it was.
pub fn apply_command(
    state: &mut LedgerState,
    caller: &ParticipantId,
    command: &Command,
) -> Result<(Outcome, NotificationKind, Checkpoint), LedgerError> {
    let checkpoint = Checkpoint::capture(state, command);
    match dispatch(state, caller, command) {
        Ok((outcome, kind)) => Ok((outcome, kind, checkpoint)),
        Err(err) => {
            checkpoint.restore(state);
            Err(err)
        }
    }
}

fn dispatch(
    state: &mut LedgerState,
    caller: &ParticipantId,
    command: &Command,
) -> Result<(Outcome, NotificationKind), LedgerError> {
    let applied = match command {
        Command::CreateEvent { name, access_code } => {
            let event_id = registry::create_event(state, caller, name, access_code)?;
            (
                Outcome::EventCreated { event_id },
                NotificationKind::EventCreated {
                    event_id,
                    name: name.clone(),
                    admin: caller.clone(),
                },
            )
        }
        Command::SetEventActive { event_id, active } => {
            registry::set_active(state, *event_id, caller, *active)?;
            (
                Outcome::EventActiveChanged {
                    event_id: *event_id,
                    active: *active,
                },
                NotificationKind::EventActiveChanged {
                    event_id: *event_id,
                    active: *active,
                },
            )
        }
        Command::InitializeCredits { event_id } => {
            let balance = credits::initialize(state, *event_id, caller)?;
            (
                Outcome::CreditsInitialized {
                    event_id: *event_id,
                    balance,
                },
                NotificationKind::CreditsInitialized {
                    event_id: *event_id,
                    participant: caller.clone(),
                    balance,
                },
            )
        }
        Command::SubmitProject {
            event_id,
            metadata_ref,
            access_code,
        } => {
            let project_id =
                catalog::submit(state, *event_id, caller, metadata_ref, access_code)?;
            (
                Outcome::ProjectSubmitted {
                    event_id: *event_id,
                    project_id,
                },
                NotificationKind::ProjectSubmitted {
                    event_id: *event_id,
                    project_id,
                    submitter: caller.clone(),
                    metadata_ref: metadata_ref.clone(),
                    project_count: project_id,
                },
            )
        }
        Command::CastVote {
            event_id,
            project_id,
            votes,
        } => {
            let receipt = voting::cast_vote(state, *event_id, caller, *project_id, *votes)?;
            (
                Outcome::VoteCast(receipt.clone()),
                NotificationKind::VoteCast {
                    participant: caller.clone(),
                    receipt,
                },
            )
        }
        Command::CastBallot { event_id, entries } => {
            apply_ballot(state, *event_id, caller, entries)?
        }
    };

    Ok(applied)
}

/// Entries apply in order, so repeated projects telescope like separate
/// casts would.
fn apply_ballot(
    state: &mut LedgerState,
    event_id: EventId,
    caller: &ParticipantId,
    entries: &[BallotEntry],
) -> Result<(Outcome, NotificationKind), LedgerError> {
    if entries.is_empty() {
        return Err(LedgerError::invalid("ballot must contain at least one entry"));
    }

    let mut receipts = Vec::with_capacity(entries.len());
    let mut total_charged = 0u64;
    for entry in entries {
        let receipt = voting::cast_vote(state, event_id, caller, entry.project_id, entry.votes)?;
        total_charged = checked_add(total_charged, receipt.credits_charged)?;
        receipts.push(receipt);
    }

    Ok((
        Outcome::BallotCast {
            event_id,
            receipts: receipts.clone(),
            total_charged,
        },
        NotificationKind::BallotCast {
            event_id,
            participant: caller.clone(),
            receipts,
            total_charged,
        },
    ))
}
