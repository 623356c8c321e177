//! Ledger facade.
//!
//! Owns the single authoritative `LedgerState` and composes the registry,
//! credit ledger, project catalog and vote engine into one total order of
//! operations. Each mutation:
//!   1. checks schema version and sequence (`last + 1`)
//!   2. runs the command in place behind a checkpoint of the one event it
//!      touches (`transitions`)
//!   3. re-checks invariants on that event (when enabled)
//!   4. bumps the sequence, appends a notification
//!
//! A failure at steps 1-2 leaves state, sequence and notifications as
//! they were. The most recent commit can be undone with
//! [`Ledger::revert_last`] until the next one lands.

use tracing::debug;

use crate::catalog;
use crate::commands::{BallotEntry, Command, CommandEnvelope, Outcome, SCHEMA_VERSION};
use crate::credits;
use crate::domain::{
    AccountView, EventId, EventView, LedgerState, ParticipantId, ProjectId, ProjectView,
    VoteQuote, VoteReceipt,
};
use crate::error::LedgerError;
use crate::hashing::canonical_hash;
use crate::invariants::validate_event_invariants;
use crate::notifications::Notification;
use crate::registry;
use crate::state::{create_initial_state, LedgerConfig};
use crate::transitions::{apply_command, Checkpoint};
use crate::voting;

pub struct Ledger {
    config: LedgerConfig,
    state: LedgerState,
    last_sequence: u64,
    notifications: Vec<Notification>,
    undo: Option<Undo>,
}

/// How to take back the latest commit.
struct Undo {
    sequence: u64,
    checkpoint: Checkpoint,
}

impl Ledger {
    /// Empty ledger.
    pub fn new(config: LedgerConfig) -> Self {
        let state = create_initial_state(&config);
        Self {
            config,
            state,
            last_sequence: 0,
            notifications: Vec::new(),
            undo: None,
        }
    }

    /// Resume from a previously captured state (e.g. a snapshot) whose last
    /// applied command was `last_sequence`. The caller vouches for the
    /// state's invariants.
    pub fn restore(config: LedgerConfig, state: LedgerState, last_sequence: u64) -> Self {
        Self {
            config,
            state,
            last_sequence,
            notifications: Vec::new(),
            undo: None,
        }
    }

    // ── Mutations ─────────────────────────────────────────────────

    /// Apply a journaled envelope. The sequence must be exactly
    /// `last_sequence() + 1`.
    pub fn apply(&mut self, envelope: &CommandEnvelope) -> Result<Outcome, LedgerError> {
        if envelope.schema_version != SCHEMA_VERSION {
            return Err(LedgerError::SchemaVersion {
                expected: SCHEMA_VERSION,
                got: envelope.schema_version,
            });
        }
        let expected = self.last_sequence + 1;
        if envelope.sequence != expected {
            return Err(LedgerError::SequenceViolation {
                expected,
                got: envelope.sequence,
            });
        }

        let (outcome, kind, checkpoint) =
            match apply_command(&mut self.state, &envelope.caller, &envelope.command) {
                Ok(applied) => applied,
                Err(err) => {
                    debug!(
                        sequence = envelope.sequence,
                        caller = %envelope.caller,
                        command = envelope.command.name(),
                        error = err.kind(),
                        "command rejected"
                    );
                    return Err(err);
                }
            };

        if self.config.check_invariants {
            validate_event_invariants(&self.state, checkpoint.event_id());
        }

        self.undo = Some(Undo {
            sequence: envelope.sequence,
            checkpoint,
        });
        self.last_sequence = envelope.sequence;
        self.notifications.push(Notification {
            sequence: envelope.sequence,
            actor: envelope.caller.clone(),
            kind,
        });
        Ok(outcome)
    }

    /// Take back the most recent commit: state, sequence and its
    /// notification return to what they were before it. Returns the
    /// reverted sequence, or `None` if there is nothing to revert (already
    /// reverted, or nothing applied since creation or restore).
    pub fn revert_last(&mut self) -> Option<u64> {
        let undo = self.undo.take()?;
        undo.checkpoint.restore(&mut self.state);
        self.last_sequence = undo.sequence - 1;
        if self.notifications.last().map(|n| n.sequence) == Some(undo.sequence) {
            self.notifications.pop();
        }
        debug!(sequence = undo.sequence, "commit reverted");
        Some(undo.sequence)
    }

    /// Apply `command` on behalf of `caller` at the next sequence.
    pub fn execute(
        &mut self,
        caller: &ParticipantId,
        command: Command,
    ) -> Result<Outcome, LedgerError> {
        let envelope = self.envelope(caller, command);
        self.apply(&envelope)
    }

    /// Bind `command` to the next free sequence without applying it.
    pub fn envelope(&self, caller: &ParticipantId, command: Command) -> CommandEnvelope {
        CommandEnvelope::new(self.last_sequence + 1, caller.clone(), command)
    }

    pub fn create_event(
        &mut self,
        caller: &ParticipantId,
        name: &str,
        access_code: &str,
    ) -> Result<EventId, LedgerError> {
        let command = Command::CreateEvent {
            name: name.to_string(),
            access_code: access_code.to_string(),
        };
        match self.execute(caller, command)? {
            Outcome::EventCreated { event_id } => Ok(event_id),
            other => unreachable!("create_event produced {:?}", other),
        }
    }

    pub fn set_event_active(
        &mut self,
        caller: &ParticipantId,
        event_id: EventId,
        active: bool,
    ) -> Result<(), LedgerError> {
        self.execute(caller, Command::SetEventActive { event_id, active })
            .map(|_| ())
    }

    /// Returns the granted balance.
    pub fn initialize_credits(
        &mut self,
        caller: &ParticipantId,
        event_id: EventId,
    ) -> Result<u64, LedgerError> {
        match self.execute(caller, Command::InitializeCredits { event_id })? {
            Outcome::CreditsInitialized { balance, .. } => Ok(balance),
            other => unreachable!("initialize_credits produced {:?}", other),
        }
    }

    pub fn submit_project(
        &mut self,
        caller: &ParticipantId,
        event_id: EventId,
        metadata_ref: &str,
        access_code: &str,
    ) -> Result<ProjectId, LedgerError> {
        let command = Command::SubmitProject {
            event_id,
            metadata_ref: metadata_ref.to_string(),
            access_code: access_code.to_string(),
        };
        match self.execute(caller, command)? {
            Outcome::ProjectSubmitted { project_id, .. } => Ok(project_id),
            other => unreachable!("submit_project produced {:?}", other),
        }
    }

    /// Add `votes` (a delta, not a target) to the caller's tally on
    /// `project_id`.
    pub fn cast_vote(
        &mut self,
        caller: &ParticipantId,
        event_id: EventId,
        project_id: ProjectId,
        votes: i64,
    ) -> Result<VoteReceipt, LedgerError> {
        let command = Command::CastVote {
            event_id,
            project_id,
            votes,
        };
        match self.execute(caller, command)? {
            Outcome::VoteCast(receipt) => Ok(receipt),
            other => unreachable!("cast_vote produced {:?}", other),
        }
    }

    /// Apply several casts atomically. Returns one receipt per entry.
    pub fn cast_ballot(
        &mut self,
        caller: &ParticipantId,
        event_id: EventId,
        entries: Vec<BallotEntry>,
    ) -> Result<Vec<VoteReceipt>, LedgerError> {
        match self.execute(caller, Command::CastBallot { event_id, entries })? {
            Outcome::BallotCast { receipts, .. } => Ok(receipts),
            other => unreachable!("cast_ballot produced {:?}", other),
        }
    }

    // ── Reads ─────────────────────────────────────────────────────

    pub fn get_event(&self, event_id: EventId) -> Result<EventView, LedgerError> {
        registry::get_event(&self.state, event_id)
    }

    pub fn list_events(&self) -> Vec<EventView> {
        registry::list_events(&self.state)
    }

    pub fn constant_allowance(&self) -> u64 {
        self.state.initial_allowance
    }

    pub fn participant_account(&self, event_id: EventId, participant: &ParticipantId) -> AccountView {
        credits::get_balance(&self.state, event_id, participant)
    }

    pub fn project_vote_power(
        &self,
        event_id: EventId,
        project_id: ProjectId,
    ) -> Result<u64, LedgerError> {
        voting::project_vote_power(&self.state, event_id, project_id)
    }

    pub fn participant_votes(
        &self,
        event_id: EventId,
        participant: &ParticipantId,
        project_id: ProjectId,
    ) -> Result<u64, LedgerError> {
        voting::participant_votes(&self.state, event_id, participant, project_id)
    }

    pub fn event_project_count(&self, event_id: EventId) -> Result<u64, LedgerError> {
        self.get_event(event_id).map(|e| e.project_count)
    }

    pub fn get_project(
        &self,
        event_id: EventId,
        project_id: ProjectId,
    ) -> Result<ProjectView, LedgerError> {
        catalog::get(&self.state, event_id, project_id)
    }

    pub fn list_projects(&self, event_id: EventId) -> Result<Vec<ProjectView>, LedgerError> {
        catalog::list(&self.state, event_id)
    }

    pub fn quote_vote(
        &self,
        event_id: EventId,
        participant: &ParticipantId,
        project_id: ProjectId,
        votes: i64,
    ) -> Result<VoteQuote, LedgerError> {
        voting::quote_vote(&self.state, event_id, participant, project_id, votes)
    }

    pub fn max_additional_votes(
        &self,
        event_id: EventId,
        participant: &ParticipantId,
        project_id: ProjectId,
    ) -> Result<u64, LedgerError> {
        voting::max_additional(&self.state, event_id, participant, project_id)
    }

    // ── Ledger-level accessors ────────────────────────────────────

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn canonical_hash(&self) -> String {
        canonical_hash(&self.state)
    }

    /// Notifications emitted since this ledger was created or restored and
    /// not yet drained.
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Drop retained notifications up to and including `sequence`, e.g.
    /// once they have been persisted elsewhere, and return them.
    pub fn drain_notifications_through(&mut self, sequence: u64) -> Vec<Notification> {
        let end = self
            .notifications
            .partition_point(|n| n.sequence <= sequence);
        self.notifications.drain(..end).collect()
    }

    /// Notifications with a sequence strictly greater than `sequence`.
    pub fn notifications_since(&self, sequence: u64) -> &[Notification] {
        let start = self
            .notifications
            .partition_point(|n| n.sequence <= sequence);
        &self.notifications[start..]
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}
