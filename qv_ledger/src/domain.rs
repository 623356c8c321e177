//! Core ledger types.
//!
//! Pure data. Mutation lives in the registry, credits, catalog and
//! voting modules; composition lives in the ledger facade.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::access_code::AccessDigest;

/// Event identifier. Assigned from 1, strictly increasing, never reused.
pub type EventId = u64;

/// Project identifier. Dense from 1 within its event.
pub type ProjectId = u64;

/// Participant identity as supplied by the host environment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ParticipantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Stored records ─────────────────────────────────────────────────

/// An isolated voting campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub admin: ParticipantId,
    pub access_digest: AccessDigest,
    pub active: bool,
    pub project_count: u64,
}

/// Per (event, participant) credit balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreditAccount {
    pub balance: u64,
    pub initialized: bool,
}

/// A submitted entry. `metadata_ref` is opaque to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Project {
    pub id: ProjectId,
    pub submitter: ParticipantId,
    pub metadata_ref: String,
    pub vote_power: u64,
}

/// Everything recorded under one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventBook {
    pub event: Event,
    pub accounts: BTreeMap<ParticipantId, CreditAccount>,
    pub projects: BTreeMap<ProjectId, Project>,
    /// participant -> project -> cumulative votes
    pub votes: BTreeMap<ParticipantId, BTreeMap<ProjectId, u64>>,
}

impl EventBook {
    pub fn new(event: Event) -> Self {
        Self {
            event,
            accounts: BTreeMap::new(),
            projects: BTreeMap::new(),
            votes: BTreeMap::new(),
        }
    }

    /// Cumulative votes `participant` has cast on `project_id` (0 if none).
    pub fn votes_of(&self, participant: &ParticipantId, project_id: ProjectId) -> u64 {
        self.votes
            .get(participant)
            .and_then(|per_project| per_project.get(&project_id))
            .copied()
            .unwrap_or(0)
    }
}

/// Complete authoritative ledger state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerState {
    /// Credits granted on initialization. Fixed for the ledger's lifetime.
    pub initial_allowance: u64,
    /// Identifier the next created event receives.
    pub next_event_id: EventId,
    pub events: BTreeMap<EventId, EventBook>,
}

// ── Read views ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventView {
    pub id: EventId,
    pub name: String,
    pub admin: ParticipantId,
    pub active: bool,
    pub project_count: u64,
}

impl From<&Event> for EventView {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            name: event.name.clone(),
            admin: event.admin.clone(),
            active: event.active,
            project_count: event.project_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectView {
    pub event_id: EventId,
    pub id: ProjectId,
    pub submitter: ParticipantId,
    pub metadata_ref: String,
    pub vote_power: u64,
}

impl ProjectView {
    pub fn new(event_id: EventId, project: &Project) -> Self {
        Self {
            event_id,
            id: project.id,
            submitter: project.submitter.clone(),
            metadata_ref: project.metadata_ref.clone(),
            vote_power: project.vote_power,
        }
    }
}

/// `(balance, initialized)` for one participant in one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountView {
    pub balance: u64,
    pub initialized: bool,
}

/// Result of a committed vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub event_id: EventId,
    pub project_id: ProjectId,
    pub votes_added: u64,
    pub total_votes: u64,
    pub credits_charged: u64,
    pub remaining_balance: u64,
    pub project_vote_power: u64,
}

/// Read-only preview of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteQuote {
    pub prior_votes: u64,
    pub new_votes: u64,
    pub cost: u64,
    pub available: u64,
    pub affordable: bool,
}
