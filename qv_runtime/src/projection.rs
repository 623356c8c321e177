//! Leaderboard read model, built from the notification stream only.
//!
//! Notifications are folded in sequence order; anything at or below the
//! last applied sequence is ignored, so feeding the same stream twice is
//! harmless.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use qv_ledger::domain::VoteReceipt;
use qv_ledger::{EventId, Notification, NotificationKind, ParticipantId, ProjectId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    pub rank: usize,
    pub project_id: ProjectId,
    pub metadata_ref: String,
    pub vote_power: u64,
    /// Participants holding at least one vote on the project.
    pub voters: usize,
}

#[derive(Debug, Clone, Default)]
struct Tally {
    metadata_ref: String,
    vote_power: u64,
    voters: BTreeSet<ParticipantId>,
}

#[derive(Debug, Clone)]
pub struct Leaderboard {
    event_id: EventId,
    last_sequence: u64,
    tallies: BTreeMap<ProjectId, Tally>,
}

impl Leaderboard {
    pub fn new(event_id: EventId) -> Self {
        Self {
            event_id,
            last_sequence: 0,
            tallies: BTreeMap::new(),
        }
    }

    pub fn from_notifications<'a>(
        event_id: EventId,
        notifications: impl IntoIterator<Item = &'a Notification>,
    ) -> Self {
        let mut board = Self::new(event_id);
        for n in notifications {
            board.apply(n);
        }
        board
    }

    pub fn apply(&mut self, notification: &Notification) {
        if notification.sequence <= self.last_sequence {
            return;
        }
        self.last_sequence = notification.sequence;
        if notification.kind.event_id() != self.event_id {
            return;
        }

        match &notification.kind {
            NotificationKind::ProjectSubmitted {
                project_id,
                metadata_ref,
                ..
            } => {
                self.tallies.entry(*project_id).or_default().metadata_ref = metadata_ref.clone();
            }
            NotificationKind::VoteCast {
                participant,
                receipt,
            } => self.record(participant, receipt),
            NotificationKind::BallotCast {
                participant,
                receipts,
                ..
            } => {
                for receipt in receipts {
                    self.record(participant, receipt);
                }
            }
            NotificationKind::EventCreated { .. }
            | NotificationKind::EventActiveChanged { .. }
            | NotificationKind::CreditsInitialized { .. } => {}
        }
    }

    fn record(&mut self, participant: &ParticipantId, receipt: &VoteReceipt) {
        let tally = self.tallies.entry(receipt.project_id).or_default();
        tally.vote_power = receipt.project_vote_power;
        if receipt.total_votes > 0 {
            tally.voters.insert(participant.clone());
        }
    }

    /// Projects by vote power, highest first; ties go to the lower id.
    pub fn standings(&self) -> Vec<Standing> {
        let mut rows: Vec<(&ProjectId, &Tally)> = self.tallies.iter().collect();
        rows.sort_by(|a, b| b.1.vote_power.cmp(&a.1.vote_power).then(a.0.cmp(b.0)));
        rows.into_iter()
            .enumerate()
            .map(|(i, (id, tally))| Standing {
                rank: i + 1,
                project_id: *id,
                metadata_ref: tally.metadata_ref.clone(),
                vote_power: tally.vote_power,
                voters: tally.voters.len(),
            })
            .collect()
    }

    pub fn total_vote_power(&self) -> u64 {
        self.tallies.values().map(|t| t.vote_power).sum()
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }
}
