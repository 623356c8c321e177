//! Vote accounting engine.
//!
//! `vote_increment` is a delta on the participant's cumulative tally for
//! a project, never an absolute target. The charge is
//! `(prior + increment)² − prior²`, so any split of the same total into
//! sequential top-ups costs exactly what one call would. Vote power is
//! linear: the project gains `increment`.

use tracing::debug;

use crate::arithmetic::{checked_add, marginal_cost, max_additional_votes};
use crate::credits;
use crate::domain::{
    EventBook, EventId, LedgerState, ParticipantId, ProjectId, VoteQuote, VoteReceipt,
};
use crate::error::LedgerError;
use crate::registry;

/// Validated inputs of a cast, resolved against current state.
struct Plan {
    prior_votes: u64,
    increment: u64,
    new_votes: u64,
    cost: u64,
    available: u64,
}

/// Shared precondition checks for casting and quoting.
///
/// Order: event exists, event active, increment non-negative, project
/// exists, account initialized.
fn plan(
    book: &EventBook,
    participant: &ParticipantId,
    project_id: ProjectId,
    vote_increment: i64,
) -> Result<Plan, LedgerError> {
    let event_id = book.event.id;
    let increment = u64::try_from(vote_increment).map_err(|_| {
        LedgerError::invalid(format!(
            "vote increment must be non-negative, got {}",
            vote_increment
        ))
    })?;
    if !book.projects.contains_key(&project_id) {
        return Err(LedgerError::InvalidProjectId {
            event_id,
            project_id,
        });
    }
    let account = book
        .accounts
        .get(participant)
        .filter(|a| a.initialized)
        .ok_or_else(|| LedgerError::NotInitialized {
            event_id,
            participant: participant.clone(),
        })?;

    let prior_votes = book.votes_of(participant, project_id);
    let (new_votes, cost) = marginal_cost(prior_votes, increment)?;
    Ok(Plan {
        prior_votes,
        increment,
        new_votes,
        cost,
        available: account.balance,
    })
}

/// Charge `participant` for `vote_increment` more votes on `project_id`.
///
/// All checks and the debit happen before any tally is touched, so a
/// failure leaves the state as it was.
pub fn cast_vote(
    state: &mut LedgerState,
    event_id: EventId,
    participant: &ParticipantId,
    project_id: ProjectId,
    vote_increment: i64,
) -> Result<VoteReceipt, LedgerError> {
    let book = registry::active_book(state, event_id)?;
    let plan = plan(book, participant, project_id, vote_increment)?;
    let new_power = book
        .projects
        .get(&project_id)
        .map(|p| checked_add(p.vote_power, plan.increment))
        .transpose()?
        .unwrap_or(plan.increment);

    let remaining = credits::debit(state, event_id, participant, plan.cost)?;

    let book = registry::book_mut(state, event_id)?;
    book.votes
        .entry(participant.clone())
        .or_default()
        .insert(project_id, plan.new_votes);
    if let Some(project) = book.projects.get_mut(&project_id) {
        project.vote_power = new_power;
    }

    debug!(
        event_id,
        project_id,
        %participant,
        prior = plan.prior_votes,
        added = plan.increment,
        cost = plan.cost,
        remaining,
        "vote cast"
    );

    Ok(VoteReceipt {
        event_id,
        project_id,
        votes_added: plan.increment,
        total_votes: plan.new_votes,
        credits_charged: plan.cost,
        remaining_balance: remaining,
        project_vote_power: new_power,
    })
}

/// Preview a cast without mutating anything. Fails exactly where
/// [`cast_vote`] would, except that an unaffordable cast is reported via
/// `affordable = false` rather than an error.
pub fn quote_vote(
    state: &LedgerState,
    event_id: EventId,
    participant: &ParticipantId,
    project_id: ProjectId,
    vote_increment: i64,
) -> Result<VoteQuote, LedgerError> {
    let book = registry::active_book(state, event_id)?;
    let plan = plan(book, participant, project_id, vote_increment)?;
    Ok(VoteQuote {
        prior_votes: plan.prior_votes,
        new_votes: plan.new_votes,
        cost: plan.cost,
        available: plan.available,
        affordable: plan.cost <= plan.available,
    })
}

/// Most additional votes `participant` can still afford on `project_id`.
pub fn max_additional(
    state: &LedgerState,
    event_id: EventId,
    participant: &ParticipantId,
    project_id: ProjectId,
) -> Result<u64, LedgerError> {
    let book = registry::book(state, event_id)?;
    if !book.projects.contains_key(&project_id) {
        return Err(LedgerError::InvalidProjectId {
            event_id,
            project_id,
        });
    }
    let balance = credits::get_balance(state, event_id, participant).balance;
    Ok(max_additional_votes(book.votes_of(participant, project_id), balance))
}

pub fn project_vote_power(
    state: &LedgerState,
    event_id: EventId,
    project_id: ProjectId,
) -> Result<u64, LedgerError> {
    let book = registry::book(state, event_id)?;
    book.projects
        .get(&project_id)
        .map(|p| p.vote_power)
        .ok_or(LedgerError::InvalidProjectId {
            event_id,
            project_id,
        })
}

pub fn participant_votes(
    state: &LedgerState,
    event_id: EventId,
    participant: &ParticipantId,
    project_id: ProjectId,
) -> Result<u64, LedgerError> {
    let book = registry::book(state, event_id)?;
    if !book.projects.contains_key(&project_id) {
        return Err(LedgerError::InvalidProjectId {
            event_id,
            project_id,
        });
    }
    Ok(book.votes_of(participant, project_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::state::{create_initial_state, LedgerConfig};

    fn alice() -> ParticipantId {
        ParticipantId::from("alice")
    }

    /// One event, two projects, alice initialized.
    fn setup() -> (LedgerState, EventId) {
        let mut state = create_initial_state(&LedgerConfig::default());
        let id = registry::create_event(&mut state, &"admin".into(), "E", "c").unwrap();
        catalog::submit(&mut state, id, &"t1".into(), "ipfs://a", "c").unwrap();
        catalog::submit(&mut state, id, &"t2".into(), "ipfs://b", "c").unwrap();
        credits::initialize(&mut state, id, &alice()).unwrap();
        (state, id)
    }

    #[test]
    fn first_vote_costs_square() {
        let (mut state, id) = setup();
        let receipt = cast_vote(&mut state, id, &alice(), 1, 3).unwrap();
        assert_eq!(receipt.credits_charged, 9);
        assert_eq!(receipt.remaining_balance, 91);
        assert_eq!(receipt.total_votes, 3);
        assert_eq!(receipt.project_vote_power, 3);
    }

    #[test]
    fn top_up_charges_marginal_cost() {
        let (mut state, id) = setup();
        cast_vote(&mut state, id, &alice(), 1, 3).unwrap();
        let receipt = cast_vote(&mut state, id, &alice(), 1, 4).unwrap();
        assert_eq!(receipt.credits_charged, 49 - 9);
        assert_eq!(receipt.total_votes, 7);
        assert_eq!(receipt.remaining_balance, 51);
        assert_eq!(participant_votes(&state, id, &alice(), 1).unwrap(), 7);
    }

    #[test]
    fn insufficient_credits_changes_nothing() {
        let (mut state, id) = setup();
        cast_vote(&mut state, id, &alice(), 1, 3).unwrap();
        let before = state.clone();
        let err = cast_vote(&mut state, id, &alice(), 2, 10).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientCredits { required: 100, available: 91 }
        );
        assert_eq!(state, before);
    }

    #[test]
    fn negative_increment_is_invalid() {
        let (mut state, id) = setup();
        let err = cast_vote(&mut state, id, &alice(), 1, -1).unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }

    #[test]
    fn unknown_project_and_uninitialized_voter() {
        let (mut state, id) = setup();
        assert_eq!(
            cast_vote(&mut state, id, &alice(), 3, 1).unwrap_err(),
            LedgerError::InvalidProjectId { event_id: id, project_id: 3 }
        );
        assert_eq!(
            cast_vote(&mut state, id, &"bob".into(), 1, 1).unwrap_err().kind(),
            "not_initialized"
        );
    }

    #[test]
    fn inactive_event_rejects_votes() {
        let (mut state, id) = setup();
        registry::set_active(&mut state, id, &"admin".into(), false).unwrap();
        assert_eq!(
            cast_vote(&mut state, id, &alice(), 1, 1).unwrap_err(),
            LedgerError::Inactive { event_id: id }
        );
    }

    #[test]
    fn zero_increment_is_free() {
        let (mut state, id) = setup();
        cast_vote(&mut state, id, &alice(), 1, 2).unwrap();
        let receipt = cast_vote(&mut state, id, &alice(), 1, 0).unwrap();
        assert_eq!(receipt.credits_charged, 0);
        assert_eq!(receipt.total_votes, 2);
        assert_eq!(receipt.remaining_balance, 96);
    }

    #[test]
    fn quote_matches_cast() {
        let (mut state, id) = setup();
        cast_vote(&mut state, id, &alice(), 1, 3).unwrap();
        let quote = quote_vote(&state, id, &alice(), 1, 2).unwrap();
        assert_eq!(
            quote,
            VoteQuote { prior_votes: 3, new_votes: 5, cost: 16, available: 91, affordable: true }
        );
        let receipt = cast_vote(&mut state, id, &alice(), 1, 2).unwrap();
        assert_eq!(receipt.credits_charged, quote.cost);

        let too_much = quote_vote(&state, id, &alice(), 2, 9).unwrap();
        assert!(!too_much.affordable);
    }

    #[test]
    fn max_additional_tracks_balance() {
        let (mut state, id) = setup();
        assert_eq!(max_additional(&state, id, &alice(), 1).unwrap(), 10);
        cast_vote(&mut state, id, &alice(), 1, 3).unwrap();
        assert_eq!(max_additional(&state, id, &alice(), 1).unwrap(), 7);
        // 91 credits on a fresh project
        assert_eq!(max_additional(&state, id, &alice(), 2).unwrap(), 9);
    }
}
