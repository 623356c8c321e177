//! Ledger invariant checks.
//!
//! A violation after a committed transition is a kernel bug, so
//! `validate_invariants` panics. `try_validate_invariants` is the
//! non-panicking form for state loaded from outside (snapshots).

use crate::domain::{EventBook, EventId, LedgerState};

/// Run every check. Panics on the first failure.
pub fn validate_invariants(state: &LedgerState) {
    if let Err(msg) = try_validate_invariants(state) {
        panic!("Invariant violation: {}", msg);
    }
}

/// Check one event after a command touched it. Panics on the first failure.
pub fn validate_event_invariants(state: &LedgerState, event_id: EventId) {
    if let Err(msg) = try_validate_event(state, event_id) {
        panic!("Invariant violation: {}", msg);
    }
}

/// Returns `Err(message)` on the first failure, `Ok(())` if all pass.
pub fn try_validate_invariants(state: &LedgerState) -> Result<(), String> {
    for event_id in state.events.keys() {
        try_validate_event(state, *event_id)?;
    }
    Ok(())
}

/// The checks scoped to a single event. An absent event passes.
pub fn try_validate_event(state: &LedgerState, event_id: EventId) -> Result<(), String> {
    let Some(book) = state.events.get(&event_id) else {
        return Ok(());
    };
    check_event_id(state, event_id, book)?;
    check_dense_projects(event_id, book)?;
    check_vote_records(event_id, book)?;
    check_vote_power(event_id, book)?;
    check_balance_conservation(event_id, book, state.initial_allowance)
}

/// Event ids are positive, match their key, and lie below the allocator.
fn check_event_id(state: &LedgerState, key: EventId, book: &EventBook) -> Result<(), String> {
    if book.event.id != key {
        return Err(format!(
            "[INVARIANT:event_id] event keyed {} carries id {}",
            key, book.event.id
        ));
    }
    if key == 0 || key >= state.next_event_id {
        return Err(format!(
            "[INVARIANT:event_id] event id {} outside 1..{}",
            key, state.next_event_id
        ));
    }
    Ok(())
}

/// Project ids are exactly 1..=project_count.
fn check_dense_projects(event_id: EventId, book: &EventBook) -> Result<(), String> {
    if book.projects.len() as u64 != book.event.project_count {
        return Err(format!(
            "[INVARIANT:project_count] event {} has {} projects but project_count={}",
            event_id,
            book.projects.len(),
            book.event.project_count
        ));
    }
    for (expected, (key, project)) in (1u64..).zip(&book.projects) {
        if *key != expected || project.id != expected {
            return Err(format!(
                "[INVARIANT:dense_project_ids] event {} expected project {}, found key {} id {}",
                event_id, expected, key, project.id
            ));
        }
    }
    Ok(())
}

/// Vote records only exist for initialized accounts and known projects.
fn check_vote_records(event_id: EventId, book: &EventBook) -> Result<(), String> {
    for (participant, per_project) in &book.votes {
        let initialized = book
            .accounts
            .get(participant)
            .map_or(false, |a| a.initialized);
        if !initialized {
            return Err(format!(
                "[INVARIANT:vote_without_account] {} voted in event {} without credits",
                participant, event_id
            ));
        }
        for project_id in per_project.keys() {
            if !book.projects.contains_key(project_id) {
                return Err(format!(
                    "[INVARIANT:vote_unknown_project] {} voted on missing project {} in event {}",
                    participant, project_id, event_id
                ));
            }
        }
    }
    Ok(())
}

/// Each project's vote power is the sum of all tallies on it.
fn check_vote_power(event_id: EventId, book: &EventBook) -> Result<(), String> {
    for (project_id, project) in &book.projects {
        let total: u128 = book
            .votes
            .values()
            .filter_map(|per_project| per_project.get(project_id))
            .map(|v| *v as u128)
            .sum();
        if total != project.vote_power as u128 {
            return Err(format!(
                "[INVARIANT:vote_power] event {} project {} has vote_power={} but tallies sum to {}",
                event_id, project_id, project.vote_power, total
            ));
        }
    }
    Ok(())
}

/// balance + Σ votes² == allowance for every initialized account.
fn check_balance_conservation(
    event_id: EventId,
    book: &EventBook,
    allowance: u64,
) -> Result<(), String> {
    for (participant, account) in &book.accounts {
        if !account.initialized {
            if account.balance != 0 {
                return Err(format!(
                    "[INVARIANT:uninitialized_balance] {} holds {} credits in event {} without initialization",
                    participant, account.balance, event_id
                ));
            }
            continue;
        }
        let spent: u128 = book
            .votes
            .get(participant)
            .map(|per_project| per_project.values().map(|v| (*v as u128) * (*v as u128)).sum())
            .unwrap_or(0);
        if spent + account.balance as u128 != allowance as u128 {
            return Err(format!(
                "[INVARIANT:balance_conservation] {} in event {}: balance {} + spent {} != allowance {}",
                participant, event_id, account.balance, spent, allowance
            ));
        }
    }
    Ok(())
}
