//! Credit ledger.
//!
//! One account per (event, participant). An account is created exactly
//! once with the constant allowance and afterwards only ever debited.

use tracing::debug;

use crate::domain::{AccountView, CreditAccount, EventId, LedgerState, ParticipantId};
use crate::error::LedgerError;
use crate::registry;

/// Grant the constant allowance to `participant` in `event_id`.
pub fn initialize(
    state: &mut LedgerState,
    event_id: EventId,
    participant: &ParticipantId,
) -> Result<u64, LedgerError> {
    let allowance = state.initial_allowance;
    let book = registry::book_mut(state, event_id)?;

    if book
        .accounts
        .get(participant)
        .map_or(false, |a| a.initialized)
    {
        return Err(LedgerError::AlreadyInitialized {
            event_id,
            participant: participant.clone(),
        });
    }

    book.accounts.insert(
        participant.clone(),
        CreditAccount {
            balance: allowance,
            initialized: true,
        },
    );
    debug!(event_id, %participant, balance = allowance, "credits initialized");
    Ok(allowance)
}

/// `(balance, initialized)`; unknown pairs (or events) read as `(0, false)`.
pub fn get_balance(state: &LedgerState, event_id: EventId, participant: &ParticipantId) -> AccountView {
    state
        .events
        .get(&event_id)
        .and_then(|book| book.accounts.get(participant))
        .map(|a| AccountView {
            balance: a.balance,
            initialized: a.initialized,
        })
        .unwrap_or_default()
}

/// Subtract `amount` from an initialized account. Only the vote engine
/// calls this, inside its atomic apply.
pub(crate) fn debit(
    state: &mut LedgerState,
    event_id: EventId,
    participant: &ParticipantId,
    amount: u64,
) -> Result<u64, LedgerError> {
    let book = registry::book_mut(state, event_id)?;
    let account = book
        .accounts
        .get_mut(participant)
        .filter(|a| a.initialized)
        .ok_or_else(|| LedgerError::NotInitialized {
            event_id,
            participant: participant.clone(),
        })?;

    if amount > account.balance {
        return Err(LedgerError::InsufficientCredits {
            required: amount,
            available: account.balance,
        });
    }
    account.balance -= amount;
    Ok(account.balance)
}
