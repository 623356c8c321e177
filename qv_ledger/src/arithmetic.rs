//! Arithmetic primitives.
//!
//! All credit and vote quantities are `u64`. Every operation that can
//! overflow is checked and surfaces as `InvalidArgument`; nothing wraps.

use crate::error::LedgerError;

/// Checked addition.
pub fn checked_add(a: u64, b: u64) -> Result<u64, LedgerError> {
    a.checked_add(b)
        .ok_or_else(|| LedgerError::invalid(format!("overflow: {} + {} overflows u64", a, b)))
}

/// Checked multiplication.
pub fn checked_mul(a: u64, b: u64) -> Result<u64, LedgerError> {
    a.checked_mul(b)
        .ok_or_else(|| LedgerError::invalid(format!("overflow: {} * {} overflows u64", a, b)))
}

/// Total cost of holding `votes` on one project: `votes²`.
pub fn quadratic_cost(votes: u64) -> Result<u64, LedgerError> {
    checked_mul(votes, votes)
}

/// Marginal charge for moving a tally from `prior` to `prior + increment`.
///
/// Returns `(new_votes, cost)` with `cost = new² − prior²`. Charging the
/// difference of squares makes sequential top-ups telescope: the sum of
/// charges depends only on the final tally.
pub fn marginal_cost(prior: u64, increment: u64) -> Result<(u64, u64), LedgerError> {
    let new_votes = checked_add(prior, increment)?;
    let cost = quadratic_cost(new_votes)? - quadratic_cost(prior)?;
    Ok((new_votes, cost))
}

/// ⌊√n⌋ without floating point.
pub fn integer_sqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    // Newton iteration from an over-estimate converges monotonically down.
    let mut x = n;
    let mut y = n / 2 + n % 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

/// Most votes a fresh tally can buy with `credits`: ⌊√credits⌋.
pub fn max_affordable_votes(credits: u64) -> u64 {
    integer_sqrt(credits)
}

/// Largest `k` such that `(prior + k)² − prior² <= balance`.
pub fn max_additional_votes(prior: u64, balance: u64) -> u64 {
    let ceiling = prior.saturating_mul(prior).saturating_add(balance);
    integer_sqrt(ceiling).saturating_sub(prior)
}

/// Reject empty (or all-whitespace) text arguments.
pub fn require_non_empty(field: &str, value: &str) -> Result<(), LedgerError> {
    if value.trim().is_empty() {
        return Err(LedgerError::invalid(format!("{} must not be empty", field)));
    }
    Ok(())
}
