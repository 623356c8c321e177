//! Replay: rebuild a ledger from journaled commands.
//!
//! All domain logic stays in the kernel; replay only feeds envelopes
//! through `Ledger::apply` in order. A journal that the kernel rejects
//! part-way is corrupt, so the first error aborts the rebuild.

use qv_ledger::{CommandEnvelope, Ledger, LedgerConfig, LedgerError};

/// Rebuild from an empty ledger.
pub fn rebuild_ledger(
    config: &LedgerConfig,
    envelopes: &[CommandEnvelope],
) -> Result<Ledger, LedgerError> {
    let mut ledger = Ledger::new(config.clone());
    replay_onto(&mut ledger, envelopes)?;
    Ok(ledger)
}

/// Apply every envelope past `ledger.last_sequence()`. Earlier ones are
/// already folded into the ledger and are skipped.
pub fn replay_onto(ledger: &mut Ledger, envelopes: &[CommandEnvelope]) -> Result<usize, LedgerError> {
    let start = envelopes.partition_point(|e| e.sequence <= ledger.last_sequence());
    for envelope in &envelopes[start..] {
        ledger.apply(envelope)?;
    }
    Ok(envelopes.len() - start)
}

pub fn rebuild_hash(
    config: &LedgerConfig,
    envelopes: &[CommandEnvelope],
) -> Result<String, LedgerError> {
    Ok(rebuild_ledger(config, envelopes)?.canonical_hash())
}
