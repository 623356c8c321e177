//! Ledger configuration and state construction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::LedgerState;

/// Credits granted per (event, participant) unless configured otherwise.
pub const DEFAULT_INITIAL_ALLOWANCE: u64 = 100;

/// Kernel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Constant allowance granted by `initialize_credits`.
    pub initial_allowance: u64,
    /// Re-check every invariant after each committed mutation.
    pub check_invariants: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            initial_allowance: DEFAULT_INITIAL_ALLOWANCE,
            check_invariants: true,
        }
    }
}

/// Create a fresh, empty ledger state.
pub fn create_initial_state(config: &LedgerConfig) -> LedgerState {
    LedgerState {
        initial_allowance: config.initial_allowance,
        next_event_id: 1,
        events: BTreeMap::new(),
    }
}
