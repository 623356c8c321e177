//! Runtime error type.

use std::io;

use thiserror::Error;

use qv_ledger::LedgerError;

use crate::proto_bridge::BridgeError;
use crate::snapshot::SnapshotError;

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The kernel rejected the command. State is unchanged.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("journal I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("journal frame could not be decoded: {0}")]
    Bridge(#[from] BridgeError),

    #[error("snapshot failed: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("invalid runtime configuration: {0}")]
    Config(String),
}

impl RuntimeError {
    /// The kernel error, if this is a rejected command.
    pub fn as_ledger(&self) -> Option<&LedgerError> {
        match self {
            RuntimeError::Ledger(err) => Some(err),
            _ => None,
        }
    }
}
