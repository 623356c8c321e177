#![forbid(unsafe_code)]

//! Quadratic-voting ledger kernel.
//!
//! A single-owner, deterministic state machine: events, credit accounts,
//! projects and vote records live in one [`domain::LedgerState`] owned by
//! the [`ledger::Ledger`] facade. Every mutation is applied atomically
//! against a staged copy of the state and committed only on success.
//!
//! No I/O lives here. Persistence, replay and sessions are the runtime's job.

/// Ledger v1. Bumping this changes the canonical hash of every state.
pub const LEDGER_VERSION: u32 = 1;

pub mod access_code;
pub mod arithmetic;
pub mod catalog;
pub mod commands;
pub mod credits;
pub mod domain;
pub mod error;
pub mod hashing;
pub mod invariants;
pub mod ledger;
pub mod notifications;
pub mod registry;
pub mod state;
pub mod transitions;
pub mod voting;

pub use commands::{Command, CommandEnvelope, Outcome};
pub use domain::{EventId, ParticipantId, ProjectId};
pub use error::LedgerError;
pub use ledger::Ledger;
pub use notifications::{Notification, NotificationKind};
pub use state::LedgerConfig;
