#![forbid(unsafe_code)]

//! Quadratic-voting ledger runtime.
//!
//! Wraps the `qv_ledger` kernel with a durable command journal, an
//! append-only notification log, snapshots, replay and thread-safe
//! sessions. Read-side concerns the kernel refuses to own (ranking,
//! metadata views) live here too.
//!
//! No ledger rules live here; every mutation is delegated to the kernel.

pub mod config;
pub mod error;
pub mod journal;
pub mod metadata;
pub mod notification_log;
pub mod projection;
pub mod proto_bridge;
pub mod proto_types;
pub mod replay;
pub mod session;
pub mod snapshot;

pub use config::RuntimeConfig;
pub use error::RuntimeError;
pub use session::{Session, SharedSession};
