//! Session manager: one ledger per session directory, apply-then-persist.
//!
//! Layout:
//!   <data_dir>/<session_id>/commands.log          command journal
//!   <data_dir>/<session_id>/notifications.jsonl   notification log
//!   <data_dir>/<session_id>/snapshots/            periodic snapshots
//!
//! `execute` order:
//!   1. ledger.apply(envelope)   rejected commands stop here, nothing is written
//!   2. journal.append           only commands the ledger accepted; on failure
//!                               the apply is reverted and the error returned
//!   3. notification log append  persisted notifications leave the ledger
//!   4. snapshot if the interval is reached, best effort
//!
//! Once step 2 succeeds the command is committed and `execute` returns its
//! outcome; later write failures are logged and repaired on the next open.
//!
//! Writers are serialized by `SharedSession`'s lock; reads share it.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use qv_ledger::{Command, Ledger, LedgerConfig, Notification, Outcome, ParticipantId};

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::journal::CommandJournal;
use crate::notification_log::NotificationLog;
use crate::projection::Leaderboard;
use crate::replay;
use crate::snapshot;

const JOURNAL_FILE: &str = "commands.log";
const NOTIFICATION_FILE: &str = "notifications.jsonl";
const SNAPSHOT_DIR: &str = "snapshots";

pub struct Session {
    session_id: String,
    dir: PathBuf,
    ledger_config: LedgerConfig,
    ledger: Ledger,
    journal: CommandJournal,
    notification_log: NotificationLog,
    snapshot_interval: u64,
}

impl Session {
    /// Open (or create) a session and bring its ledger up to the end of
    /// the journal, starting from the newest usable snapshot.
    pub fn open(config: &RuntimeConfig, session_id: &str) -> Result<Self, RuntimeError> {
        let dir = config.session_dir(session_id);
        let journal = CommandJournal::open(&dir.join(JOURNAL_FILE))?;
        let mut notification_log = NotificationLog::open(&dir.join(NOTIFICATION_FILE))?;
        let envelopes = journal.load_all()?;

        // A snapshot past the notification log would leave a hole in the
        // backfill below, so those are not used.
        let bound = journal.last_sequence().min(notification_log.last_sequence());
        let mut ledger = latest_usable_snapshot(&config.ledger, &dir.join(SNAPSHOT_DIR), bound)
            .unwrap_or_else(|| Ledger::new(config.ledger.clone()));
        let resumed_from = ledger.last_sequence();
        let replayed = replay::replay_onto(&mut ledger, &envelopes)?;

        for notification in ledger.notifications_since(notification_log.last_sequence()) {
            notification_log.append(notification)?;
        }
        ledger.drain_notifications_through(notification_log.last_sequence());

        info!(
            session = session_id,
            sequence = ledger.last_sequence(),
            resumed_from,
            replayed,
            "session opened"
        );

        Ok(Self {
            session_id: session_id.to_string(),
            dir,
            ledger_config: config.ledger.clone(),
            ledger,
            journal,
            notification_log,
            snapshot_interval: config.snapshot_interval,
        })
    }

    /// Run `command` for `caller` at the next sequence and persist it.
    pub fn execute(
        &mut self,
        caller: &ParticipantId,
        command: Command,
    ) -> Result<Outcome, RuntimeError> {
        let envelope = self.ledger.envelope(caller, command);
        let outcome = self.ledger.apply(&envelope)?;

        if let Err(err) = self.journal.append(&envelope) {
            error!(
                session = %self.session_id,
                sequence = envelope.sequence,
                error = %err,
                "journal write failed, reverting command"
            );
            self.ledger.revert_last();
            return Err(err.into());
        }
        debug!(
            session = %self.session_id,
            sequence = envelope.sequence,
            command = envelope.command.name(),
            "command committed"
        );

        for notification in self
            .ledger
            .notifications_since(self.notification_log.last_sequence())
        {
            if let Err(err) = self.notification_log.append(notification) {
                // The command is durable; the gap is backfilled on next open.
                warn!(
                    session = %self.session_id,
                    sequence = notification.sequence,
                    error = %err,
                    "notification write failed"
                );
                break;
            }
        }
        self.ledger
            .drain_notifications_through(self.notification_log.last_sequence());

        if self.snapshot_interval > 0 && envelope.sequence % self.snapshot_interval == 0 {
            match snapshot::save_snapshot(
                &self.dir.join(SNAPSHOT_DIR),
                envelope.sequence,
                self.ledger.state(),
            ) {
                Ok(path) => {
                    info!(session = %self.session_id, path = %path.display(), "snapshot saved")
                }
                // Snapshots only shorten replay; the journal stays authoritative.
                Err(err) => warn!(
                    session = %self.session_id,
                    sequence = envelope.sequence,
                    error = %err,
                    "snapshot write failed"
                ),
            }
        }

        Ok(outcome)
    }

    /// Discard in-memory state and rebuild it from the journal alone.
    /// Returns the rebuilt canonical hash.
    pub fn replay_full(&mut self) -> Result<String, RuntimeError> {
        let envelopes = self.journal.load_all()?;
        self.ledger = replay::rebuild_ledger(&self.ledger_config, &envelopes)?;
        self.ledger
            .drain_notifications_through(self.notification_log.last_sequence());
        Ok(self.ledger.canonical_hash())
    }

    /// Every persisted notification, oldest first.
    pub fn notification_history(&self) -> Result<Vec<Notification>, RuntimeError> {
        Ok(self.notification_log.load_all()?)
    }

    pub fn leaderboard(&self, event_id: u64) -> Result<Leaderboard, RuntimeError> {
        self.ledger.get_event(event_id)?;
        Ok(Leaderboard::from_notifications(
            event_id,
            &self.notification_history()?,
        ))
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn current_hash(&self) -> String {
        self.ledger.canonical_hash()
    }

    pub fn current_sequence(&self) -> u64 {
        self.ledger.last_sequence()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn latest_usable_snapshot(config: &LedgerConfig, dir: &Path, bound: u64) -> Option<Ledger> {
    let sequences = match snapshot::snapshot_sequences(dir) {
        Ok(seqs) => seqs,
        Err(err) => {
            warn!(error = %err, "cannot list snapshots, replaying from scratch");
            return None;
        }
    };
    for seq in sequences.into_iter().rev().filter(|&s| s <= bound) {
        let restored = snapshot::load_snapshot(dir, seq)
            .and_then(|snap| snap.map(|s| snapshot::restore_state(&s)).transpose());
        match restored {
            Ok(Some(state)) => return Some(Ledger::restore(config.clone(), state, seq)),
            Ok(None) => {}
            Err(err) => warn!(sequence = seq, error = %err, "skipping unusable snapshot"),
        }
    }
    None
}

/// Thread-safe session handle.
pub struct SharedSession {
    inner: RwLock<Session>,
}

impl SharedSession {
    pub fn new(session: Session) -> Self {
        Self {
            inner: RwLock::new(session),
        }
    }

    pub fn execute(
        &self,
        caller: &ParticipantId,
        command: Command,
    ) -> Result<Outcome, RuntimeError> {
        self.inner.write().execute(caller, command)
    }

    /// Run a read-only query against the session under the shared lock.
    pub fn read<R>(&self, query: impl FnOnce(&Session) -> R) -> R {
        let session = self.inner.read();
        query(&*session)
    }

    pub fn current_hash(&self) -> String {
        self.inner.read().current_hash()
    }

    pub fn current_sequence(&self) -> u64 {
        self.inner.read().current_sequence()
    }

    pub fn into_inner(self) -> Session {
        self.inner.into_inner()
    }
}
