//! Snapshot layer: deterministic ledger-state snapshots.
//!
//! A snapshot holds the canonical JSON of the state (the exact bytes the
//! canonical hash is computed over) plus that hash. No timestamps, so two
//! snapshots of the same state are byte-identical.
//!
//! If a snapshot fails verification the session falls back to full replay.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use qv_ledger::domain::LedgerState;
use qv_ledger::hashing::{canonical_serialize, sha256_hex};
use qv_ledger::invariants::try_validate_invariants;
use qv_ledger::LEDGER_VERSION;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot hash mismatch: recorded {recorded}, computed {computed}")]
    HashMismatch { recorded: String, computed: String },
    #[error("snapshot written by ledger v{found}, this build is v{expected}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("malformed snapshot: {0}")]
    Malformed(String),
    #[error("snapshot state violates invariants: {0}")]
    InvariantViolation(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// On-disk format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    /// Sequence of the last command folded into this state.
    pub sequence: u64,
    pub canonical_json: String,
    /// SHA-256 of `canonical_json`.
    pub hash: String,
    pub ledger_version: u32,
}

impl Snapshot {
    pub fn capture(sequence: u64, state: &LedgerState) -> Result<Self, SnapshotError> {
        let canonical_json = String::from_utf8(canonical_serialize(state))
            .map_err(|e| SnapshotError::Malformed(e.to_string()))?;
        let hash = sha256_hex(canonical_json.as_bytes());
        Ok(Self {
            sequence,
            canonical_json,
            hash,
            ledger_version: LEDGER_VERSION,
        })
    }
}

fn snapshot_path(dir: &Path, sequence: u64) -> PathBuf {
    dir.join(format!("snapshot_{:06}.json", sequence))
}

pub fn save_snapshot(
    dir: &Path,
    sequence: u64,
    state: &LedgerState,
) -> Result<PathBuf, SnapshotError> {
    fs::create_dir_all(dir)?;
    let snap = Snapshot::capture(sequence, state)?;
    let content =
        serde_json::to_string(&snap).map_err(|e| SnapshotError::Malformed(e.to_string()))?;

    let path = snapshot_path(dir, sequence);
    let mut file = File::create(&path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    Ok(path)
}

/// `None` if there is no snapshot at `sequence`.
pub fn load_snapshot(dir: &Path, sequence: u64) -> Result<Option<Snapshot>, SnapshotError> {
    let path = snapshot_path(dir, sequence);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    let snap = serde_json::from_str(&content)
        .map_err(|e| SnapshotError::Malformed(format!("{}: {}", path.display(), e)))?;
    Ok(Some(snap))
}

/// Snapshot with the highest sequence in `dir`.
pub fn load_latest_snapshot(dir: &Path) -> Result<Option<Snapshot>, SnapshotError> {
    match snapshot_sequences(dir)?.last() {
        Some(&seq) => load_snapshot(dir, seq),
        None => Ok(None),
    }
}

/// Sequences of every snapshot file in `dir`, ascending.
pub fn snapshot_sequences(dir: &Path) -> Result<Vec<u64>, SnapshotError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut seqs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let name = name.to_string_lossy();
        if let Some(seq) = name
            .strip_prefix("snapshot_")
            .and_then(|s| s.strip_suffix(".json"))
            .and_then(|s| s.parse::<u64>().ok())
        {
            seqs.push(seq);
        }
    }
    seqs.sort_unstable();
    Ok(seqs)
}

pub fn verify_snapshot_hash(snap: &Snapshot) -> bool {
    sha256_hex(snap.canonical_json.as_bytes()) == snap.hash
}

/// Verify and decode a snapshot back into a ledger state.
pub fn restore_state(snap: &Snapshot) -> Result<LedgerState, SnapshotError> {
    if snap.ledger_version != LEDGER_VERSION {
        return Err(SnapshotError::VersionMismatch {
            expected: LEDGER_VERSION,
            found: snap.ledger_version,
        });
    }
    let computed = sha256_hex(snap.canonical_json.as_bytes());
    if computed != snap.hash {
        return Err(SnapshotError::HashMismatch {
            recorded: snap.hash.clone(),
            computed,
        });
    }

    let mut root: Value = serde_json::from_str(&snap.canonical_json)
        .map_err(|e| SnapshotError::Malformed(e.to_string()))?;
    let state_value = root
        .get_mut("state")
        .map(Value::take)
        .ok_or_else(|| SnapshotError::Malformed("missing \"state\" field".to_string()))?;
    let state: LedgerState = serde_json::from_value(state_value)
        .map_err(|e| SnapshotError::Malformed(e.to_string()))?;

    try_validate_invariants(&state).map_err(SnapshotError::InvariantViolation)?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qv_ledger::hashing::canonical_hash;
    use qv_ledger::{Ledger, ParticipantId};

    fn busy_ledger() -> Ledger {
        let mut ledger = Ledger::default();
        let org = ParticipantId::from("org");
        let alice = ParticipantId::from("alice");
        ledger.create_event(&org, "E", "code").unwrap();
        ledger.submit_project(&org, 1, "ipfs://QmA", "code").unwrap();
        ledger.initialize_credits(&alice, 1).unwrap();
        ledger.cast_vote(&alice, 1, 1, 6).unwrap();
        ledger
    }

    #[test]
    fn save_then_restore_keeps_hash() {
        let ledger = busy_ledger();
        let dir = tempfile::tempdir().unwrap();
        save_snapshot(dir.path(), 4, ledger.state()).unwrap();

        let snap = load_latest_snapshot(dir.path()).unwrap().unwrap();
        assert_eq!(snap.sequence, 4);
        assert_eq!(snap.hash, ledger.canonical_hash());
        assert!(verify_snapshot_hash(&snap));

        let state = restore_state(&snap).unwrap();
        assert_eq!(&state, ledger.state());
        assert_eq!(canonical_hash(&state), snap.hash);
    }

    #[test]
    fn latest_picks_highest_sequence() {
        let ledger = busy_ledger();
        let dir = tempfile::tempdir().unwrap();
        for seq in [2, 10, 7] {
            save_snapshot(dir.path(), seq, ledger.state()).unwrap();
        }
        assert_eq!(snapshot_sequences(dir.path()).unwrap(), vec![2, 7, 10]);
        assert_eq!(load_latest_snapshot(dir.path()).unwrap().unwrap().sequence, 10);
        assert!(load_snapshot(dir.path(), 3).unwrap().is_none());
    }

    #[test]
    fn tampered_json_is_refused() {
        let mut snap = Snapshot::capture(4, busy_ledger().state()).unwrap();
        snap.canonical_json = snap.canonical_json.replace("\"balance\":64", "\"balance\":99");
        assert!(!verify_snapshot_hash(&snap));
        assert!(matches!(
            restore_state(&snap),
            Err(SnapshotError::HashMismatch { .. })
        ));
    }

    #[test]
    fn rehashed_but_inconsistent_state_fails_invariants() {
        let mut snap = Snapshot::capture(4, busy_ledger().state()).unwrap();
        snap.canonical_json = snap.canonical_json.replace("\"balance\":64", "\"balance\":99");
        snap.hash = sha256_hex(snap.canonical_json.as_bytes());
        assert!(matches!(
            restore_state(&snap),
            Err(SnapshotError::InvariantViolation(_))
        ));
    }

    #[test]
    fn other_ledger_version_is_refused() {
        let mut snap = Snapshot::capture(1, busy_ledger().state()).unwrap();
        snap.ledger_version = LEDGER_VERSION + 1;
        assert!(matches!(
            restore_state(&snap),
            Err(SnapshotError::VersionMismatch { .. })
        ));
    }
}
