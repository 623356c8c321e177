//! Integration tests for qv_runtime.
//!
//! Every test works in its own temporary directory.

use std::fs;
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use qv_ledger::commands::BallotEntry;
use qv_ledger::{Command, LedgerConfig, LedgerError, NotificationKind, Outcome, ParticipantId};

use qv_runtime::journal::CommandJournal;
use qv_runtime::replay;
use qv_runtime::snapshot;
use qv_runtime::{RuntimeConfig, RuntimeError, Session, SharedSession};

fn p(id: &str) -> ParticipantId {
    ParticipantId::from(id)
}

fn config(tmp: &TempDir, snapshot_interval: u64) -> RuntimeConfig {
    RuntimeConfig {
        data_dir: tmp.path().to_path_buf(),
        snapshot_interval,
        ledger: LedgerConfig::default(),
    }
}

/// Event 1 with two projects, alice and bob initialized. Sequence 5.
fn seed(session: &mut Session) {
    let org = p("organizer");
    session
        .execute(&org, Command::CreateEvent {
            name: "Demo Day".into(),
            access_code: "s3cret".into(),
        })
        .unwrap();
    for m in ["ipfs://QmA", "ipfs://QmB"] {
        session
            .execute(&org, Command::SubmitProject {
                event_id: 1,
                metadata_ref: m.into(),
                access_code: "s3cret".into(),
            })
            .unwrap();
    }
    for voter in ["alice", "bob"] {
        session
            .execute(&p(voter), Command::InitializeCredits { event_id: 1 })
            .unwrap();
    }
}

fn vote(project_id: u64, votes: i64) -> Command {
    Command::CastVote {
        event_id: 1,
        project_id,
        votes,
    }
}

// ─────────────────────────────────────────────────────────────
// Journal and replay
// ─────────────────────────────────────────────────────────────

#[test]
fn reopened_session_has_same_hash() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config(&tmp, 0);

    let (hash, seq) = {
        let mut session = Session::open(&cfg, "demo").unwrap();
        seed(&mut session);
        session.execute(&p("alice"), vote(1, 3)).unwrap();
        session.execute(&p("alice"), vote(1, 1)).unwrap();
        (session.current_hash(), session.current_sequence())
    };
    assert_eq!(seq, 7);

    let reopened = Session::open(&cfg, "demo").unwrap();
    assert_eq!(reopened.current_hash(), hash);
    assert_eq!(reopened.current_sequence(), 7);
    assert_eq!(reopened.ledger().participant_account(1, &p("alice")).balance, 84);
}

#[test]
fn journal_replay_is_deterministic() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config(&tmp, 0);
    let mut session = Session::open(&cfg, "demo").unwrap();
    seed(&mut session);
    session.execute(&p("bob"), vote(2, 6)).unwrap();

    let journal = CommandJournal::open(&session.dir().join("commands.log")).unwrap();
    let envelopes = journal.load_all().unwrap();
    assert_eq!(envelopes.len(), 6);
    let first = replay::rebuild_hash(&cfg.ledger, &envelopes).unwrap();
    let second = replay::rebuild_hash(&cfg.ledger, &envelopes).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, session.current_hash());
    assert_eq!(session.replay_full().unwrap(), first);
}

#[test]
fn rejected_commands_are_not_journaled() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config(&tmp, 0);
    let mut session = Session::open(&cfg, "demo").unwrap();
    seed(&mut session);

    let err = session.execute(&p("alice"), vote(2, 11)).unwrap_err();
    assert_eq!(
        err.as_ledger(),
        Some(&LedgerError::InsufficientCredits { required: 121, available: 100 })
    );
    let err = session
        .execute(&p("mallory"), Command::SetEventActive { event_id: 1, active: false })
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Ledger(LedgerError::Unauthorized { .. })));

    assert_eq!(session.current_sequence(), 5);
    let journal = CommandJournal::open(&session.dir().join("commands.log")).unwrap();
    assert_eq!(journal.last_sequence(), 5);

    // the next accepted command takes the very next sequence
    session.execute(&p("alice"), vote(2, 1)).unwrap();
    assert_eq!(session.current_sequence(), 6);
}

#[test]
fn corrupted_journal_refuses_to_open() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config(&tmp, 0);
    let path = {
        let mut session = Session::open(&cfg, "demo").unwrap();
        seed(&mut session);
        session.dir().join("commands.log")
    };

    let mut bytes = fs::read(&path).unwrap();
    bytes.truncate(bytes.len() - 3);
    fs::write(&path, &bytes).unwrap();

    match Session::open(&cfg, "demo") {
        Err(RuntimeError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::InvalidData),
        Err(other) => panic!("expected InvalidData, got {other}"),
        Ok(_) => panic!("corrupted journal was accepted"),
    }
}

#[test]
fn foreign_schema_version_is_rejected_on_replay() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("commands.log");
    let mut journal = CommandJournal::open(&path).unwrap();
    let mut envelope = qv_ledger::CommandEnvelope::new(
        1,
        p("organizer"),
        Command::CreateEvent { name: "E".into(), access_code: "c".into() },
    );
    envelope.schema_version = 2;
    journal.append(&envelope).unwrap();

    let envelopes = journal.load_all().unwrap();
    let err = replay::rebuild_ledger(&LedgerConfig::default(), &envelopes).err().unwrap();
    assert_eq!(err, LedgerError::SchemaVersion { expected: 1, got: 2 });
}

// ─────────────────────────────────────────────────────────────
// Snapshots
// ─────────────────────────────────────────────────────────────

#[test]
fn snapshot_matches_replay_and_resumes() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config(&tmp, 3);
    let hash = {
        let mut session = Session::open(&cfg, "demo").unwrap();
        seed(&mut session);
        session.execute(&p("alice"), vote(1, 2)).unwrap(); // seq 6
        session.execute(&p("bob"), vote(1, 2)).unwrap(); // seq 7
        session.current_hash()
    };

    let snap_dir = cfg.session_dir("demo").join("snapshots");
    assert_eq!(snapshot::snapshot_sequences(&snap_dir).unwrap(), vec![3, 6]);

    let snap = snapshot::load_snapshot(&snap_dir, 6).unwrap().unwrap();
    assert!(snapshot::verify_snapshot_hash(&snap));
    let journal = CommandJournal::open(&cfg.session_dir("demo").join("commands.log")).unwrap();
    let envelopes = journal.load_all().unwrap();
    let at_six = replay::rebuild_hash(&cfg.ledger, &envelopes[..6]).unwrap();
    assert_eq!(snap.hash, at_six);

    let reopened = Session::open(&cfg, "demo").unwrap();
    assert_eq!(reopened.current_hash(), hash);
    assert_eq!(reopened.ledger().project_vote_power(1, 1).unwrap(), 4);
}

#[test]
fn tampered_snapshot_falls_back_to_full_replay() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config(&tmp, 5);
    let hash = {
        let mut session = Session::open(&cfg, "demo").unwrap();
        seed(&mut session);
        session.execute(&p("alice"), vote(2, 5)).unwrap();
        session.current_hash()
    };

    let snap_path = cfg.session_dir("demo").join("snapshots").join("snapshot_000005.json");
    let content = fs::read_to_string(&snap_path).unwrap();
    fs::write(&snap_path, content.replace("Demo Day", "Demo Daze")).unwrap();

    let reopened = Session::open(&cfg, "demo").unwrap();
    assert_eq!(reopened.current_hash(), hash);
    assert_eq!(reopened.ledger().get_event(1).unwrap().name, "Demo Day");
}

// ─────────────────────────────────────────────────────────────
// Notifications and projections
// ─────────────────────────────────────────────────────────────

#[test]
fn notification_log_mirrors_committed_commands() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config(&tmp, 0);
    let mut session = Session::open(&cfg, "demo").unwrap();
    seed(&mut session);
    session
        .execute(&p("alice"), Command::CastBallot {
            event_id: 1,
            entries: vec![
                BallotEntry { project_id: 1, votes: 2 },
                BallotEntry { project_id: 2, votes: 3 },
            ],
        })
        .unwrap();
    let _ = session.execute(&p("alice"), vote(9, 1));

    let history = session.notification_history().unwrap();
    let seqs: Vec<u64> = history.iter().map(|n| n.sequence).collect();
    assert_eq!(seqs, vec![1, 2, 3, 4, 5, 6]);
    match &history[5].kind {
        NotificationKind::BallotCast { total_charged, receipts, .. } => {
            assert_eq!(*total_charged, 4 + 9);
            assert_eq!(receipts.len(), 2);
        }
        other => panic!("unexpected notification {other:?}"),
    }
    assert_eq!(history[5].actor, p("alice"));
}

#[test]
fn lost_notification_lines_are_backfilled_on_open() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config(&tmp, 0);
    let log_path = {
        let mut session = Session::open(&cfg, "demo").unwrap();
        seed(&mut session);
        session.dir().join("notifications.jsonl")
    };

    let content = fs::read_to_string(&log_path).unwrap();
    let kept: Vec<&str> = content.lines().take(2).collect();
    fs::write(&log_path, format!("{}\n", kept.join("\n"))).unwrap();

    let session = Session::open(&cfg, "demo").unwrap();
    let seqs: Vec<u64> = session
        .notification_history()
        .unwrap()
        .iter()
        .map(|n| n.sequence)
        .collect();
    assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
}

#[test]
fn leaderboard_from_session() {
    let tmp = tempfile::tempdir().unwrap();
    let mut session = Session::open(&config(&tmp, 0), "demo").unwrap();
    seed(&mut session);
    session.execute(&p("alice"), vote(2, 5)).unwrap();
    session.execute(&p("bob"), vote(1, 3)).unwrap();

    let rows = session.leaderboard(1).unwrap().standings();
    assert_eq!(rows.len(), 2);
    assert_eq!((rows[0].project_id, rows[0].vote_power), (2, 5));
    assert_eq!((rows[1].project_id, rows[1].vote_power), (1, 3));
    assert!(session.leaderboard(42).is_err());
}

// ─────────────────────────────────────────────────────────────
// Concurrency
// ─────────────────────────────────────────────────────────────

#[test]
fn concurrent_voters_are_serialized() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config(&tmp, 4);
    let mut session = Session::open(&cfg, "demo").unwrap();
    seed(&mut session);
    let shared = Arc::new(SharedSession::new(session));

    let handles: Vec<_> = ["alice", "bob"]
        .into_iter()
        .map(|voter| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                for _ in 0..5 {
                    let outcome = shared.execute(&p(voter), vote(1, 1)).unwrap();
                    assert!(matches!(outcome, Outcome::VoteCast(_)));
                    let power = shared.read(|s| s.ledger().project_vote_power(1, 1).unwrap());
                    assert!(power <= 10);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(shared.current_sequence(), 15);
    let (power, alice, bob) = shared.read(|s| {
        let ledger = s.ledger();
        (
            ledger.project_vote_power(1, 1).unwrap(),
            ledger.participant_account(1, &p("alice")).balance,
            ledger.participant_account(1, &p("bob")).balance,
        )
    });
    assert_eq!(power, 10);
    assert_eq!(alice, 75);
    assert_eq!(bob, 75);

    let hash = shared.current_hash();
    drop(shared);
    let reopened = Session::open(&cfg, "demo").unwrap();
    assert_eq!(reopened.current_hash(), hash);
}

#[test]
fn same_voter_racing_threads_pay_each_marginal_cost_once() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config(&tmp, 0);
    let mut session = Session::open(&cfg, "demo").unwrap();
    seed(&mut session);
    let shared = Arc::new(SharedSession::new(session));

    // Ten single votes cost 1 + 3 + ... + 19 = 100, the whole allowance.
    let handles: Vec<_> = (0..12)
        .map(|_| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || shared.execute(&p("alice"), vote(1, 1)))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let mut charges = Vec::new();
    let mut refused = 0;
    for result in results {
        match result {
            Ok(Outcome::VoteCast(receipt)) => charges.push(receipt.credits_charged),
            Err(RuntimeError::Ledger(LedgerError::InsufficientCredits { .. })) => refused += 1,
            other => panic!("unexpected result {:?}", other),
        }
    }
    charges.sort_unstable();
    assert_eq!(charges, (1..=10).map(|k| 2 * k - 1).collect::<Vec<u64>>());
    assert_eq!(refused, 2);

    let (power, votes, balance) = shared.read(|s| {
        let ledger = s.ledger();
        (
            ledger.project_vote_power(1, 1).unwrap(),
            ledger.participant_votes(1, &p("alice"), 1).unwrap(),
            ledger.participant_account(1, &p("alice")).balance,
        )
    });
    assert_eq!(power, 10);
    assert_eq!(votes, 10);
    assert_eq!(balance, 0);
    assert_eq!(shared.current_sequence(), 15);

    let hash = shared.current_hash();
    drop(shared);
    let reopened = Session::open(&cfg, "demo").unwrap();
    assert_eq!(reopened.current_hash(), hash);
}
