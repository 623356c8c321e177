//! `qv-inspect`: replay a session's journal and print what it holds.
//!
//! Read-only. Nothing in the session directory is written, snapshots are
//! ignored, and the ledger is rebuilt from the journal alone.
//!
//! # Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0    | journal replayed |
//! | 1    | journal missing, corrupt or rejected by the ledger |
//!
//! ```bash
//! qv-inspect --data-dir ./qv-data --session demo
//! qv-inspect --data-dir ./qv-data --session demo --event 1
//! ```

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info};

use qv_ledger::{EventId, Ledger};
use qv_runtime::config::RuntimeConfig;
use qv_runtime::error::RuntimeError;
use qv_runtime::journal;
use qv_runtime::projection::Leaderboard;
use qv_runtime::replay;

#[derive(Parser, Debug)]
#[command(
    name = "qv-inspect",
    version,
    about = "Replay a quadratic-voting session journal and print its state",
    long_about = None,
)]
struct Args {
    /// Runtime config file (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the config's data directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[arg(long)]
    session: String,

    /// Only print this event.
    #[arg(long)]
    event: Option<EventId>,

    /// Log level: trace, debug, info, warn, error.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(
            args.log_level
                .parse::<tracing_subscriber::filter::LevelFilter>()
                .unwrap_or(tracing_subscriber::filter::LevelFilter::WARN),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(()) => {}
        Err(e) => {
            error!(error = %e, "inspection failed");
            eprintln!("ERROR: {e}");
            process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<(), RuntimeError> {
    let mut config = match &args.config {
        Some(path) => RuntimeConfig::from_file(path)?,
        None => RuntimeConfig::default(),
    };
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }

    let journal_path = config.session_dir(&args.session).join("commands.log");
    if !journal_path.exists() {
        return Err(RuntimeError::Config(format!(
            "no journal at {}",
            journal_path.display()
        )));
    }
    let envelopes = journal::read_existing(&journal_path)?;
    info!(commands = envelopes.len(), "replaying journal");
    let ledger = replay::rebuild_ledger(&config.ledger, &envelopes)?;

    println!("session:   {}", args.session);
    println!("sequence:  {}", ledger.last_sequence());
    println!("hash:      {}", ledger.canonical_hash());
    println!("allowance: {}", ledger.constant_allowance());

    let events: Vec<EventId> = match args.event {
        Some(id) => vec![ledger.get_event(id)?.id],
        None => ledger.list_events().iter().map(|e| e.id).collect(),
    };
    for event_id in events {
        print_event(&ledger, event_id)?;
    }
    Ok(())
}

fn print_event(ledger: &Ledger, event_id: EventId) -> Result<(), RuntimeError> {
    let event = ledger.get_event(event_id)?;
    println!();
    println!(
        "event {} \"{}\" admin={} {}",
        event.id,
        event.name,
        event.admin,
        if event.active { "active" } else { "inactive" }
    );
    println!("  projects: {}", event.project_count);

    let board = Leaderboard::from_notifications(event_id, ledger.notifications());
    for row in board.standings() {
        println!(
            "  #{:<3} project {:<4} power {:<6} voters {:<4} {}",
            row.rank, row.project_id, row.vote_power, row.voters, row.metadata_ref
        );
    }
    Ok(())
}
