//! Append-only notification log, one JSON object per line.
//!
//! Lines are written after the matching command has been journaled, so
//! the log may lag the journal after a crash but never lead it. The
//! session backfills the gap on open.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use qv_ledger::Notification;

pub struct NotificationLog {
    path: PathBuf,
    last_sequence: u64,
}

impl NotificationLog {
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let last_sequence = if path.exists() {
            read_lines(path)?.last().map(|n| n.sequence).unwrap_or(0)
        } else {
            0
        };
        Ok(Self {
            path: path.to_path_buf(),
            last_sequence,
        })
    }

    pub fn append(&mut self, notification: &Notification) -> io::Result<()> {
        if notification.sequence <= self.last_sequence {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "notification {} is not after {}",
                    notification.sequence, self.last_sequence
                ),
            ));
        }
        let mut line = serde_json::to_string(notification)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.sync_all()?;

        self.last_sequence = notification.sequence;
        Ok(())
    }

    pub fn load_all(&self) -> io::Result<Vec<Notification>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        read_lines(&self.path)
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }
}

fn read_lines(path: &Path) -> io::Result<Vec<Notification>> {
    let reader = BufReader::new(File::open(path)?);
    let mut out = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let notification: Notification = serde_json::from_str(&line).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("bad notification on line {}: {}", n + 1, e),
            )
        })?;
        out.push(notification);
    }
    Ok(out)
}
