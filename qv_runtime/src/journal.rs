//! Append-only command journal: a binary protobuf log.
//!
//! Storage format: length-prefixed protobuf frames.
//!   [4-byte LE length][protobuf bytes][4-byte LE length][protobuf bytes]...
//!
//! Rules:
//!   - strict append only, never rewritten
//!   - fsync after every write
//!   - sequence strictly increasing (validated on append)
//!   - only commands the ledger accepted are journaled

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use prost::Message;

use qv_ledger::CommandEnvelope;

use crate::error::RuntimeError;
use crate::proto_bridge::{kernel_to_proto, proto_to_kernel};
use crate::proto_types::ProtoCommandEnvelope;

const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

pub struct CommandJournal {
    path: PathBuf,
    last_sequence: u64,
}

impl CommandJournal {
    /// Open or create a journal. Existing frames are read once to find
    /// the last sequence, so a corrupt journal fails here.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let last_sequence = if path.exists() {
            read_frames(path)?.last().map(|f| f.sequence).unwrap_or(0)
        } else {
            0
        };

        Ok(Self {
            path: path.to_path_buf(),
            last_sequence,
        })
    }

    pub fn append(&mut self, envelope: &CommandEnvelope) -> io::Result<()> {
        let expected = self.last_sequence + 1;
        if envelope.sequence != expected {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "journal sequence violation: expected {}, got {}",
                    expected, envelope.sequence
                ),
            ));
        }

        let buf = kernel_to_proto(envelope).encode_to_vec();
        let len = u32::try_from(buf.len())
            .ok()
            .filter(|&len| len as usize <= MAX_FRAME_LEN)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("frame too large: {} bytes", buf.len()),
                )
            })?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        {
            let mut writer = BufWriter::new(&mut file);
            writer.write_all(&len.to_le_bytes())?;
            writer.write_all(&buf)?;
            writer.flush()?;
        }
        file.sync_all()?;

        self.last_sequence = envelope.sequence;
        Ok(())
    }

    /// Every journaled envelope, in sequence order.
    pub fn load_all(&self) -> Result<Vec<CommandEnvelope>, RuntimeError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        read_existing(&self.path)
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read the journal at `path` without opening it for writing. Nothing is
/// created; a missing file is a `NotFound` I/O error.
pub fn read_existing(path: &Path) -> Result<Vec<CommandEnvelope>, RuntimeError> {
    let mut envelopes = Vec::new();
    for frame in read_frames(path)? {
        envelopes.push(proto_to_kernel(&frame)?);
    }
    Ok(envelopes)
}

fn read_frames(path: &Path) -> io::Result<Vec<ProtoCommandEnvelope>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut frames = Vec::new();
    let mut len_buf = [0u8; 4];

    loop {
        match reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }

        let len = u32::from_le_bytes(len_buf) as usize;
        if len == 0 || len > MAX_FRAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid frame length: {}", len),
            ));
        }

        let mut frame = vec![0u8; len];
        reader.read_exact(&mut frame).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("truncated frame after sequence {}: {}", last_seq(&frames), e),
            )
        })?;

        let decoded = ProtoCommandEnvelope::decode(frame.as_slice()).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("protobuf decode error: {}", e),
            )
        })?;

        let expected = last_seq(&frames) + 1;
        if decoded.sequence != expected {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "journal out of order: expected {}, found {}",
                    expected, decoded.sequence
                ),
            ));
        }
        frames.push(decoded);
    }

    Ok(frames)
}

fn last_seq(frames: &[ProtoCommandEnvelope]) -> u64 {
    frames.last().map(|f| f.sequence).unwrap_or(0)
}
