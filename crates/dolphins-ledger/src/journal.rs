use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dolphins_types::LedgerTimestamp;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{LedgerError, LedgerResult};

/// One key written by a committed transaction. `value: None` is a delete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyWrite {
    pub key: String,
    pub value: Option<Vec<u8>>,
}

/// A committed transaction as persisted in the journal.
///
/// On-disk framing:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized JournalRecord)]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub tx_id: String,
    pub timestamp: LedgerTimestamp,
    pub writes: Vec<KeyWrite>,
}

/// Flush strategy for journal appends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every commit.
    EveryWrite,
    /// Write to the OS and let it decide when to sync.
    #[default]
    OsDefault,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    pub sync_mode: SyncMode,
}

/// Outcome of [`Journal::recover`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recovery {
    /// Intact records, in commit order.
    pub records: Vec<JournalRecord>,
    /// Bytes cut from the end of the file.
    pub discarded: u64,
}

const HEADER_SIZE: usize = 8;

/// What sits at the front of a byte slice taken from the journal.
enum Frame {
    Record { record: JournalRecord, len: usize },
    /// Header or payload runs past the end of the file.
    Torn,
    /// Complete frame whose checksum or payload does not verify.
    Corrupt(String),
}

fn encode_frame(record: &JournalRecord) -> LedgerResult<Vec<u8>> {
    let payload =
        bincode::serialize(record).map_err(|e| LedgerError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len())
        .map_err(|_| LedgerError::Serialization("journal record too large".into()))?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

fn decode_frame(bytes: &[u8]) -> Frame {
    let Some((header, rest)) = bytes.split_first_chunk::<HEADER_SIZE>() else {
        return Frame::Torn;
    };
    let (length, checksum) = header.split_at(4);
    let length = u32::from_le_bytes([length[0], length[1], length[2], length[3]]) as usize;
    let checksum = u32::from_le_bytes([checksum[0], checksum[1], checksum[2], checksum[3]]);

    if length == 0 {
        return Frame::Corrupt("zero-length record".into());
    }
    let Some(payload) = rest.get(..length) else {
        return Frame::Torn;
    };
    if crc32fast::hash(payload) != checksum {
        return Frame::Corrupt("checksum mismatch".into());
    }
    match bincode::deserialize::<JournalRecord>(payload) {
        Ok(record) => Frame::Record { record, len: HEADER_SIZE + length },
        Err(e) => Frame::Corrupt(e.to_string()),
    }
}

struct JournalWriter {
    file: File,
    /// End of the last intact record.
    offset: u64,
    /// Set when a failed append could not be rolled back.
    fenced: bool,
}

/// Append-only journal of committed ledger transactions.
///
/// The journal is a log: a record is only meaningful on top of every record
/// before it. Recovery therefore keeps the longest intact prefix and cuts the
/// file at the first torn or corrupt frame, so later appends always follow a
/// valid record. Anything after a corrupt frame is discarded with it.
pub struct Journal {
    path: PathBuf,
    writer: Mutex<JournalWriter>,
    config: JournalConfig,
}

impl Journal {
    /// Open (or create) the journal file at `path`.
    ///
    /// Call [`recover`](Self::recover) before appending to an existing file.
    pub fn open(path: &Path, config: JournalConfig) -> LedgerResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let offset = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(JournalWriter {
                file,
                offset,
                fenced: false,
            }),
            config,
        })
    }

    /// Append a record. Returns the byte offset it was written at.
    ///
    /// A failed write is rolled back to the previous end of file. If that
    /// also fails the journal refuses further appends.
    pub fn append(&self, record: &JournalRecord) -> LedgerResult<u64> {
        let frame = encode_frame(record)?;
        let mut w = self.lock()?;
        if w.fenced {
            return Err(LedgerError::Backend(format!(
                "journal {} is unusable after a failed append",
                self.path.display()
            )));
        }

        let record_offset = w.offset;
        if let Err(e) = self.write_frame(&mut w.file, &frame) {
            if let Err(rollback) = w.file.set_len(record_offset) {
                error!(offset = record_offset, error = %rollback, "journal rollback failed; refusing further appends");
                w.fenced = true;
            }
            return Err(e.into());
        }
        w.offset += frame.len() as u64;

        debug!(offset = record_offset, tx_id = %record.tx_id, len = frame.len(), "journal append");
        Ok(record_offset)
    }

    fn write_frame(&self, file: &mut File, frame: &[u8]) -> std::io::Result<()> {
        file.write_all(frame)?;
        if self.config.sync_mode == SyncMode::EveryWrite {
            file.sync_data()?;
        }
        Ok(())
    }

    /// Read back the intact prefix of the journal and cut off the rest.
    pub fn recover(&self) -> LedgerResult<Recovery> {
        let mut w = self.lock()?;
        let bytes = fs::read(&self.path)?;

        let mut records = Vec::new();
        let mut valid = 0usize;
        while valid < bytes.len() {
            match decode_frame(&bytes[valid..]) {
                Frame::Record { record, len } => {
                    records.push(record);
                    valid += len;
                }
                Frame::Torn => {
                    warn!(offset = valid, "torn journal tail");
                    break;
                }
                Frame::Corrupt(reason) => {
                    warn!(offset = valid, %reason, "corrupt journal record; discarding it and everything after");
                    break;
                }
            }
        }

        let valid = valid as u64;
        let discarded = bytes.len() as u64 - valid;
        if discarded > 0 {
            w.file.set_len(valid)?;
            w.file.sync_all()?;
        }
        w.offset = valid;

        debug!(recovered = records.len(), discarded, "journal recovery complete");
        Ok(Recovery { records, discarded })
    }

    /// Current write offset.
    pub fn offset(&self) -> LedgerResult<u64> {
        Ok(self.lock()?.offset)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> LedgerResult<std::sync::MutexGuard<'_, JournalWriter>> {
        self.writer.lock().map_err(|_| LedgerError::LockPoisoned)
    }
}
