//! Write-ahead log for committed index transactions.
//!
//! Every committed write transaction becomes one framed record:
//!
//! ```text
//! [length: u32 LE][crc32: u32 LE][JSON-encoded WalRecord]
//! ```
//!
//! A record is synced before the in-memory tables change. On startup the log
//! is replayed; a torn or corrupt tail (a crash in the middle of an append)
//! is dropped, which is the same as that transaction never having committed.
//!
//! A failed append may still leave a whole, checksummed frame behind (the
//! bytes were written but the sync failed). The log therefore tracks the byte
//! length of its committed records and cuts everything past it on repair.

use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::index::document::{DocId, Document};
use crate::storage::{Storage, StorageOutput, read_all, write_atomic};

pub type SeqNumber = u64;

const FRAME_HEADER_LEN: u64 = 8;

/// The changes made by one write transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBatch {
    /// Newly created documents, ascending by id.
    pub documents: Vec<Document>,
    /// Posting merges as `(doc_id, [(token, count)])`.
    pub postings: Vec<(DocId, Vec<(String, u32)>)>,
}

impl TransactionBatch {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.postings.is_empty()
    }
}

/// A single operation in the write-ahead log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalEntry {
    /// A committed write transaction.
    Commit(TransactionBatch),
}

/// A WAL entry with its sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalRecord {
    pub seq: SeqNumber,
    pub entry: WalEntry,
}

/// Manages the write-ahead log file.
#[derive(Debug)]
pub struct WalManager {
    storage: Arc<dyn Storage>,
    path: String,
    writer: Mutex<Option<Box<dyn StorageOutput>>>,
    next_seq: AtomicU64,
    /// Records written since the last truncation.
    record_count: AtomicUsize,
    /// Byte length of the acknowledged records.
    committed_len: AtomicU64,
    /// Set when the file may hold bytes past `committed_len`.
    needs_repair: AtomicBool,
}

impl WalManager {
    pub fn new(storage: Arc<dyn Storage>, path: &str) -> Self {
        Self {
            storage,
            path: path.to_string(),
            writer: Mutex::new(None),
            next_seq: AtomicU64::new(1),
            record_count: AtomicUsize::new(0),
            committed_len: AtomicU64::new(0),
            needs_repair: AtomicBool::new(false),
        }
    }

    /// Set the next sequence number (e.g. after loading a snapshot).
    pub fn set_next_seq(&self, seq: SeqNumber) {
        self.next_seq.store(seq, Ordering::SeqCst);
    }

    /// Get the last used sequence number.
    pub fn last_seq(&self) -> SeqNumber {
        self.next_seq.load(Ordering::SeqCst).saturating_sub(1)
    }

    /// Number of records in the log since it was last truncated.
    pub fn len(&self) -> usize {
        self.record_count.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append an entry and sync it. Returns the assigned sequence number.
    ///
    /// The sequence number is only consumed when the record is durable.
    pub fn append(&self, entry: &WalEntry) -> Result<SeqNumber> {
        let mut writer_guard = self.writer.lock();

        if self.needs_repair.load(Ordering::SeqCst) {
            *writer_guard = None;
            self.repair()?;
        }

        let seq = self.next_seq.load(Ordering::SeqCst);
        let record = WalRecord {
            seq,
            entry: entry.clone(),
        };
        let frame = encode_frame(&record)?;

        if writer_guard.is_none() {
            *writer_guard = Some(self.storage.create_output_append(&self.path)?);
        }

        let written = match writer_guard.as_mut() {
            Some(writer) => write_frame(&mut **writer, &frame),
            None => Ok(()),
        };

        if let Err(e) = written {
            // The frame may be on disk in full; it must not survive.
            *writer_guard = None;
            self.needs_repair.store(true, Ordering::SeqCst);
            if let Err(repair_err) = self.repair() {
                warn!("wal: cannot cut back the failed record {seq} yet: {repair_err}");
            }
            return Err(e);
        }

        self.next_seq.store(seq + 1, Ordering::SeqCst);
        self.record_count.fetch_add(1, Ordering::SeqCst);
        self.committed_len.fetch_add(frame.len() as u64, Ordering::SeqCst);
        debug!("wal: appended record {seq} ({} bytes)", frame.len());
        Ok(seq)
    }

    /// Read every intact record from the log.
    ///
    /// Also moves `next_seq` past the highest sequence found.
    pub fn read_all(&self) -> Result<Vec<WalRecord>> {
        if !self.storage.file_exists(&self.path) {
            return Ok(Vec::new());
        }

        let mut reader = self.storage.open_input(&self.path)?;
        let size = reader.size()?;
        let mut records = Vec::new();
        let mut position = 0;
        let mut max_seq = 0;
        let mut valid_len = 0;
        let mut torn = false;

        while position < size {
            if position + FRAME_HEADER_LEN > size {
                warn!("wal: discarding {} trailing bytes of a torn header", size - position);
                torn = true;
                break;
            }
            let len = u64::from(reader.read_u32::<LittleEndian>()?);
            let checksum = reader.read_u32::<LittleEndian>()?;
            position += FRAME_HEADER_LEN;

            if position + len > size {
                warn!("wal: discarding a torn record at offset {}", position - FRAME_HEADER_LEN);
                torn = true;
                break;
            }

            let mut buffer = vec![0u8; len as usize];
            reader.read_exact(&mut buffer)?;
            position += len;

            if crc32fast::hash(&buffer) != checksum {
                warn!("wal: checksum mismatch at offset {}, dropping the tail", position - len);
                torn = true;
                break;
            }

            let record: WalRecord = serde_json::from_slice(&buffer)?;
            max_seq = max_seq.max(record.seq);
            records.push(record);
            valid_len = position;
        }
        reader.close()?;

        if max_seq >= self.next_seq.load(Ordering::SeqCst) {
            self.next_seq.store(max_seq + 1, Ordering::SeqCst);
        }
        self.record_count.store(records.len(), Ordering::SeqCst);
        self.committed_len.store(valid_len, Ordering::SeqCst);
        if torn {
            // Appending after a bad tail would hide the new records from replay.
            self.needs_repair.store(true, Ordering::SeqCst);
        }

        Ok(records)
    }

    /// Clear the log, typically after a checkpoint.
    pub fn truncate(&self) -> Result<()> {
        let mut writer_guard = self.writer.lock();
        *writer_guard = None;

        let mut writer = self.storage.create_output(&self.path)?;
        writer.flush_and_sync()?;
        writer.close()?;

        self.record_count.store(0, Ordering::SeqCst);
        self.committed_len.store(0, Ordering::SeqCst);
        self.needs_repair.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Rewrite the log with only its committed prefix.
    ///
    /// Callers hold the writer lock with the writer handle dropped.
    fn repair(&self) -> Result<()> {
        let committed = self.committed_len.load(Ordering::SeqCst) as usize;
        let mut bytes = if self.storage.file_exists(&self.path) {
            read_all(self.storage.as_ref(), &self.path)?
        } else {
            Vec::new()
        };
        let dropped = bytes.len().saturating_sub(committed);
        bytes.truncate(committed);
        write_atomic(self.storage.as_ref(), &self.path, &bytes)?;
        self.needs_repair.store(false, Ordering::SeqCst);
        warn!(
            "wal: repaired log, kept {} records and dropped {dropped} bytes",
            self.len()
        );
        Ok(())
    }
}

fn encode_frame(record: &WalRecord) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(record)?;
    let mut frame = Vec::with_capacity(payload.len() + FRAME_HEADER_LEN as usize);
    frame.write_u32::<LittleEndian>(payload.len() as u32)?;
    frame.write_u32::<LittleEndian>(crc32fast::hash(&payload))?;
    frame.extend_from_slice(&payload);
    Ok(frame)
}

fn write_frame(writer: &mut dyn StorageOutput, frame: &[u8]) -> Result<()> {
    writer.write_all(frame)?;
    writer.flush_and_sync()
}
