//! On-storage layout of a persisted index.
//!
//! A persisted index is three files:
//!
//! - `manifest.json` - format version, tokenizer kind, snapshot sequence
//! - `index.snapshot` - the `documents` and `postings` tables as of a WAL
//!   sequence, bincode-encoded behind a crc32 checksum
//! - `index.wal` - commits after that sequence (see [`crate::index::wal`])

use byteorder::{ByteOrder, LittleEndian};
use log::info;
use serde::{Deserialize, Serialize};

use crate::analysis::tokenizer::TokenizerKind;
use crate::error::{NgramdexError, Result};
use crate::index::document::{DocId, Document};
use crate::index::posting::Posting;
use crate::index::wal::SeqNumber;
use crate::storage::{Storage, read_all, write_atomic};

pub const WAL_FILE: &str = "index.wal";
pub const SNAPSHOT_FILE: &str = "index.snapshot";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const MANIFEST_VERSION: u32 = 1;

/// Describes a persisted index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub version: u32,
    pub tokenizer: TokenizerKind,
    #[serde(default)]
    pub snapshot_wal_seq: SeqNumber,
}

impl IndexManifest {
    pub fn new(tokenizer: TokenizerKind, snapshot_wal_seq: SeqNumber) -> Self {
        IndexManifest {
            version: MANIFEST_VERSION,
            tokenizer,
            snapshot_wal_seq,
        }
    }

    /// Reject manifests written by another format version or tokenizer.
    pub fn check_compatible(&self, tokenizer: TokenizerKind) -> Result<()> {
        if self.version != MANIFEST_VERSION {
            return Err(NgramdexError::configuration(format!(
                "index manifest version mismatch: expected {MANIFEST_VERSION}, found {}",
                self.version
            )));
        }
        if self.tokenizer != tokenizer {
            return Err(NgramdexError::configuration(format!(
                "index was built with the {} tokenizer but {} was configured",
                self.tokenizer, tokenizer
            )));
        }
        Ok(())
    }
}

/// Full image of both tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Last WAL sequence folded into this image.
    pub last_wal_seq: SeqNumber,
    pub next_doc_id: DocId,
    pub documents: Vec<Document>,
    pub postings: Vec<Posting>,
}

impl IndexSnapshot {
    /// Encode as `[crc32: u32 LE][bincode payload]`.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)?;
        let mut bytes = vec![0u8; 4];
        LittleEndian::write_u32(&mut bytes, crc32fast::hash(&payload));
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(NgramdexError::storage("index snapshot is truncated"));
        }
        let (header, payload) = bytes.split_at(4);
        if LittleEndian::read_u32(header) != crc32fast::hash(payload) {
            return Err(NgramdexError::storage("index snapshot checksum mismatch"));
        }
        Ok(bincode::deserialize(payload)?)
    }
}

pub fn load_manifest(storage: &dyn Storage) -> Result<Option<IndexManifest>> {
    if !storage.file_exists(MANIFEST_FILE) {
        return Ok(None);
    }
    let bytes = read_all(storage, MANIFEST_FILE)?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}

pub fn write_manifest(storage: &dyn Storage, manifest: &IndexManifest) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(manifest)?;
    write_atomic(storage, MANIFEST_FILE, &bytes)?;
    storage.sync()
}

pub fn load_snapshot(storage: &dyn Storage) -> Result<Option<IndexSnapshot>> {
    if !storage.file_exists(SNAPSHOT_FILE) {
        return Ok(None);
    }
    let bytes = read_all(storage, SNAPSHOT_FILE)?;
    IndexSnapshot::decode(&bytes).map(Some)
}

/// Write the snapshot, then the manifest pointing at it.
pub fn write_snapshot(
    storage: &dyn Storage,
    tokenizer: TokenizerKind,
    snapshot: &IndexSnapshot,
) -> Result<()> {
    let bytes = snapshot.encode()?;
    write_atomic(storage, SNAPSHOT_FILE, &bytes)?;
    write_manifest(storage, &IndexManifest::new(tokenizer, snapshot.last_wal_seq))?;
    info!(
        "snapshot: wrote {} documents and {} postings at seq {}",
        snapshot.documents.len(),
        snapshot.postings.len(),
        snapshot.last_wal_seq
    );
    Ok(())
}
