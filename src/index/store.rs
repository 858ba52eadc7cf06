//! The index store: document and posting tables behind one lock.
//!
//! Writers go through a [`WriteTransaction`], which holds the exclusive lock
//! from the first staged change until commit or drop. Nothing staged is
//! visible to readers until [`WriteTransaction::commit`] has made it durable
//! in the write-ahead log and applied it to both tables. Readers take a
//! [`ReadView`] on the shared lock and see either all of a commit or none of
//! it.
//!
//! The same code path serves both storage modes. Over a
//! [`MemoryStorage`](crate::storage::memory::MemoryStorage) the log and
//! snapshots live in process memory and vanish with the store.

use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};

use crate::analysis::token::TermFrequencies;
use crate::analysis::tokenizer::TokenizerKind;
use crate::error::{NgramdexError, Result};
use crate::index::document::{DocId, Document, DocumentStore};
use crate::index::posting::PostingStore;
use crate::index::snapshot::{
    IndexManifest, IndexSnapshot, WAL_FILE, load_manifest, load_snapshot, write_manifest,
    write_snapshot,
};
use crate::index::wal::{TransactionBatch, WalEntry, WalManager};
use crate::storage::Storage;
use crate::storage::memory::MemoryStorage;

/// Tuning knobs for an [`IndexStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Checkpoint once the log holds more than this many commits.
    pub checkpoint_threshold: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            checkpoint_threshold: 1024,
        }
    }
}

/// Counters describing the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub tokenizer: TokenizerKind,
    pub document_count: usize,
    pub token_count: usize,
    pub posting_count: usize,
    pub wal_records: usize,
    pub last_wal_seq: u64,
}

/// Both tables, always mutated together.
#[derive(Debug)]
pub(crate) struct IndexState {
    documents: DocumentStore,
    postings: PostingStore,
}

impl IndexState {
    fn new(gram_size: usize) -> Self {
        IndexState {
            documents: DocumentStore::new(),
            postings: PostingStore::new(gram_size),
        }
    }

    fn from_snapshot(gram_size: usize, snapshot: IndexSnapshot) -> Result<Self> {
        let mut state = Self::new(gram_size);
        for document in snapshot.documents {
            state.documents.insert(document)?;
        }
        state.documents.reserve_up_to(snapshot.next_doc_id);

        for posting in snapshot.postings {
            if !state.documents.contains(posting.doc_id) {
                return Err(NgramdexError::storage(format!(
                    "snapshot posting for {:?} references missing document {}",
                    posting.token, posting.doc_id
                )));
            }
            let mut tokens = TermFrequencies::new();
            tokens.add(posting.token, posting.frequency);
            state.postings.merge(posting.doc_id, &tokens)?;
        }
        Ok(state)
    }

    fn to_snapshot(&self, last_wal_seq: u64) -> IndexSnapshot {
        IndexSnapshot {
            last_wal_seq,
            next_doc_id: self.documents.next_id(),
            documents: self.documents.list().cloned().collect(),
            postings: self.postings.rows(),
        }
    }

    /// Check that `apply_batch(batch)` keeps both tables consistent.
    fn validate_batch(&self, batch: &TransactionBatch) -> Result<()> {
        let mut expected = self.documents.next_id();
        for document in &batch.documents {
            self.documents.check_insertable(document.id)?;
            if document.id < expected {
                return Err(NgramdexError::index(format!(
                    "document ids in a transaction must increase (got {} after {})",
                    document.id,
                    expected - 1
                )));
            }
            expected = document.id + 1;
        }

        for (doc_id, terms) in &batch.postings {
            let known = self.documents.contains(*doc_id)
                || batch.documents.iter().any(|document| document.id == *doc_id);
            if !known {
                return Err(NgramdexError::index(format!(
                    "postings reference unknown document {doc_id}"
                )));
            }
            let tokens: TermFrequencies = terms.iter().cloned().collect();
            self.postings.validate(*doc_id, &tokens)?;
        }
        Ok(())
    }

    fn apply_batch(&mut self, batch: TransactionBatch) {
        for document in batch.documents {
            self.documents.insert_unchecked(document);
        }
        for (doc_id, terms) in &batch.postings {
            self.postings
                .apply(*doc_id, terms.iter().map(|(token, count)| (token.as_str(), *count)));
        }
    }
}

/// Shared, concurrently readable index over one [`Storage`].
#[derive(Debug)]
pub struct IndexStore {
    tokenizer: TokenizerKind,
    storage: Arc<dyn Storage>,
    options: StoreOptions,
    state: RwLock<IndexState>,
    wal: WalManager,
}

impl IndexStore {
    /// Open (or create) the index kept in `storage`.
    ///
    /// Loads the snapshot, replays the write-ahead log on top of it and
    /// records the tokenizer in the manifest of a fresh index.
    ///
    /// # Errors
    ///
    /// A configuration error if the stored index was built with another
    /// tokenizer; a storage error if the snapshot or log is unreadable.
    pub fn open(
        storage: Arc<dyn Storage>,
        tokenizer: TokenizerKind,
        options: StoreOptions,
    ) -> Result<Self> {
        let gram_size = tokenizer.gram_size();

        match load_manifest(storage.as_ref())? {
            Some(manifest) => manifest.check_compatible(tokenizer)?,
            None => write_manifest(storage.as_ref(), &IndexManifest::new(tokenizer, 0))?,
        }

        let (mut state, snapshot_seq) = match load_snapshot(storage.as_ref())? {
            Some(snapshot) => {
                let seq = snapshot.last_wal_seq;
                (IndexState::from_snapshot(gram_size, snapshot)?, seq)
            }
            None => (IndexState::new(gram_size), 0),
        };

        let wal = WalManager::new(storage.clone(), WAL_FILE);
        wal.set_next_seq(snapshot_seq + 1);

        let mut replayed = 0;
        for record in wal.read_all()? {
            if record.seq <= snapshot_seq {
                continue;
            }
            let WalEntry::Commit(batch) = record.entry;
            state.validate_batch(&batch).map_err(|e| {
                NgramdexError::storage(format!("corrupt log record {}: {e}", record.seq))
            })?;
            state.apply_batch(batch);
            replayed += 1;
        }

        info!(
            "opened {} index: {} documents, {} postings ({} log records replayed)",
            tokenizer,
            state.documents.len(),
            state.postings.posting_count(),
            replayed
        );

        Ok(IndexStore {
            tokenizer,
            storage,
            options,
            state: RwLock::new(state),
            wal,
        })
    }

    /// A fresh index held in process memory only.
    pub fn in_memory(tokenizer: TokenizerKind) -> Result<Self> {
        Self::open(
            Arc::new(MemoryStorage::new_default()),
            tokenizer,
            StoreOptions::default(),
        )
    }

    pub fn tokenizer_kind(&self) -> TokenizerKind {
        self.tokenizer
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Take a consistent read view. Blocks while a write transaction is open.
    pub fn read(&self) -> ReadView<'_> {
        ReadView {
            state: self.state.read(),
        }
    }

    /// Start a write transaction. Blocks until all other writers and readers
    /// have released the lock.
    pub fn begin_write(&self) -> WriteTransaction<'_> {
        WriteTransaction {
            store: self,
            state: self.state.write(),
            documents: Vec::new(),
            postings: Vec::new(),
            committed: false,
        }
    }

    /// Fold the log into a new snapshot and truncate the log.
    pub fn checkpoint(&self) -> Result<()> {
        let state = self.state.upgradable_read();
        self.checkpoint_locked(&state)
    }

    fn checkpoint_locked(&self, state: &IndexState) -> Result<()> {
        let snapshot = state.to_snapshot(self.wal.last_seq());
        write_snapshot(self.storage.as_ref(), self.tokenizer, &snapshot)?;
        self.wal.truncate()
    }

    /// Write a self-contained copy of the index into `target`.
    pub fn export_to(&self, target: &dyn Storage) -> Result<()> {
        let state = self.read();
        let snapshot = state.state.to_snapshot(self.wal.last_seq());
        target.delete_file(WAL_FILE)?;
        write_snapshot(target, self.tokenizer, &snapshot)?;
        info!("exported {} documents", snapshot.documents.len());
        Ok(())
    }

    /// Checkpoint pending log records and sync the storage.
    pub fn close(&self) -> Result<()> {
        let state = self.state.upgradable_read();
        if !self.wal.is_empty() {
            self.checkpoint_locked(&state)?;
        }
        self.storage.sync()?;
        info!("closed index with {} documents", state.documents.len());
        Ok(())
    }

    pub fn stats(&self) -> IndexStats {
        let state = self.state.read();
        IndexStats {
            tokenizer: self.tokenizer,
            document_count: state.documents.len(),
            token_count: state.postings.token_count(),
            posting_count: state.postings.posting_count(),
            wal_records: self.wal.len(),
            last_wal_seq: self.wal.last_seq(),
        }
    }
}

/// A consistent, read-only view of both tables.
pub struct ReadView<'a> {
    state: RwLockReadGuard<'a, IndexState>,
}

impl ReadView<'_> {
    pub fn documents(&self) -> &DocumentStore {
        &self.state.documents
    }

    pub fn postings(&self) -> &PostingStore {
        &self.state.postings
    }

    pub fn get(&self, id: DocId) -> Option<&Document> {
        self.state.documents.get(id)
    }

    pub fn lookup(&self, token: &str) -> Vec<(DocId, u32)> {
        self.state.postings.lookup(token)
    }
}

/// An exclusive write transaction.
///
/// Staged changes are applied only by [`commit`](Self::commit). Dropping the
/// transaction without committing discards them.
pub struct WriteTransaction<'a> {
    store: &'a IndexStore,
    state: RwLockWriteGuard<'a, IndexState>,
    documents: Vec<Document>,
    postings: Vec<(DocId, TermFrequencies)>,
    committed: bool,
}

impl WriteTransaction<'_> {
    /// Stage a new document and return the id it will have once committed.
    pub fn create_document<T: Into<String>, C: Into<String>>(
        &mut self,
        title: T,
        content: C,
    ) -> DocId {
        let id = match self.documents.last() {
            Some(document) => document.id + 1,
            None => self.state.documents.next_id(),
        };
        self.documents.push(Document::new(id, title, content));
        id
    }

    /// Stage a posting merge for a committed or staged document.
    pub fn merge_postings(&mut self, doc_id: DocId, tokens: &TermFrequencies) -> Result<()> {
        let known = self.state.documents.contains(doc_id)
            || self.documents.iter().any(|document| document.id == doc_id);
        if !known {
            return Err(NgramdexError::index(format!(
                "cannot merge postings into unknown document {doc_id}"
            )));
        }
        self.state.postings.validate(doc_id, tokens)?;

        match self.postings.iter_mut().find(|(id, _)| *id == doc_id) {
            Some((_, staged)) => {
                for (token, count) in tokens.iter() {
                    staged.add(token, count);
                }
            }
            None => self.postings.push((doc_id, tokens.clone())),
        }
        Ok(())
    }

    /// Look up a document, including ones staged in this transaction.
    pub fn get(&self, id: DocId) -> Option<&Document> {
        self.documents
            .iter()
            .find(|document| document.id == id)
            .or_else(|| self.state.documents.get(id))
    }

    /// Make the staged changes durable, then visible.
    ///
    /// On error nothing has been applied and the transaction is rolled back.
    pub fn commit(mut self) -> Result<()> {
        let batch = TransactionBatch {
            documents: std::mem::take(&mut self.documents),
            postings: std::mem::take(&mut self.postings)
                .into_iter()
                .map(|(doc_id, tokens)| (doc_id, tokens.to_sorted_vec()))
                .collect(),
        };
        if batch.is_empty() {
            self.committed = true;
            return Ok(());
        }

        self.state.validate_batch(&batch)?;
        let entry = WalEntry::Commit(batch);
        let seq = self.store.wal.append(&entry)?;

        let WalEntry::Commit(batch) = entry;
        debug!(
            "commit {seq}: {} documents, {} posting groups",
            batch.documents.len(),
            batch.postings.len()
        );
        self.state.apply_batch(batch);
        self.committed = true;

        if self.store.wal.len() > self.store.options.checkpoint_threshold {
            // The commit is already durable in the log.
            if let Err(e) = self.store.checkpoint_locked(&self.state) {
                warn!("checkpoint after commit {seq} failed: {e}");
            }
        }
        Ok(())
    }

    /// Discard the staged changes.
    pub fn rollback(self) {}
}

impl Drop for WriteTransaction<'_> {
    fn drop(&mut self) {
        if !self.committed && !(self.documents.is_empty() && self.postings.is_empty()) {
            debug!(
                "rolled back transaction with {} staged documents",
                self.documents.len()
            );
        }
    }
}
