use std::io::{Seek, SeekFrom, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use ngramdex::analysis::token::TermFrequencies;
use ngramdex::analysis::tokenizer::TokenizerKind;
use ngramdex::error::{NgramdexError, Result};
use ngramdex::index::{IndexStore, Indexer, StoreOptions};
use ngramdex::search::{QueryEngine, SearchRequest};
use ngramdex::storage::memory::MemoryStorage;
use ngramdex::storage::{Storage, StorageInput, StorageOutput};

/// Which storage operations fail while armed.
#[derive(Debug, Default)]
struct Faults {
    write: AtomicBool,
    sync: AtomicBool,
    rename: AtomicBool,
}

/// Memory storage that injects the armed faults.
#[derive(Debug)]
struct FaultyStorage {
    inner: MemoryStorage,
    faults: Arc<Faults>,
}

impl FaultyStorage {
    fn new() -> Self {
        FaultyStorage {
            inner: MemoryStorage::new_default(),
            faults: Arc::new(Faults::default()),
        }
    }

    fn wrap(&self, inner: Box<dyn StorageOutput>) -> Box<dyn StorageOutput> {
        Box::new(FaultyOutput {
            inner,
            faults: self.faults.clone(),
        })
    }
}

#[derive(Debug)]
struct FaultyOutput {
    inner: Box<dyn StorageOutput>,
    faults: Arc<Faults>,
}

impl Write for FaultyOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.faults.write.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("simulated disk failure"));
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for FaultyOutput {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl StorageOutput for FaultyOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        if self.faults.sync.load(Ordering::SeqCst) {
            return Err(NgramdexError::storage("simulated fsync failure"));
        }
        self.inner.flush_and_sync()
    }

    fn position(&self) -> Result<u64> {
        self.inner.position()
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}

impl Storage for FaultyStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        self.inner.open_input(name)
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        Ok(self.wrap(self.inner.create_output(name)?))
    }

    fn create_output_append(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        Ok(self.wrap(self.inner.create_output_append(name)?))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.inner.file_exists(name)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.inner.delete_file(name)
    }

    fn list_files(&self) -> Result<Vec<String>> {
        self.inner.list_files()
    }

    fn file_size(&self, name: &str) -> Result<u64> {
        self.inner.file_size(name)
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        if self.faults.rename.load(Ordering::SeqCst) {
            return Err(NgramdexError::storage("simulated rename failure"));
        }
        self.inner.rename_file(old_name, new_name)
    }

    fn sync(&self) -> Result<()> {
        self.inner.sync()
    }
}

fn titles(store: &IndexStore) -> Vec<String> {
    store
        .read()
        .documents()
        .list()
        .map(|d| d.title.clone())
        .collect()
}

#[test]
fn test_failed_add_leaves_no_trace() -> Result<()> {
    let storage = Arc::new(FaultyStorage::new());
    let faults = storage.faults.clone();
    let store = Arc::new(IndexStore::open(
        storage.clone(),
        TokenizerKind::Bigram,
        StoreOptions::default(),
    )?);
    let indexer = Indexer::new(store.clone());
    let engine = QueryEngine::new(store.clone());

    indexer.add("before", "stable text")?;

    faults.write.store(true, Ordering::SeqCst);
    let err = indexer.add("failed", "unique zebra")
        .expect_err("add must fail while storage is failing");
    assert!(err.is_storage());
    faults.write.store(false, Ordering::SeqCst);

    {
        let view = store.read();
        assert!(view.get(2).is_none());
        assert_eq!(view.documents().len(), 1);
        assert!(view.lookup("ze").is_empty());
        assert!(view.lookup("eb").is_empty());
    }
    assert!(engine.search(&SearchRequest::new("zebra"))?.is_empty());

    // The failed add consumed no id and nothing of it survives a reopen.
    assert_eq!(indexer.add("after", "zebra")?, 2);
    drop((indexer, engine, store));

    let reopened = IndexStore::open(storage, TokenizerKind::Bigram, StoreOptions::default())?;
    let view = reopened.read();
    let titles: Vec<&str> = view.documents().list().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["before", "after"]);
    assert!(view.lookup("un").is_empty());
    Ok(())
}

#[test]
fn test_failed_sync_leaves_no_trace() -> Result<()> {
    let storage = Arc::new(FaultyStorage::new());
    let faults = storage.faults.clone();
    let store = Arc::new(IndexStore::open(
        storage.clone(),
        TokenizerKind::Bigram,
        StoreOptions::default(),
    )?);
    let indexer = Indexer::new(store.clone());

    indexer.add("before", "stable text")?;

    // Every byte of the record is written; only the fsync reports failure.
    faults.sync.store(true, Ordering::SeqCst);
    let err = indexer.add("failed", "unique zebra")
        .expect_err("add must fail when the log cannot be synced");
    assert!(err.is_storage());
    faults.sync.store(false, Ordering::SeqCst);

    assert_eq!(indexer.add("after", "zebra")?, 2);
    drop((indexer, store));

    let reopened = IndexStore::open(storage, TokenizerKind::Bigram, StoreOptions::default())?;
    assert_eq!(titles(&reopened), vec!["before", "after"]);
    assert!(reopened.read().lookup("un").is_empty());
    assert_eq!(Indexer::new(Arc::new(reopened)).add("next", "more")?, 3);
    Ok(())
}

#[test]
fn test_failed_checkpoint_keeps_committed_adds() -> Result<()> {
    let storage = Arc::new(FaultyStorage::new());
    let faults = storage.faults.clone();
    let options = StoreOptions {
        checkpoint_threshold: 1,
    };
    let store = Arc::new(IndexStore::open(storage.clone(), TokenizerKind::Bigram, options)?);
    let indexer = Indexer::new(store.clone());

    // Snapshots cannot be published, but the log still holds each commit.
    faults.rename.store(true, Ordering::SeqCst);
    for i in 1..=3 {
        assert_eq!(indexer.add(&format!("doc{i}"), "text")?, i);
    }
    assert_eq!(store.stats().wal_records, 3);
    faults.rename.store(false, Ordering::SeqCst);
    drop((indexer, store));

    let reopened = IndexStore::open(storage, TokenizerKind::Bigram, options)?;
    assert_eq!(titles(&reopened), vec!["doc1", "doc2", "doc3"]);
    Ok(())
}

#[test]
fn test_rejected_posting_merge_rolls_back_document() -> Result<()> {
    let store = IndexStore::in_memory(TokenizerKind::Bigram)?;

    let mut txn = store.begin_write();
    let id = txn.create_document("orphan", "abc");
    let mut tokens = TermFrequencies::new();
    tokens.add("abc", 1);
    assert!(txn.merge_postings(id, &tokens).is_err());
    drop(txn);

    let view = store.read();
    assert!(view.get(id).is_none());
    assert!(view.documents().is_empty());
    assert_eq!(view.postings().posting_count(), 0);
    Ok(())
}

#[test]
fn test_concurrent_adds_and_searches() -> Result<()> {
    let store = Arc::new(IndexStore::in_memory(TokenizerKind::Trigram)?);
    let writers = 4;
    let per_writer = 50;

    let handles: Vec<_> = (0..writers)
        .map(|w| {
            let indexer = Indexer::new(store.clone());
            thread::spawn(move || -> Result<()> {
                for i in 0..per_writer {
                    indexer.add(&format!("w{w}-{i}"), "shared needle text")?;
                }
                Ok(())
            })
        })
        .chain((0..4).map(|_| {
            let engine = QueryEngine::new(store.clone());
            let store = store.clone();
            thread::spawn(move || -> Result<()> {
                for _ in 0..100 {
                    let hits = engine.search(&SearchRequest::new("needle"))?;
                    // Every hit matches all four trigrams exactly once.
                    assert!(hits.iter().all(|(_, score)| *score == 4));
                    let documents = store.read().documents().len();
                    assert!(hits.len() <= documents);
                }
                Ok(())
            })
        }))
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked")?;
    }

    let hits = QueryEngine::new(store.clone()).search(&SearchRequest::new("needle"))?;
    assert_eq!(hits.len(), writers * per_writer);
    let ids: Vec<u64> = hits.iter().map(|(id, _)| *id).collect();
    let expected: Vec<u64> = (1..=(writers * per_writer) as u64).collect();
    assert_eq!(ids, expected);
    Ok(())
}
