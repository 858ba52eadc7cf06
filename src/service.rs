//! The search service: one index, its indexer and its query engine.
//!
//! A [`SearchService`] is built once from an [`IndexConfig`] and shared by
//! every request handler (CLI command or HTTP route). It is `Send + Sync`;
//! wrap it in an `Arc` to share it across threads.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::info;

use crate::analysis::tokenizer::TokenizerKind;
use crate::config::IndexConfig;
use crate::error::Result;
use crate::index::document::{DocId, Document};
use crate::index::indexer::Indexer;
use crate::index::store::{IndexStats, IndexStore};
use crate::search::engine::{QueryEngine, SearchHit, SearchRequest};
use crate::storage::{Storage, StorageFactory};

pub struct SearchService {
    config: IndexConfig,
    store: Arc<IndexStore>,
    indexer: Indexer,
    engine: QueryEngine,
}

impl SearchService {
    /// Open (or create) the index described by `config`.
    pub fn open(config: IndexConfig) -> Result<Self> {
        config.validate()?;
        let storage = StorageFactory::create(config.storage.clone())?;
        let store = Arc::new(IndexStore::open(
            storage,
            config.tokenizer,
            config.store_options(),
        )?);
        if !config.storage.is_persistent() {
            info!("in-memory index: contents are lost when the process exits");
        }

        Ok(SearchService {
            indexer: Indexer::new(store.clone()),
            engine: QueryEngine::with_mode(store.clone(), config.scoring),
            store,
            config,
        })
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> TokenizerKind {
        self.store.tokenizer_kind()
    }

    /// Index a document and return its id.
    pub fn add(&self, title: &str, content: &str) -> Result<DocId> {
        self.indexer.add(title, content)
    }

    /// Index several documents atomically.
    pub fn add_batch<'a, I>(&self, documents: I) -> Result<Vec<DocId>>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.indexer.add_batch(documents)
    }

    pub fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        self.engine.search_hits(request)
    }

    pub fn get(&self, id: DocId) -> Result<Option<Document>> {
        Ok(self.store.read().get(id).cloned())
    }

    /// Every document in insertion order.
    pub fn list(&self) -> Result<Vec<Document>> {
        Ok(self.store.read().documents().list().cloned().collect())
    }

    pub fn stats(&self) -> IndexStats {
        self.store.stats()
    }

    /// The whole posting table as token -> [(doc_id, frequency)], sorted.
    pub fn postings_dump(&self) -> BTreeMap<String, Vec<(DocId, u32)>> {
        let mut dump: BTreeMap<String, Vec<(DocId, u32)>> = BTreeMap::new();
        for posting in self.store.read().postings().rows() {
            dump.entry(posting.token)
                .or_default()
                .push((posting.doc_id, posting.frequency));
        }
        dump
    }

    /// Copy the index into another storage.
    pub fn export_to(&self, target: &dyn Storage) -> Result<()> {
        self.store.export_to(target)
    }

    /// Checkpoint and sync. The service stays usable afterwards.
    pub fn close(&self) -> Result<()> {
        self.store.close()
    }
}
