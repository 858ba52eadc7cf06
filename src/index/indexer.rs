//! Document ingestion.

use std::sync::Arc;

use log::debug;

use crate::analysis::token::TermFrequencies;
use crate::analysis::tokenizer::Tokenizer;
use crate::error::Result;
use crate::index::document::DocId;
use crate::index::store::IndexStore;

/// Adds documents to an [`IndexStore`].
///
/// Each document is stored and its content postings merged inside a single
/// write transaction, so a document is never visible without its postings.
/// Titles are stored but not indexed.
#[derive(Clone)]
pub struct Indexer {
    store: Arc<IndexStore>,
    tokenizer: Arc<dyn Tokenizer>,
}

impl Indexer {
    /// Create an indexer using the tokenizer the store was opened with.
    pub fn new(store: Arc<IndexStore>) -> Self {
        let tokenizer = Arc::new(store.tokenizer_kind().tokenizer());
        Indexer { store, tokenizer }
    }

    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }

    /// Add one document and return its id.
    pub fn add(&self, title: &str, content: &str) -> Result<DocId> {
        let ids = self.add_batch([(title, content)])?;
        Ok(ids[0])
    }

    /// Add several documents in one transaction.
    ///
    /// Either every document is added or none is.
    pub fn add_batch<'a, I>(&self, documents: I) -> Result<Vec<DocId>>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        // Tokenize before taking the write lock.
        let analyzed = documents
            .into_iter()
            .map(|(title, content)| {
                let tokens = self.tokenizer.term_frequencies(content)?;
                Ok((title, content, tokens))
            })
            .collect::<Result<Vec<(&str, &str, TermFrequencies)>>>()?;

        let mut txn = self.store.begin_write();
        let mut ids = Vec::with_capacity(analyzed.len());
        for (title, content, tokens) in analyzed {
            let id = txn.create_document(title, content);
            if !tokens.is_empty() {
                txn.merge_postings(id, &tokens)?;
            }
            debug!("indexed document {id}: {} distinct tokens", tokens.distinct_len());
            ids.push(id);
        }
        txn.commit()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tokenizer::TokenizerKind;

    fn indexer(kind: TokenizerKind) -> Indexer {
        Indexer::new(Arc::new(IndexStore::in_memory(kind).unwrap()))
    }

    #[test]
    fn test_add_indexes_content() {
        let indexer = indexer(TokenizerKind::Bigram);
        let id = indexer.add("greeting", "hello hello").unwrap();
        assert_eq!(id, 1);

        let view = indexer.store().read();
        assert_eq!(view.get(id).unwrap().content, "hello hello");
        assert_eq!(view.postings().frequency("ll", id), Some(2));
        assert_eq!(view.postings().frequency("o ", id), Some(1));
        // Titles are not indexed.
        assert!(view.lookup("gr").is_empty());
    }

    #[test]
    fn test_add_empty_content() {
        let indexer = indexer(TokenizerKind::Trigram);
        let id = indexer.add("empty", "").unwrap();

        let view = indexer.store().read();
        assert!(view.documents().contains(id));
        assert_eq!(view.postings().posting_count(), 0);
    }

    #[test]
    fn test_short_content_is_one_token() {
        let indexer = indexer(TokenizerKind::Trigram);
        let id = indexer.add("short", "hi").unwrap();
        assert_eq!(indexer.store().read().lookup("hi"), vec![(id, 1)]);
    }

    #[test]
    fn test_add_batch_assigns_sequential_ids() {
        let indexer = indexer(TokenizerKind::Bigram);
        indexer.add("first", "abc").unwrap();
        let ids = indexer
            .add_batch([("a", "xyz"), ("b", "xyzzy"), ("c", "")])
            .unwrap();
        assert_eq!(ids, vec![2, 3, 4]);

        let mut hits = indexer.store().read().lookup("xy");
        hits.sort();
        assert_eq!(hits, vec![(2, 1), (3, 1)]);
    }
}
