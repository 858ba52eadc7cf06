//! Query evaluation: tokenize, resolve postings, score, rank.

use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::analysis::tokenizer::Tokenizer;
use crate::error::{NgramdexError, Result};
use crate::index::document::DocId;
use crate::index::store::{IndexStore, ReadView};
use crate::search::collector::TopDocsCollector;
use crate::search::scorer::{ScoreAccumulator, ScoringMode};

/// A search to run against the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Maximum number of hits; `None` returns every candidate.
    pub top_k: Option<usize>,
    /// Overrides the engine's default mode when set.
    pub mode: Option<ScoringMode>,
}

impl SearchRequest {
    pub fn new<S: Into<String>>(query: S) -> Self {
        SearchRequest {
            query: query.into(),
            top_k: None,
            mode: None,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_mode(mut self, mode: ScoringMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// A ranked document with its stored fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub title: String,
    pub content: String,
    pub score: u64,
}

/// Ranks documents by n-gram overlap with a query.
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<IndexStore>,
    tokenizer: Arc<dyn Tokenizer>,
    default_mode: ScoringMode,
}

impl QueryEngine {
    pub fn new(store: Arc<IndexStore>) -> Self {
        Self::with_mode(store, ScoringMode::default())
    }

    pub fn with_mode(store: Arc<IndexStore>, default_mode: ScoringMode) -> Self {
        let tokenizer = Arc::new(store.tokenizer_kind().tokenizer());
        QueryEngine {
            store,
            tokenizer,
            default_mode,
        }
    }

    pub fn default_mode(&self) -> ScoringMode {
        self.default_mode
    }

    /// Rank documents for `request`, best first, as `(doc_id, score)`.
    ///
    /// A query that yields no tokens returns an empty list.
    pub fn search(&self, request: &SearchRequest) -> Result<Vec<(DocId, u64)>> {
        let view = self.store.read();
        self.rank(&view, request)
    }

    /// Like [`search`](Self::search), with each hit's title and content
    /// read from the same consistent view.
    pub fn search_hits(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let view = self.store.read();
        self.rank(&view, request)?
            .into_iter()
            .map(|(doc_id, score)| {
                let document = view.get(doc_id).ok_or_else(|| {
                    NgramdexError::storage(format!("posting references missing document {doc_id}"))
                })?;
                Ok(SearchHit {
                    doc_id,
                    title: document.title.clone(),
                    content: document.content.clone(),
                    score,
                })
            })
            .collect()
    }

    fn rank(&self, view: &ReadView<'_>, request: &SearchRequest) -> Result<Vec<(DocId, u64)>> {
        let tokens = self.tokenizer.term_frequencies(&request.query)?;
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mode = request.mode.unwrap_or(self.default_mode);
        let mut accumulator = ScoreAccumulator::new(mode);
        let postings = view.postings();
        if request.query.chars().count() < postings.gram_size() {
            // Shorter than a gram: match it inside every stored token.
            accumulator.add_token(postings.containing(&request.query));
        } else {
            for token in tokens.terms() {
                accumulator.add_token(postings.postings_for(token));
            }
        }

        let mut collector = TopDocsCollector::with_limit(request.top_k);
        for (doc_id, score) in accumulator.finish() {
            collector.collect(doc_id, score);
        }
        debug!(
            "search {:?} ({mode}): {} distinct tokens, {} candidates",
            request.query,
            tokens.distinct_len(),
            collector.total_hits()
        );
        Ok(collector.into_sorted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tokenizer::TokenizerKind;
    use crate::index::indexer::Indexer;

    fn setup(kind: TokenizerKind, contents: &[&str]) -> QueryEngine {
        let store = Arc::new(IndexStore::in_memory(kind).unwrap());
        let indexer = Indexer::new(store.clone());
        for (i, content) in contents.iter().enumerate() {
            indexer.add(&format!("doc{}", i + 1), content).unwrap();
        }
        QueryEngine::new(store)
    }

    #[test]
    fn test_substring_match() {
        let engine = setup(TokenizerKind::Bigram, &["hello world", "goodbye"]);
        let hits = engine.search(&SearchRequest::new("wor")).unwrap();
        assert_eq!(hits, vec![(1, 2)]);
    }

    #[test]
    fn test_no_match() {
        let engine = setup(TokenizerKind::Bigram, &["hello world"]);
        assert!(engine.search(&SearchRequest::new("xyz")).unwrap().is_empty());
    }

    #[test]
    fn test_empty_query() {
        let engine = setup(TokenizerKind::Bigram, &["hello world"]);
        assert!(engine.search(&SearchRequest::new("")).unwrap().is_empty());
    }

    #[test]
    fn test_ranking_by_frequency_then_id() {
        let engine = setup(TokenizerKind::Bigram, &["lo", "lololo", "lo", "x"]);
        let hits = engine.search(&SearchRequest::new("lo")).unwrap();
        assert_eq!(hits, vec![(2, 3), (1, 1), (3, 1)]);
    }

    #[test]
    fn test_top_k() {
        let engine = setup(TokenizerKind::Bigram, &["ab", "abab", "ababab"]);
        let hits = engine.search(&SearchRequest::new("ab").with_top_k(2)).unwrap();
        assert_eq!(hits, vec![(3, 3), (2, 2)]);
    }

    #[test]
    fn test_all_mode() {
        let engine = setup(TokenizerKind::Bigram, &["abcd", "ab", "cd"]);
        let any = engine.search(&SearchRequest::new("abcd")).unwrap();
        assert_eq!(any.len(), 3);

        let all = engine
            .search(&SearchRequest::new("abcd").with_mode(ScoringMode::All))
            .unwrap();
        assert_eq!(all, vec![(1, 3)]);
    }

    #[test]
    fn test_short_query_matches_as_substring() {
        let engine = setup(TokenizerKind::Trigram, &["hi", "high", "hi", "hihi", "oh"]);
        let hits = engine.search(&SearchRequest::new("hi")).unwrap();
        assert_eq!(hits, vec![(4, 2), (1, 1), (2, 1), (3, 1)]);

        let all = engine
            .search(&SearchRequest::new("hi").with_mode(ScoringMode::All))
            .unwrap();
        assert_eq!(all, hits);
        assert!(engine.search(&SearchRequest::new("x")).unwrap().is_empty());
    }

    #[test]
    fn test_search_hits_materialise_documents() {
        let engine = setup(TokenizerKind::Bigram, &["hello world"]);
        let hits = engine.search_hits(&SearchRequest::new("hello")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "doc1");
        assert_eq!(hits[0].content, "hello world");
        assert_eq!(hits[0].score, 4);
    }
}
