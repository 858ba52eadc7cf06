//! Posting table (the inverted index proper).
//!
//! Maps every token to the documents containing it together with the number
//! of occurrences in each. There is one entry per (token, doc_id) pair.

use std::collections::hash_map::Entry;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::analysis::token::TermFrequencies;
use crate::error::{NgramdexError, Result};
use crate::index::document::DocId;

/// One row of the posting table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub token: String,
    pub doc_id: DocId,
    pub frequency: u32,
}

/// The token -> postings map for one n-gram size.
#[derive(Clone, Debug)]
pub struct PostingStore {
    /// Maximum token length in code points.
    gram_size: usize,
    postings: AHashMap<String, AHashMap<DocId, u32>>,
    posting_count: usize,
}

impl PostingStore {
    pub fn new(gram_size: usize) -> Self {
        PostingStore {
            gram_size,
            postings: AHashMap::new(),
            posting_count: 0,
        }
    }

    pub fn gram_size(&self) -> usize {
        self.gram_size
    }

    /// Add `tokens` to the postings of `doc_id`.
    ///
    /// For each distinct token the stored frequency grows by its count in the
    /// multiset; missing (token, doc_id) rows are created. The call is
    /// all-or-nothing: every token is checked before anything changes.
    pub fn merge(&mut self, doc_id: DocId, tokens: &TermFrequencies) -> Result<()> {
        self.validate(doc_id, tokens)?;
        self.apply(doc_id, tokens.iter());
        Ok(())
    }

    /// Check that `merge(doc_id, tokens)` would succeed.
    pub fn validate(&self, doc_id: DocId, tokens: &TermFrequencies) -> Result<()> {
        for (token, count) in tokens.iter() {
            let length = token.chars().count();
            if length == 0 || length > self.gram_size {
                return Err(NgramdexError::index(format!(
                    "token {token:?} has {length} characters, expected 1..={}",
                    self.gram_size
                )));
            }
            if count == 0 {
                return Err(NgramdexError::index(format!(
                    "token {token:?} has a zero frequency"
                )));
            }
            let current = self.frequency(token, doc_id).unwrap_or(0);
            if current.checked_add(count).is_none() {
                return Err(NgramdexError::index(format!(
                    "frequency of {token:?} in document {doc_id} overflows"
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn apply<'a, I>(&mut self, doc_id: DocId, tokens: I)
    where
        I: IntoIterator<Item = (&'a str, u32)>,
    {
        for (token, count) in tokens {
            let documents = self.postings.entry(token.to_string()).or_default();
            match documents.entry(doc_id) {
                Entry::Occupied(mut entry) => {
                    let frequency = entry.get_mut();
                    *frequency = frequency.saturating_add(count);
                }
                Entry::Vacant(entry) => {
                    entry.insert(count);
                    self.posting_count += 1;
                }
            }
        }
    }

    /// All `(doc_id, frequency)` pairs for `token`, unordered.
    pub fn lookup(&self, token: &str) -> Vec<(DocId, u32)> {
        self.postings_for(token).collect()
    }

    /// Borrowing variant of [`lookup`](Self::lookup).
    pub fn postings_for<'a>(&'a self, token: &str) -> impl Iterator<Item = (DocId, u32)> + 'a {
        self.postings
            .get(token)
            .into_iter()
            .flat_map(|documents| documents.iter().map(|(&doc_id, &frequency)| (doc_id, frequency)))
    }

    /// Postings of every token that contains `needle`, with the frequencies
    /// of each document summed across those tokens.
    ///
    /// This is how a fragment shorter than the gram size is resolved: each
    /// of its occurrences lies inside at least one stored token.
    pub fn containing(&self, needle: &str) -> AHashMap<DocId, u32> {
        let mut merged: AHashMap<DocId, u32> = AHashMap::new();
        for (_, documents) in self.postings.iter().filter(|(token, _)| token.contains(needle)) {
            for (&doc_id, &frequency) in documents {
                let total = merged.entry(doc_id).or_default();
                *total = total.saturating_add(frequency);
            }
        }
        merged
    }

    pub fn frequency(&self, token: &str, doc_id: DocId) -> Option<u32> {
        self.postings
            .get(token)
            .and_then(|documents| documents.get(&doc_id).copied())
    }

    /// Number of distinct tokens.
    pub fn token_count(&self) -> usize {
        self.postings.len()
    }

    /// Number of (token, doc_id) rows.
    pub fn posting_count(&self) -> usize {
        self.posting_count
    }

    /// Every row, sorted by token then doc_id.
    pub fn rows(&self) -> Vec<Posting> {
        let mut rows: Vec<Posting> = self
            .postings
            .iter()
            .flat_map(|(token, documents)| {
                documents.iter().map(move |(&doc_id, &frequency)| Posting {
                    token: token.clone(),
                    doc_id,
                    frequency,
                })
            })
            .collect();
        rows.sort_unstable_by(|a, b| a.token.cmp(&b.token).then(a.doc_id.cmp(&b.doc_id)));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frequencies(pairs: &[(&str, u32)]) -> TermFrequencies {
        pairs.iter().map(|(t, c)| (t.to_string(), *c)).collect()
    }

    #[test]
    fn test_merge_and_lookup() {
        let mut store = PostingStore::new(2);
        store.merge(1, &frequencies(&[("lo", 1), ("he", 1)])).unwrap();
        store.merge(2, &frequencies(&[("lo", 3)])).unwrap();

        let mut postings = store.lookup("lo");
        postings.sort();
        assert_eq!(postings, vec![(1, 1), (2, 3)]);
        assert!(store.lookup("zz").is_empty());
        assert_eq!(store.token_count(), 2);
        assert_eq!(store.posting_count(), 3);
    }

    #[test]
    fn test_merge_increments_existing_rows() {
        let mut store = PostingStore::new(2);
        store.merge(1, &frequencies(&[("ab", 2)])).unwrap();
        store.merge(1, &frequencies(&[("ab", 3), ("bc", 1)])).unwrap();

        assert_eq!(store.frequency("ab", 1), Some(5));
        assert_eq!(store.posting_count(), 2);
    }

    #[test]
    fn test_merge_is_all_or_nothing() {
        let mut store = PostingStore::new(2);
        let bad = frequencies(&[("ab", 1), ("abc", 1)]);

        assert!(store.merge(1, &bad).is_err());
        assert_eq!(store.token_count(), 0);
        assert!(store.lookup("ab").is_empty());
    }

    #[test]
    fn test_short_tokens_are_accepted() {
        let mut store = PostingStore::new(3);
        store.merge(1, &frequencies(&[("a", 1), ("日本", 1)])).unwrap();
        assert_eq!(store.frequency("日本", 1), Some(1));
    }

    #[test]
    fn test_containing_sums_over_matching_tokens() {
        let mut store = PostingStore::new(3);
        store.merge(1, &frequencies(&[("hi", 1)])).unwrap();
        store.merge(2, &frequencies(&[("hig", 1), ("igh", 1)])).unwrap();
        store.merge(3, &frequencies(&[("hih", 1), ("ihi", 1)])).unwrap();

        let mut found: Vec<(DocId, u32)> = store.containing("hi").into_iter().collect();
        found.sort_unstable();
        assert_eq!(found, vec![(1, 1), (2, 1), (3, 2)]);
        assert!(store.containing("xy").is_empty());
    }

    #[test]
    fn test_frequency_overflow_rejected() {
        let mut store = PostingStore::new(2);
        store.merge(1, &frequencies(&[("ab", u32::MAX)])).unwrap();
        assert!(store.merge(1, &frequencies(&[("ab", 1)])).is_err());
        assert_eq!(store.frequency("ab", 1), Some(u32::MAX));
    }

    #[test]
    fn test_rows_sorted() {
        let mut store = PostingStore::new(2);
        store.merge(2, &frequencies(&[("b", 1), ("a", 1)])).unwrap();
        store.merge(1, &frequencies(&[("b", 4)])).unwrap();

        let rows: Vec<(String, DocId, u32)> = store
            .rows()
            .into_iter()
            .map(|p| (p.token, p.doc_id, p.frequency))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("a".to_string(), 2, 1),
                ("b".to_string(), 1, 4),
                ("b".to_string(), 2, 1)
            ]
        );
    }
}
