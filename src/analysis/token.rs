//! Token types produced by the tokenizers.
//!
//! # Core Types
//!
//! - [`Token`] - A single n-gram with its position and byte offsets
//! - [`TokenStream`] - Type alias for boxed iterator of tokens
//! - [`TermFrequencies`] - The token multiset of one text (token -> count)
//!
//! # Examples
//!
//! ```
//! use ngramdex::analysis::token::{TermFrequencies, Token};
//!
//! let tokens = vec![Token::new("ab", 0), Token::new("ba", 1), Token::new("ab", 2)];
//! let frequencies = TermFrequencies::from_tokens(tokens);
//! assert_eq!(frequencies.get("ab"), 2);
//! assert_eq!(frequencies.distinct_len(), 2);
//! assert_eq!(frequencies.total(), 3);
//! ```

use std::fmt;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// A token represents a single n-gram cut from the input text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The text content of the token
    pub text: String,

    /// The position of the token in the token stream (0-based)
    pub position: usize,

    /// The byte offset where this token starts in the original text
    pub start_offset: usize,

    /// The byte offset where this token ends in the original text
    pub end_offset: usize,
}

impl Token {
    /// Create a new token without offset information.
    pub fn new<S: Into<String>>(text: S, position: usize) -> Self {
        let text = text.into();
        let end_offset = text.len();
        Token {
            text,
            position,
            start_offset: 0,
            end_offset,
        }
    }

    /// Create a new token with explicit byte offsets.
    pub fn with_offsets<S: Into<String>>(
        text: S,
        position: usize,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset,
            end_offset,
        }
    }

    /// Number of Unicode code points in the token.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether the token text is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.text, self.position)
    }
}

/// A boxed stream of tokens.
pub type TokenStream = Box<dyn Iterator<Item = Token>>;

/// The multiset of tokens for one piece of text.
///
/// Keys are n-grams, values the number of times each occurs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TermFrequencies {
    counts: AHashMap<String, u32>,
}

impl TermFrequencies {
    /// Create an empty multiset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a multiset from a token stream.
    pub fn from_tokens<I: IntoIterator<Item = Token>>(tokens: I) -> Self {
        let mut frequencies = Self::new();
        for token in tokens {
            frequencies.add(token.text, 1);
        }
        frequencies
    }

    /// Add `count` occurrences of `term`.
    pub fn add<S: Into<String>>(&mut self, term: S, count: u32) {
        let entry = self.counts.entry(term.into()).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    /// Occurrences of `term`, zero if absent.
    pub fn get(&self, term: &str) -> u32 {
        self.counts.get(term).copied().unwrap_or(0)
    }

    /// Number of distinct terms.
    pub fn distinct_len(&self) -> usize {
        self.counts.len()
    }

    /// Total number of occurrences across all terms.
    pub fn total(&self) -> u64 {
        self.counts.values().map(|&count| u64::from(count)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterate over `(term, count)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(term, &count)| (term.as_str(), count))
    }

    /// Distinct terms in arbitrary order.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    /// Pairs sorted by term, for stable serialization.
    pub fn to_sorted_vec(&self) -> Vec<(String, u32)> {
        let mut pairs: Vec<(String, u32)> = self
            .counts
            .iter()
            .map(|(term, &count)| (term.clone(), count))
            .collect();
        pairs.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        pairs
    }
}

impl FromIterator<(String, u32)> for TermFrequencies {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        let mut frequencies = Self::new();
        for (term, count) in iter {
            frequencies.add(term, count);
        }
        frequencies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_creation() {
        let token = Token::with_offsets("日本", 0, 0, 6);
        assert_eq!(token.char_len(), 2);
        assert_eq!(token.end_offset, 6);
        assert_eq!(token.to_string(), "日本@0");
    }

    #[test]
    fn test_term_frequencies() {
        let frequencies = TermFrequencies::from_tokens(vec![
            Token::new("lo", 0),
            Token::new("ol", 1),
            Token::new("lo", 2),
        ]);

        assert_eq!(frequencies.get("lo"), 2);
        assert_eq!(frequencies.get("ol"), 1);
        assert_eq!(frequencies.get("zz"), 0);
        assert_eq!(frequencies.total(), 3);
        assert_eq!(
            frequencies.to_sorted_vec(),
            vec![("lo".to_string(), 2), ("ol".to_string(), 1)]
        );
    }

    #[test]
    fn test_from_pairs_merges_duplicates() {
        let frequencies: TermFrequencies =
            vec![("ab".to_string(), 1), ("ab".to_string(), 4)].into_iter().collect();
        assert_eq!(frequencies.get("ab"), 5);
        assert_eq!(frequencies.distinct_len(), 1);
    }
}
