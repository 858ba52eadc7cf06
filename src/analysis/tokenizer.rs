//! Tokenizer trait and the closed set of tokenizer configurations.
//!
//! An index is built with exactly one [`TokenizerKind`], chosen once when the
//! index is configured. Queries must be tokenized with the same kind; the
//! persisted manifest records it so a mismatched reopen is rejected.
//!
//! # Examples
//!
//! ```
//! use ngramdex::analysis::tokenizer::{Tokenizer, TokenizerKind};
//!
//! let kind: TokenizerKind = "trigram".parse().unwrap();
//! let tokens: Vec<_> = kind.tokenizer().tokenize("hello").unwrap()
//!     .map(|t| t.text)
//!     .collect();
//! assert_eq!(tokens, vec!["hel", "ell", "llo"]);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analysis::token::{TermFrequencies, TokenStream};
use crate::analysis::tokenizer::ngram::NgramTokenizer;
use crate::error::{NgramdexError, Result};

/// Trait for tokenizers that convert text into tokens.
///
/// The trait requires `Send + Sync` so a tokenizer can be shared by the
/// indexer and the query engine across threads.
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text into a stream of tokens.
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;

    /// Tokenize and fold the stream into a token multiset.
    fn term_frequencies(&self, text: &str) -> Result<TermFrequencies> {
        Ok(TermFrequencies::from_tokens(self.tokenize(text)?))
    }
}

/// The supported n-gram sizes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    /// Character bigrams (n = 2).
    #[default]
    Bigram,
    /// Character trigrams (n = 3).
    Trigram,
}

impl TokenizerKind {
    /// The n-gram size for this kind.
    pub fn gram_size(self) -> usize {
        match self {
            TokenizerKind::Bigram => 2,
            TokenizerKind::Trigram => 3,
        }
    }

    /// Build the tokenizer for this kind.
    pub fn tokenizer(self) -> NgramTokenizer {
        NgramTokenizer::from_kind(self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TokenizerKind::Bigram => "bigram",
            TokenizerKind::Trigram => "trigram",
        }
    }
}

impl fmt::Display for TokenizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenizerKind {
    type Err = NgramdexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bigram" | "2" => Ok(TokenizerKind::Bigram),
            "trigram" | "3" => Ok(TokenizerKind::Trigram),
            other => Err(NgramdexError::configuration(format!(
                "unknown tokenizer '{other}' (expected bigram or trigram)"
            ))),
        }
    }
}

pub mod ngram;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!("Bigram".parse::<TokenizerKind>().unwrap(), TokenizerKind::Bigram);
        assert_eq!("TRIGRAM".parse::<TokenizerKind>().unwrap(), TokenizerKind::Trigram);
        assert_eq!("3".parse::<TokenizerKind>().unwrap(), TokenizerKind::Trigram);

        let err = "Quadgram".parse::<TokenizerKind>().unwrap_err();
        assert!(matches!(err, NgramdexError::Configuration(_)));
    }

    #[test]
    fn test_gram_size() {
        assert_eq!(TokenizerKind::Bigram.gram_size(), 2);
        assert_eq!(TokenizerKind::Trigram.gram_size(), 3);
        assert_eq!(TokenizerKind::default(), TokenizerKind::Bigram);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&TokenizerKind::Trigram).unwrap();
        assert_eq!(json, "\"trigram\"");
        let kind: TokenizerKind = serde_json::from_str("\"bigram\"").unwrap();
        assert_eq!(kind, TokenizerKind::Bigram);
    }

    #[test]
    fn test_term_frequencies_default_method() {
        let frequencies = TokenizerKind::Bigram
            .tokenizer()
            .term_frequencies("lolo")
            .unwrap();
        assert_eq!(frequencies.get("lo"), 2);
        assert_eq!(frequencies.get("ol"), 1);
    }
}
