//! N-gram tokenizer implementation.

use crate::analysis::token::{Token, TokenStream};
use crate::analysis::tokenizer::{Tokenizer, TokenizerKind};
use crate::error::{NgramdexError, Result};

/// A tokenizer that generates fixed-size character n-grams.
///
/// The window slides one Unicode code point at a time, so multi-byte scripts
/// produce meaningful grams. Text shorter than `n` (but not empty) yields a
/// single token holding the whole text, which keeps short documents reachable
/// by a short query.
///
/// # Examples
///
/// ```
/// use ngramdex::analysis::tokenizer::ngram::NgramTokenizer;
/// use ngramdex::analysis::tokenizer::Tokenizer;
///
/// let tokenizer = NgramTokenizer::bigram();
/// let tokens: Vec<_> = tokenizer.tokenize("hello").unwrap()
///     .map(|t| t.text)
///     .collect();
/// assert_eq!(tokens, vec!["he", "el", "ll", "lo"]);
///
/// // Degenerate: shorter than n
/// let tokenizer = NgramTokenizer::trigram();
/// let tokens: Vec<_> = tokenizer.tokenize("ab").unwrap()
///     .map(|t| t.text)
///     .collect();
/// assert_eq!(tokens, vec!["ab"]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NgramTokenizer {
    /// N-gram size
    gram_size: usize,
}

impl NgramTokenizer {
    /// Create a new n-gram tokenizer.
    ///
    /// # Errors
    ///
    /// Returns a configuration error unless `gram_size` is 2 or 3.
    pub fn new(gram_size: usize) -> Result<Self> {
        match gram_size {
            2 => Ok(Self::bigram()),
            3 => Ok(Self::trigram()),
            other => Err(NgramdexError::configuration(format!(
                "unsupported n-gram size {other} (expected 2 or 3)"
            ))),
        }
    }

    /// Create a bigram tokenizer (n=2).
    pub fn bigram() -> Self {
        Self { gram_size: 2 }
    }

    /// Create a trigram tokenizer (n=3).
    pub fn trigram() -> Self {
        Self { gram_size: 3 }
    }

    pub fn from_kind(kind: TokenizerKind) -> Self {
        Self {
            gram_size: kind.gram_size(),
        }
    }

    pub fn gram_size(&self) -> usize {
        self.gram_size
    }

    pub fn kind(&self) -> TokenizerKind {
        if self.gram_size == 3 {
            TokenizerKind::Trigram
        } else {
            TokenizerKind::Bigram
        }
    }
}

impl Tokenizer for NgramTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        if text.is_empty() {
            return Ok(Box::new(std::iter::empty()));
        }

        // Byte offset of every code point, plus the end of the text.
        let mut boundaries: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
        let char_count = boundaries.len();
        boundaries.push(text.len());

        if char_count < self.gram_size {
            let token = Token::with_offsets(text, 0, 0, text.len());
            return Ok(Box::new(std::iter::once(token)));
        }

        let tokens: Vec<Token> = (0..=char_count - self.gram_size)
            .map(|start| {
                let start_offset = boundaries[start];
                let end_offset = boundaries[start + self.gram_size];
                Token::with_offsets(
                    &text[start_offset..end_offset],
                    start,
                    start_offset,
                    end_offset,
                )
            })
            .collect();

        Ok(Box::new(tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        match self.gram_size {
            3 => "trigram",
            _ => "bigram",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokenizer: &NgramTokenizer, text: &str) -> Vec<String> {
        tokenizer.tokenize(text).unwrap().map(|t| t.text).collect()
    }

    #[test]
    fn test_ngram_creation() {
        assert!(NgramTokenizer::new(2).is_ok());
        assert!(NgramTokenizer::new(3).is_ok());
        assert!(NgramTokenizer::new(0).is_err());
        assert!(NgramTokenizer::new(4).is_err());
    }

    #[test]
    fn test_bigram() {
        let tokenizer = NgramTokenizer::bigram();
        assert_eq!(
            texts(&tokenizer, "hello world"),
            vec!["he", "el", "ll", "lo", "o ", " w", "wo", "or", "rl", "ld"]
        );
    }

    #[test]
    fn test_trigram() {
        let tokenizer = NgramTokenizer::trigram();
        assert_eq!(texts(&tokenizer, "abcde"), vec!["abc", "bcd", "cde"]);
    }

    #[test]
    fn test_no_preprocessing() {
        // Case, punctuation and whitespace are all kept.
        let tokenizer = NgramTokenizer::bigram();
        assert_eq!(texts(&tokenizer, "A,b"), vec!["A,", ",b"]);
    }

    #[test]
    fn test_unicode_support() {
        let tokenizer = NgramTokenizer::bigram();
        let tokens: Vec<Token> = tokenizer.tokenize("日本語").unwrap().collect();

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "日本");
        assert_eq!(tokens[1].text, "本語");

        // "日" = 3 bytes, "本" = 3 bytes, "語" = 3 bytes in UTF-8
        assert_eq!(tokens[0].start_offset, 0);
        assert_eq!(tokens[0].end_offset, 6);
        assert_eq!(tokens[1].start_offset, 3);
        assert_eq!(tokens[1].end_offset, 9);
        assert_eq!(tokens[1].position, 1);
    }

    #[test]
    fn test_short_text_is_single_token() {
        let tokenizer = NgramTokenizer::trigram();
        let tokens: Vec<Token> = tokenizer.tokenize("ab").unwrap().collect();

        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "ab");
        assert_eq!(texts(&NgramTokenizer::bigram(), "語"), vec!["語"]);
    }

    #[test]
    fn test_empty_text() {
        let tokenizer = NgramTokenizer::bigram();
        assert!(texts(&tokenizer, "").is_empty());
    }

    #[test]
    fn test_exact_length() {
        let tokenizer = NgramTokenizer::trigram();
        assert_eq!(texts(&tokenizer, "abc"), vec!["abc"]);
    }

    #[test]
    fn test_deterministic() {
        let tokenizer = NgramTokenizer::bigram();
        let text = "ゴジラとゴジラ";
        assert_eq!(texts(&tokenizer, text), texts(&tokenizer, text));
    }

    #[test]
    fn test_tokenizer_name() {
        assert_eq!(NgramTokenizer::bigram().name(), "bigram");
        assert_eq!(NgramTokenizer::trigram().name(), "trigram");
        assert_eq!(NgramTokenizer::trigram().kind(), TokenizerKind::Trigram);
    }
}
