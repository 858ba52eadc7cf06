//! Candidate scoring.

use std::fmt;
use std::str::FromStr;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{NgramdexError, Result};
use crate::index::document::DocId;

/// Which documents qualify as candidates for a query.
///
/// In both modes a candidate's score is the sum, over the distinct query
/// tokens it contains, of that token's frequency in the document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// Any document sharing at least one query token.
    #[default]
    Any,
    /// Only documents containing every distinct query token.
    All,
}

impl ScoringMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoringMode::Any => "any",
            ScoringMode::All => "all",
        }
    }
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoringMode {
    type Err = NgramdexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "any" | "or" => Ok(ScoringMode::Any),
            "all" | "and" => Ok(ScoringMode::All),
            other => Err(NgramdexError::configuration(format!(
                "unknown scoring mode: {other} (expected \"any\" or \"all\")"
            ))),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulated {
    score: u64,
    matched: usize,
}

/// Sums per-document scores across the postings of several tokens.
///
/// Feed it the postings of each distinct query token once, then drain the
/// qualifying candidates with [`finish`](Self::finish).
#[derive(Debug)]
pub struct ScoreAccumulator {
    mode: ScoringMode,
    scores: AHashMap<DocId, Accumulated>,
    tokens_seen: usize,
}

impl ScoreAccumulator {
    pub fn new(mode: ScoringMode) -> Self {
        ScoreAccumulator {
            mode,
            scores: AHashMap::new(),
            tokens_seen: 0,
        }
    }

    /// Add the postings of one distinct query token.
    pub fn add_token<I>(&mut self, postings: I)
    where
        I: IntoIterator<Item = (DocId, u32)>,
    {
        self.tokens_seen += 1;
        for (doc_id, frequency) in postings {
            let entry = self.scores.entry(doc_id).or_default();
            entry.score += u64::from(frequency);
            entry.matched += 1;
        }
    }

    pub fn candidate_count(&self) -> usize {
        self.scores.len()
    }

    /// The qualifying `(doc_id, score)` pairs, in no particular order.
    pub fn finish(self) -> impl Iterator<Item = (DocId, u64)> {
        let required = match self.mode {
            ScoringMode::Any => 1,
            ScoringMode::All => self.tokens_seen,
        };
        self.scores
            .into_iter()
            .filter(move |(_, acc)| acc.matched >= required)
            .map(|(doc_id, acc)| (doc_id, acc.score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(acc: ScoreAccumulator) -> Vec<(DocId, u64)> {
        let mut scores: Vec<_> = acc.finish().collect();
        scores.sort();
        scores
    }

    #[test]
    fn test_any_sums_frequencies() {
        let mut acc = ScoreAccumulator::new(ScoringMode::Any);
        acc.add_token(vec![(1, 2), (2, 1)]);
        acc.add_token(vec![(1, 3)]);
        assert_eq!(acc.candidate_count(), 2);
        assert_eq!(sorted(acc), vec![(1, 5), (2, 1)]);
    }

    #[test]
    fn test_all_requires_every_token() {
        let mut acc = ScoreAccumulator::new(ScoringMode::All);
        acc.add_token(vec![(1, 2), (2, 1)]);
        acc.add_token(vec![(1, 3)]);
        assert_eq!(sorted(acc), vec![(1, 5)]);
    }

    #[test]
    fn test_all_with_unmatched_token_is_empty() {
        let mut acc = ScoreAccumulator::new(ScoringMode::All);
        acc.add_token(vec![(1, 2)]);
        acc.add_token(Vec::new());
        assert!(sorted(acc).is_empty());
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("ANY".parse::<ScoringMode>().unwrap(), ScoringMode::Any);
        assert_eq!("and".parse::<ScoringMode>().unwrap(), ScoringMode::All);
        assert!("most".parse::<ScoringMode>().is_err());
        assert_eq!(ScoringMode::default(), ScoringMode::Any);
    }
}
