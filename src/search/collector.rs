//! Top-k selection of scored documents.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::index::document::DocId;

/// A scored document. Orders worst-first so the heap top is the first to evict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScoredDoc {
    doc_id: DocId,
    score: u64,
}

impl PartialOrd for ScoredDoc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredDoc {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lower score is worse; on equal scores the higher id is worse.
        other
            .score
            .cmp(&self.score)
            .then_with(|| self.doc_id.cmp(&other.doc_id))
    }
}

/// Keeps the best `limit` documents by score descending, then id ascending.
#[derive(Debug)]
pub struct TopDocsCollector {
    limit: Option<usize>,
    hits: BinaryHeap<ScoredDoc>,
    total_hits: u64,
}

impl TopDocsCollector {
    /// Keep at most `limit` documents.
    pub fn new(limit: usize) -> Self {
        TopDocsCollector {
            limit: Some(limit),
            hits: BinaryHeap::with_capacity(limit.min(1024)),
            total_hits: 0,
        }
    }

    /// Keep every collected document.
    pub fn unbounded() -> Self {
        TopDocsCollector {
            limit: None,
            hits: BinaryHeap::new(),
            total_hits: 0,
        }
    }

    pub fn with_limit(limit: Option<usize>) -> Self {
        match limit {
            Some(limit) => Self::new(limit),
            None => Self::unbounded(),
        }
    }

    pub fn collect(&mut self, doc_id: DocId, score: u64) {
        self.total_hits += 1;
        let candidate = ScoredDoc { doc_id, score };

        match self.limit {
            Some(limit) if self.hits.len() >= limit => {
                if let Some(mut worst) = self.hits.peek_mut() {
                    if candidate < *worst {
                        *worst = candidate;
                    }
                }
            }
            _ => self.hits.push(candidate),
        }
    }

    /// Number of documents offered to the collector.
    pub fn total_hits(&self) -> u64 {
        self.total_hits
    }

    /// The kept documents, best first.
    pub fn into_sorted(self) -> Vec<(DocId, u64)> {
        self.hits
            .into_sorted_vec()
            .into_iter()
            .map(|doc| (doc.doc_id, doc.score))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_by_score_then_id() {
        let mut collector = TopDocsCollector::unbounded();
        for (doc_id, score) in [(4, 1), (2, 3), (3, 1), (1, 1), (5, 3)] {
            collector.collect(doc_id, score);
        }
        assert_eq!(collector.total_hits(), 5);
        assert_eq!(
            collector.into_sorted(),
            vec![(2, 3), (5, 3), (1, 1), (3, 1), (4, 1)]
        );
    }

    #[test]
    fn test_keeps_best_k() {
        let mut collector = TopDocsCollector::new(2);
        for (doc_id, score) in [(1, 1), (2, 5), (3, 2), (4, 5), (5, 9)] {
            collector.collect(doc_id, score);
        }
        assert_eq!(collector.into_sorted(), vec![(5, 9), (2, 5)]);
    }

    #[test]
    fn test_tie_at_boundary_prefers_lower_id() {
        let mut collector = TopDocsCollector::new(1);
        collector.collect(7, 4);
        collector.collect(3, 4);
        collector.collect(9, 4);
        assert_eq!(collector.into_sorted(), vec![(3, 4)]);
    }

    #[test]
    fn test_zero_limit() {
        let mut collector = TopDocsCollector::new(0);
        collector.collect(1, 10);
        assert_eq!(collector.total_hits(), 1);
        assert!(collector.into_sorted().is_empty());
    }
}
