//! Query evaluation over an [`IndexStore`](crate::index::IndexStore).
//!
//! - [`scorer`] - candidate selection and frequency-sum scoring
//! - [`collector`] - top-k selection with deterministic tie-breaking
//! - [`engine`] - the [`QueryEngine`] tying both to the tokenizer

pub mod collector;
pub mod engine;
pub mod scorer;

pub use collector::TopDocsCollector;
pub use engine::{QueryEngine, SearchHit, SearchRequest};
pub use scorer::{ScoreAccumulator, ScoringMode};
