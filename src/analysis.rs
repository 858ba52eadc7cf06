//! Text analysis for ngramdex.
//!
//! Analysis here is deliberately minimal: raw text is cut into overlapping
//! character n-grams with no case folding, stemming or punctuation stripping.
//! That is what makes the index useful for scripts without whitespace word
//! boundaries.

pub mod token;
pub mod tokenizer;
