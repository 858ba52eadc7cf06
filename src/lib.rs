//! # ngramdex
//!
//! Substring-tolerant full-text search built on character n-gram indexing.
//!
//! ## Features
//!
//! - Bigram and trigram tokenization over Unicode code points
//! - Inverted index with per-document token frequencies
//! - Atomic document adds, durable through a write-ahead log and snapshots
//! - Concurrent readers with consistent views
//! - OR (frequency-sum) and AND ranking modes
//! - CLI and HTTP front ends
//!
//! ```
//! use ngramdex::analysis::tokenizer::TokenizerKind;
//! use ngramdex::config::IndexConfig;
//! use ngramdex::search::SearchRequest;
//! use ngramdex::service::SearchService;
//!
//! # fn main() -> ngramdex::error::Result<()> {
//! let service = SearchService::open(IndexConfig::in_memory(TokenizerKind::Bigram))?;
//! let id = service.add("hello", "hello world")?;
//! let hits = service.search(&SearchRequest::new("wor"))?;
//! assert_eq!(hits[0].doc_id, id);
//! assert_eq!(hits[0].score, 2);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod index;
pub mod search;
pub mod server;
pub mod service;
pub mod storage;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
