//! The inverted index and its document table.
//!
//! - [`document`] - the document table (id allocation, lookup, listing)
//! - [`posting`] - the posting table: token -> (doc_id, frequency)
//! - [`store`] - both tables behind one lock, with write transactions
//! - [`wal`] / [`snapshot`] - durability for the store
//! - [`indexer`] - tokenizes and adds documents as one atomic unit

pub mod document;
pub mod indexer;
pub mod posting;
pub mod snapshot;
pub mod store;
pub mod wal;

pub use document::{DocId, Document, DocumentStore};
pub use indexer::Indexer;
pub use posting::{Posting, PostingStore};
pub use store::{IndexStats, IndexStore, ReadView, StoreOptions, WriteTransaction};
