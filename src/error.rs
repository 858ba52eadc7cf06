//! Error types for the ngramdex library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`NgramdexError`] enum.
//!
//! # Examples
//!
//! ```
//! use ngramdex::error::{NgramdexError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(NgramdexError::configuration("unknown tokenizer: quadgram"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for ngramdex operations.
///
/// Storage failures propagate unmodified up to the request boundary, where the
/// CLI turns them into a non-zero exit and the HTTP server into a 5xx.
#[derive(Error, Debug)]
pub enum NgramdexError {
    /// I/O errors (file operations, sockets, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid or inconsistent configuration (fatal at startup).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A requested entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Persistence failures, including corrupt logs and snapshots.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Rejected index mutations (bad tokens, unknown documents).
    #[error("Index error: {0}")]
    Index(String),

    /// Query-related errors.
    #[error("Query error: {0}")]
    Query(String),

    /// Binary serialization errors.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors carrying context from the command line layer.
    #[error("{0:#}")]
    Anyhow(#[from] anyhow::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with NgramdexError.
pub type Result<T> = std::result::Result<T, NgramdexError>;

impl NgramdexError {
    /// Create a new configuration error.
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        NgramdexError::Configuration(msg.into())
    }

    /// Create a new not found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        NgramdexError::NotFound(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        NgramdexError::Storage(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        NgramdexError::Index(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        NgramdexError::Query(msg.into())
    }

    /// Create a new serialization error.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        NgramdexError::Serialization(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        NgramdexError::Other(msg.into())
    }

    /// Whether this error originated in the persistence layer.
    pub fn is_storage(&self) -> bool {
        matches!(self, NgramdexError::Storage(_) | NgramdexError::Io(_))
    }
}

impl From<bincode::Error> for NgramdexError {
    fn from(err: bincode::Error) -> Self {
        NgramdexError::Serialization(err.to_string())
    }
}
