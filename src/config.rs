//! Index configuration, fixed once at startup.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::tokenizer::TokenizerKind;
use crate::error::{NgramdexError, Result};
use crate::index::store::StoreOptions;
use crate::search::scorer::ScoringMode;
use crate::storage::StorageConfig;
use crate::storage::file::FileStorageConfig;
use crate::storage::memory::MemoryStorageConfig;

/// Everything needed to open a [`SearchService`](crate::service::SearchService).
///
/// ```
/// use ngramdex::analysis::tokenizer::TokenizerKind;
/// use ngramdex::config::IndexConfig;
///
/// let config: IndexConfig = serde_json::from_str(
///     r#"{ "tokenizer": "trigram", "storage": { "type": "file", "path": "/tmp/idx" } }"#,
/// ).unwrap();
/// assert_eq!(config.tokenizer, TokenizerKind::Trigram);
/// assert!(config.storage.is_persistent());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub tokenizer: TokenizerKind,

    /// Defaults to in-memory storage.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Checkpoint once the log holds more than this many commits.
    #[serde(default = "default_checkpoint_threshold")]
    pub checkpoint_threshold: usize,

    /// Candidate selection policy for queries that do not set one.
    #[serde(default)]
    pub scoring: ScoringMode,
}

fn default_checkpoint_threshold() -> usize {
    StoreOptions::default().checkpoint_threshold
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            tokenizer: TokenizerKind::default(),
            storage: StorageConfig::default(),
            checkpoint_threshold: default_checkpoint_threshold(),
            scoring: ScoringMode::default(),
        }
    }
}

impl IndexConfig {
    /// An index persisted under `path`.
    pub fn persistent<P: AsRef<Path>>(tokenizer: TokenizerKind, path: P) -> Self {
        IndexConfig {
            tokenizer,
            storage: StorageConfig::File(FileStorageConfig::new(path.as_ref())),
            ..Default::default()
        }
    }

    /// An index held in process memory. Its contents are lost when the
    /// service is dropped or the process exits.
    pub fn in_memory(tokenizer: TokenizerKind) -> Self {
        IndexConfig {
            tokenizer,
            storage: StorageConfig::Memory(MemoryStorageConfig::default()),
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            NgramdexError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: IndexConfig = serde_json::from_str(&text).map_err(|e| {
            NgramdexError::configuration(format!("invalid config {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.checkpoint_threshold == 0 {
            return Err(NgramdexError::configuration(
                "checkpoint_threshold must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            checkpoint_threshold: self.checkpoint_threshold,
        }
    }
}
