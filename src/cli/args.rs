//! Command line argument parsing for the ngramdex CLI using clap.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::analysis::tokenizer::TokenizerKind;
use crate::config::IndexConfig;
use crate::error::{NgramdexError, Result};
use crate::search::scorer::ScoringMode;
use crate::storage::StorageConfig;
use crate::storage::file::FileStorageConfig;
use crate::storage::memory::MemoryStorageConfig;

/// ngramdex - character n-gram full-text search
#[derive(Parser, Debug, Clone)]
#[command(name = "ngramdex")]
#[command(about = "Substring-tolerant full-text search over character n-grams")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct NgramdexArgs {
    /// Verbosity level (repeat for more: -v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Tokenizer [bigram, trigram]
    #[arg(short = 'z', long, env = "NGRAMDEX_TOKENIZER", global = true)]
    pub tokenizer: Option<TokenizerKind>,

    /// Index directory
    #[arg(short = 'd', long = "db", value_name = "DIR", env = "NGRAMDEX_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Keep the index in memory only; it is lost when the command exits
    #[arg(short = 'M', long, conflicts_with = "db", global = true)]
    pub in_memory: bool,

    /// JSON configuration file
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl NgramdexArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n + 1,
            }
        }
    }

    /// Resolve the index configuration: the config file (if any), then flags.
    pub fn index_config(&self) -> Result<IndexConfig> {
        let mut config = match &self.config {
            Some(path) => IndexConfig::from_json_file(path)?,
            None => IndexConfig::default(),
        };

        if let Some(tokenizer) = self.tokenizer {
            config.tokenizer = tokenizer;
        }

        if let Some(db) = &self.db {
            config.storage = StorageConfig::File(FileStorageConfig::new(db));
        } else if self.in_memory {
            config.storage = StorageConfig::Memory(MemoryStorageConfig::default());
        } else if self.config.is_none() {
            return Err(NgramdexError::configuration(
                "no index location: pass --db <DIR>, --in-memory or --config <FILE>",
            ));
        }

        Ok(config)
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Add one document
    Add(AddArgs),

    /// Index documents from files
    Index(IndexArgs),

    /// Search the index
    Search(SearchArgs),

    /// List every stored document
    #[command(name = "show-documents")]
    ShowDocuments,

    /// Dump the posting table
    #[command(name = "show-index")]
    ShowIndex,

    /// Show index statistics
    Stats,

    /// Serve the index over HTTP
    Serve(ServeArgs),

    /// Copy the index into another directory
    Export(ExportArgs),
}

/// Arguments for adding a document
#[derive(Parser, Debug, Clone)]
pub struct AddArgs {
    /// Document title (stored, not indexed)
    #[arg(short, long)]
    pub title: String,

    /// Document content (stored and indexed)
    #[arg(short, long)]
    pub content: String,
}

/// Arguments for indexing files
#[derive(Parser, Debug, Clone)]
pub struct IndexArgs {
    /// Input files
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// One document per line: the first word is the title, the rest the content
    #[arg(long)]
    pub lines: bool,

    /// Title for whole-file documents (default: the file name)
    #[arg(short, long, conflicts_with = "lines")]
    pub title: Option<String>,

    /// Documents per transaction
    #[arg(short, long, default_value = "1000")]
    pub batch_size: usize,

    /// Also write the resulting index to this directory
    #[arg(long, value_name = "DIR")]
    pub export: Option<PathBuf>,
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Query string
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Maximum number of results to return (default: all)
    #[arg(short = 'k', long = "top-k")]
    pub top_k: Option<usize>,

    /// Candidate selection [any, all]
    #[arg(short, long)]
    pub mode: Option<ScoringMode>,
}

/// Arguments for the HTTP server
#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8888)]
    pub port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,
}

/// Arguments for exporting
#[derive(Parser, Debug, Clone)]
pub struct ExportArgs {
    /// Target directory
    #[arg(value_name = "DIR")]
    pub target: PathBuf,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_command() {
        let args = NgramdexArgs::try_parse_from([
            "ngramdex", "--db", "/tmp/idx", "add", "--title", "t", "--content", "c",
        ])
        .unwrap();

        match &args.command {
            Command::Add(add) => {
                assert_eq!(add.title, "t");
                assert_eq!(add.content, "c");
            }
            other => panic!("Expected Add command, got {other:?}"),
        }
        assert_eq!(args.verbosity(), 1);
    }

    #[test]
    fn test_search_command() {
        let args = NgramdexArgs::try_parse_from([
            "ngramdex", "-M", "-z", "Trigram", "search", "query", "-k", "5", "--mode", "all",
        ])
        .unwrap();

        assert_eq!(args.tokenizer, Some(TokenizerKind::Trigram));
        match args.command {
            Command::Search(search) => {
                assert_eq!(search.query, "query");
                assert_eq!(search.top_k, Some(5));
                assert_eq!(search.mode, Some(ScoringMode::All));
            }
            other => panic!("Expected Search command, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_tokenizer_rejected() {
        let result =
            NgramdexArgs::try_parse_from(["ngramdex", "-M", "--tokenizer", "quadgram", "stats"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args =
            NgramdexArgs::try_parse_from(["ngramdex", "show-index", "--format", "json", "-q", "-M"])
                .unwrap();
        assert_eq!(args.output_format, OutputFormat::Json);
        assert_eq!(args.verbosity(), 0);
        assert!(args.in_memory);
    }

    #[test]
    fn test_db_and_in_memory_conflict() {
        let result = NgramdexArgs::try_parse_from(["ngramdex", "--db", "x", "-M", "stats"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_index_config_requires_location() {
        let args = NgramdexArgs::try_parse_from(["ngramdex", "stats"]).unwrap();
        assert!(args.index_config().is_err());

        let args = NgramdexArgs::try_parse_from(["ngramdex", "--db", "/tmp/idx", "stats"]).unwrap();
        let config = args.index_config().unwrap();
        assert!(config.storage.is_persistent());
        assert_eq!(config.tokenizer, TokenizerKind::Bigram);
    }

    #[test]
    fn test_serve_defaults() {
        let args = NgramdexArgs::try_parse_from(["ngramdex", "-M", "serve"]).unwrap();
        match args.command {
            Command::Serve(serve) => assert_eq!(serve.port, 8888),
            other => panic!("Expected Serve command, got {other:?}"),
        }
    }
}
