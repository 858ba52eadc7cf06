//! Output formatting for CLI commands.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cli::args::{NgramdexArgs, OutputFormat};
use crate::error::Result;
use crate::index::document::{DocId, Document};
use crate::index::store::IndexStats;
use crate::search::engine::SearchHit;

/// Plain-text rendering of a command result.
pub trait HumanOutput {
    fn write_human(&self, args: &NgramdexArgs);
}

/// Result structure for document addition.
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentAdditionResult {
    pub doc_ids: Vec<DocId>,
    pub duration_ms: u64,
    pub docs_per_second: f64,
}

/// Result structure for search operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub hits: Vec<SearchHit>,
    pub duration_ms: u64,
}

/// Every stored document.
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentListing {
    pub documents: Vec<Document>,
}

/// The posting table, token -> [(doc_id, frequency)].
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexDump {
    pub postings: BTreeMap<String, Vec<(DocId, u32)>>,
}

/// Result structure for export.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportResult {
    pub path: String,
    pub documents: usize,
}

impl HumanOutput for DocumentAdditionResult {
    fn write_human(&self, args: &NgramdexArgs) {
        match self.doc_ids.as_slice() {
            [id] => println!("Added document {id}"),
            ids => println!("Added {} documents", ids.len()),
        }
        if args.verbosity() > 1 {
            println!(
                "Took {} ms ({:.1} docs/s)",
                self.duration_ms, self.docs_per_second
            );
        }
    }
}

impl HumanOutput for SearchResults {
    fn write_human(&self, args: &NgramdexArgs) {
        for hit in &self.hits {
            println!("{}\t{}\t{}", hit.doc_id, hit.score, hit.title);
        }
        if args.verbosity() > 1 {
            println!();
            println!("{} hits for {:?} in {} ms", self.hits.len(), self.query, self.duration_ms);
        }
    }
}

impl HumanOutput for DocumentListing {
    fn write_human(&self, _args: &NgramdexArgs) {
        for document in &self.documents {
            println!("{}\t{}\t{}", document.id, document.title, document.content);
        }
    }
}

impl HumanOutput for IndexDump {
    fn write_human(&self, _args: &NgramdexArgs) {
        for (token, postings) in &self.postings {
            let rendered: Vec<String> = postings
                .iter()
                .map(|(doc_id, frequency)| format!("{doc_id}:{frequency}"))
                .collect();
            println!("{token:?}\t{}", rendered.join(" "));
        }
    }
}

impl HumanOutput for IndexStats {
    fn write_human(&self, _args: &NgramdexArgs) {
        println!("Index Statistics:");
        println!("  Tokenizer:       {}", self.tokenizer);
        println!("  Documents:       {}", self.document_count);
        println!("  Distinct tokens: {}", self.token_count);
        println!("  Postings:        {}", self.posting_count);
        println!("  Log records:     {}", self.wal_records);
        println!("  Last sequence:   {}", self.last_wal_seq);
    }
}

impl HumanOutput for ExportResult {
    fn write_human(&self, _args: &NgramdexArgs) {
        println!("Exported {} documents to {}", self.documents, self.path);
    }
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize + HumanOutput>(result: &T, args: &NgramdexArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            result.write_human(args);
            Ok(())
        }
        OutputFormat::Json => output_json(result, args),
    }
}

fn output_json<T: Serialize>(result: &T, args: &NgramdexArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}
