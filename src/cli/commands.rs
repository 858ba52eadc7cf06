//! Command implementations for the ngramdex CLI.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use log::{debug, info};

use crate::cli::args::*;
use crate::cli::output::*;
use crate::error::Result;
use crate::search::engine::SearchRequest;
use crate::service::SearchService;
use crate::storage::file::{FileStorage, FileStorageConfig};

/// Execute a CLI command.
pub fn execute_command(args: NgramdexArgs) -> Result<()> {
    let config = args.index_config()?;
    if !config.storage.is_persistent() {
        info!("using an in-memory index; nothing is kept after this command");
    }
    let service = Arc::new(SearchService::open(config)?);

    match &args.command {
        Command::Add(add_args) => add_document(&service, add_args, &args)?,
        Command::Index(index_args) => index_files(&service, index_args, &args)?,
        Command::Search(search_args) => search_index(&service, search_args, &args)?,
        Command::ShowDocuments => show_documents(&service, &args)?,
        Command::ShowIndex => show_index(&service, &args)?,
        Command::Stats => output_result(&service.stats(), &args)?,
        Command::Serve(serve_args) => serve_index(service.clone(), serve_args)?,
        Command::Export(export_args) => export_index(&service, &export_args.target, &args)?,
    }

    service.close()
}

fn add_document(service: &SearchService, add_args: &AddArgs, args: &NgramdexArgs) -> Result<()> {
    let start = Instant::now();
    let doc_id = service.add(&add_args.title, &add_args.content)?;
    output_result(&addition_result(vec![doc_id], start), args)
}

fn index_files(service: &SearchService, index_args: &IndexArgs, args: &NgramdexArgs) -> Result<()> {
    let start = Instant::now();
    let documents = read_documents(index_args)?;
    let batch_size = index_args.batch_size.max(1);

    let mut doc_ids = Vec::with_capacity(documents.len());
    for batch in documents.chunks(batch_size) {
        let ids = service.add_batch(
            batch
                .iter()
                .map(|(title, content)| (title.as_str(), content.as_str())),
        )?;
        debug!("committed a batch of {} documents", ids.len());
        doc_ids.extend(ids);
    }

    output_result(&addition_result(doc_ids, start), args)?;

    if let Some(target) = &index_args.export {
        export_index(service, target, args)?;
    }
    Ok(())
}

fn search_index(service: &SearchService, search_args: &SearchArgs, args: &NgramdexArgs) -> Result<()> {
    let start = Instant::now();
    let mut request = SearchRequest::new(search_args.query.clone());
    if let Some(top_k) = search_args.top_k {
        request = request.with_top_k(top_k);
    }
    if let Some(mode) = search_args.mode {
        request = request.with_mode(mode);
    }

    let hits = service.search(&request)?;
    output_result(
        &SearchResults {
            query: search_args.query.clone(),
            hits,
            duration_ms: start.elapsed().as_millis() as u64,
        },
        args,
    )
}

fn show_documents(service: &SearchService, args: &NgramdexArgs) -> Result<()> {
    output_result(
        &DocumentListing {
            documents: service.list()?,
        },
        args,
    )
}

fn show_index(service: &SearchService, args: &NgramdexArgs) -> Result<()> {
    output_result(
        &IndexDump {
            postings: service.postings_dump(),
        },
        args,
    )
}

fn serve_index(service: Arc<SearchService>, serve_args: &ServeArgs) -> Result<()> {
    let addr = SocketAddr::new(serve_args.host, serve_args.port);
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(crate::server::serve(service, addr))
}

fn export_index(service: &SearchService, target: &Path, args: &NgramdexArgs) -> Result<()> {
    let storage = FileStorage::new(target, FileStorageConfig::new(target))?;
    service.export_to(&storage)?;
    output_result(
        &ExportResult {
            path: target.display().to_string(),
            documents: service.stats().document_count,
        },
        args,
    )
}

fn addition_result(doc_ids: Vec<u64>, start: Instant) -> DocumentAdditionResult {
    let elapsed = start.elapsed();
    let docs_per_second = if elapsed.as_secs_f64() > 0.0 {
        doc_ids.len() as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };
    DocumentAdditionResult {
        doc_ids,
        duration_ms: elapsed.as_millis() as u64,
        docs_per_second,
    }
}

/// Turn the input files into (title, content) pairs.
pub fn read_documents(index_args: &IndexArgs) -> Result<Vec<(String, String)>> {
    let mut documents = Vec::new();
    for path in &index_args.files {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;

        if index_args.lines {
            documents.extend(
                text.lines()
                    .filter_map(split_line)
                    .map(|(title, content)| (title.to_string(), content.to_string())),
            );
        } else {
            let title = match &index_args.title {
                Some(title) => title.clone(),
                None => path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
            };
            documents.push((title, text));
        }
    }
    Ok(documents)
}

/// Split a line at its first run of whitespace into (title, content).
///
/// Blank lines yield `None`; a line without whitespace has empty content.
pub fn split_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }
    match line.find(char::is_whitespace) {
        Some(at) => Some((&line[..at], line[at..].trim_start())),
        None => Some((line, "")),
    }
}
