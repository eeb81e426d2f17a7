//! `rag-index [--reset] [DATA_DIR]`: chunks, embeds and stores every `*.txt`
//! file in the data directory.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use rag_backend::core::config::{AppPaths, ConfigService};
use rag_backend::rag::{load_documents, DocumentStatus, IndexLocation, SqliteVectorIndex};
use rag_backend::state::AppState;

#[derive(Parser, Debug)]
#[command(
    name = "rag-index",
    about = "Chunk, embed and store every .txt document of the corpus"
)]
struct IndexCli {
    /// Delete the index file before indexing (required to change the metric)
    #[arg(long)]
    reset: bool,

    /// Corpus directory; defaults to RAG_DATA_DIR or <root>/data
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = IndexCli::parse();

    let mut paths = AppPaths::new();
    if let Some(dir) = args.data_dir {
        paths = AppPaths::with_dirs(paths.project_root, dir);
    }
    let paths = Arc::new(paths);
    rag_backend::core::logging::init(&paths);

    let config = ConfigService::new(paths.clone())
        .load()
        .context("Failed to load configuration")?;

    if args.reset {
        if let IndexLocation::Persistent(db_path) = config.index_location(&paths) {
            SqliteVectorIndex::remove_files(&db_path)
                .await
                .with_context(|| format!("Failed to reset index at {}", db_path.display()))?;
            tracing::info!(path = %db_path.display(), "index reset");
        }
    }

    let state = AppState::from_config(paths.clone(), config)
        .await
        .context("Failed to initialize application state")?;

    let documents = load_documents(&paths.data_dir)
        .await
        .with_context(|| format!("Failed to read corpus from {}", paths.data_dir.display()))?;

    let report = state.indexer().index(&documents).await;
    for document in &report.documents {
        match &document.status {
            DocumentStatus::Indexed { chunks } => println!("{}: {} chunks", document.source_id, chunks),
            DocumentStatus::Skipped => println!("{}: skipped (no content)", document.source_id),
            DocumentStatus::Failed { error } => println!("{}: FAILED ({})", document.source_id, error),
        }
    }

    let totals = &report.totals;
    println!(
        "documents: {} indexed, {} skipped, {} failed; {} chunks written in {} ms",
        totals.indexed,
        totals.skipped,
        totals.failed,
        totals.chunks,
        (report.finished_at - report.started_at).num_milliseconds()
    );
    match state.index.count().await {
        Ok(count) => println!("index now holds {} chunks", count),
        Err(err) => println!("index count unavailable: {}", err),
    }

    state.shutdown().await;
    Ok(())
}
