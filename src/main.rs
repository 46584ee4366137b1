use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tibetan_corpus::config::AppConfig;
use tibetan_corpus::core::preprocess::QueryPipeline;
use tibetan_corpus::core::search::{CatalogService, OpenSearchClient, QuerySynthesizer};
use tibetan_corpus::ingestion::{
    BdrcMetadataClient, ChunkSegmenter, ImportRequest, LocalMirror, OcrImporter,
};

/// Search query synthesis and OCR import for the Tibetan etext corpus.
#[derive(Parser)]
#[command(name = "tibetan-corpus", version, about)]
struct Cli {
    /// Config file (default: platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the search request for a query
    #[command(alias = "search")]
    Query {
        /// Query text; words are joined with spaces
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Print the chunks of a text file as JSON
    Chunk {
        file: PathBuf,

        /// Target chunk length in characters (default: ingestion.chunk_size)
        #[arg(short, long)]
        size: Option<usize>,
    },

    /// Import OCR output from the local mirror into the index
    Import {
        w_id: String,
        i_id: String,
        i_version: String,
        etext_source: String,
    },

    /// Print corpus statistics
    Stats,

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli.config.clone().unwrap_or_else(AppConfig::config_path);
    let (config, config_error) = AppConfig::resolve(&path);
    let _log_guard = tibetan_corpus::core::logging::init(&config.logging);
    if let Some(e) = config_error {
        log::warn!("Invalid config ({}): {e}; using defaults", path.display());
    }
    log::debug!("{} v{}", tibetan_corpus::NAME, tibetan_corpus::VERSION);

    match cli.command {
        Command::Query { text } => query(&config, &text.join(" ")),
        Command::Chunk { file, size } => chunk(&file, size.unwrap_or(config.ingestion.chunk_size)),
        Command::Import {
            w_id,
            i_id,
            i_version,
            etext_source,
        } => {
            let request = ImportRequest {
                w_id,
                i_id,
                i_version,
                etext_source,
            };
            import(&config, &request).await
        }
        Command::Stats => stats(&config).await,
        Command::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn query(config: &AppConfig, text: &str) -> Result<()> {
    let synthesizer = QuerySynthesizer::new(QueryPipeline::default(), config.search.clone());
    let compiled = synthesizer.compile_text(text);
    println!("{}", serde_json::to_string_pretty(&compiled)?);
    Ok(())
}

fn chunk(file: &std::path::Path, size: usize) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    let chunks = ChunkSegmenter::new(size).segment(&text);
    log::info!("{} characters, {} chunks", text.chars().count(), chunks.len());
    println!("{}", serde_json::to_string_pretty(&chunks)?);
    Ok(())
}

async fn import(config: &AppConfig, request: &ImportRequest) -> Result<()> {
    let mirror = Arc::new(LocalMirror::from_config(&config.ingestion)?);
    let store = Arc::new(OpenSearchClient::new(&config.opensearch)?);
    let metadata = Arc::new(BdrcMetadataClient::new(&config.ingestion)?);

    let importer = OcrImporter::new(mirror.clone(), mirror, metadata, store)
        .with_chunk_size(config.ingestion.chunk_size);
    let summary = importer.import(request).await?;

    println!(
        "{}: {} pages, {} chunks, {} skipped{}",
        summary.doc_id,
        summary.nb_pages,
        summary.nb_chunks,
        summary.skipped_pages,
        if summary.reimported { " (reimported)" } else { "" }
    );
    Ok(())
}

async fn stats(config: &AppConfig) -> Result<()> {
    let store = Arc::new(OpenSearchClient::new(&config.opensearch)?);
    let synthesizer = Arc::new(QuerySynthesizer::new(QueryPipeline::default(), config.search.clone()));
    let catalog = CatalogService::new(store, synthesizer);

    let stats = catalog.stats().await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
