//! BioKB command-line host
//!
//! Loads a JSON corpus once, builds a [`KnowledgeEngine`] over it and runs a
//! single query command, producing JSON.

use biokb_engine::{parse_rows, EngineError, KnowledgeEngine, ResolverConfig};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Results returned by `search` when no `--limit` is given.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "biokb")]
#[command(about = "Query a space-biology publication corpus")]
#[command(version)]
pub struct Args {
    /// JSON file holding an array of publication rows
    #[arg(long, short)]
    pub corpus: PathBuf,

    /// Broaden a resolved query when fewer candidates than this are found
    #[arg(long, default_value_t = 5)]
    pub min_candidates: usize,

    /// Stop broadening at this many candidates
    #[arg(long, default_value_t = 20)]
    pub broaden_cap: usize,

    /// Maximum publications returned by `resolve`
    #[arg(long, default_value_t = 50)]
    pub final_cap: usize,

    /// Resolved queries kept in the cache
    #[arg(long, default_value_t = 100)]
    pub cache_capacity: usize,

    /// Cap on publications returned by list commands
    #[arg(long, short)]
    pub limit: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ranked keyword search over titles and abstracts
    Search {
        query: String,
        /// Match the whole query as a substring, in corpus order
        #[arg(long)]
        phrase: bool,
    },
    /// Resolve a research question into concepts and publications
    Resolve { query: String },
    /// Corpus and graph statistics
    Stats,
    /// Subjects sharing publications with a subject
    Related { subject: String },
    /// Publications studying a subject
    Subject { name: String },
    /// Publications applying a stressor
    Stressor { name: String },
    /// Publications studying a subject under a stressor
    Connection { subject: String, stressor: String },
}

impl Args {
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig::default()
            .with_min_candidates(self.min_candidates)
            .with_broaden_cap(self.broaden_cap)
            .with_final_cap(self.final_cap)
            .with_cache_capacity(self.cache_capacity)
    }
}

/// Errors surfaced by the command-line host.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to read corpus {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Read and decode the corpus file. Individual rows stay untyped so that a
/// malformed row is skipped during ingestion instead of failing the load.
pub async fn load_corpus(path: &Path) -> Result<Vec<Value>, CliError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(parse_rows(&text)?)
}

/// Load the corpus and build the engine.
pub async fn open_engine(args: &Args) -> Result<KnowledgeEngine, CliError> {
    let rows = load_corpus(&args.corpus).await?;
    tracing::info!("Loaded {} rows from {:?}", rows.len(), args.corpus);
    Ok(KnowledgeEngine::from_json(rows, args.resolver_config())?)
}

/// Execute one command against the engine.
pub fn run(
    engine: &KnowledgeEngine,
    command: &Command,
    limit: Option<usize>,
) -> Result<Value, CliError> {
    let value = match command {
        Command::Search { query, phrase } => {
            let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
            let found = if *phrase {
                engine.phrase_search(query, limit)
            } else {
                engine.search(query, limit)
            };
            serde_json::to_value(found)?
        }
        Command::Resolve { query } => serde_json::to_value(engine.resolve_query(query))?,
        Command::Stats => json!({
            "corpus": engine.stats(),
            "cache": engine.cache_stats(),
        }),
        Command::Related { subject } => {
            let related: Vec<Value> = engine
                .related_subjects(subject)
                .into_iter()
                .take(limit.unwrap_or(usize::MAX))
                .map(|(name, shared)| json!({ "subject": name, "shared_publications": shared }))
                .collect();
            Value::Array(related)
        }
        Command::Subject { name } => serde_json::to_value(engine.subject(name, limit))?,
        Command::Stressor { name } => serde_json::to_value(engine.stressor(name, limit))?,
        Command::Connection { subject, stressor } => {
            serde_json::to_value(engine.connection(subject, stressor, limit))?
        }
    };
    Ok(value)
}
