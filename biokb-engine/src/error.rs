//! Error types for biokb-engine

use thiserror::Error;

/// Errors raised while turning raw corpus rows into an index snapshot.
///
/// These are fatal to initialization and are never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IngestionError {
    /// No rows were supplied at all
    #[error("Corpus is empty")]
    EmptyCorpus,

    /// Every row was rejected (no title and no abstract, or undecodable)
    #[error("No usable publication rows ({skipped} skipped)")]
    NoUsableRows { skipped: usize },
}

/// Errors that can occur in the engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Corpus ingestion failed
    #[error("Ingestion error: {0}")]
    Ingestion(#[from] IngestionError),

    /// An entity pattern failed to compile
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// JSON decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
