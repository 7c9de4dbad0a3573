//! BioKB Engine
//!
//! In-memory indexing and retrieval over a corpus of space-biology
//! publications.
//!
//! ## Features
//!
//! - **Keyword search** - Inverted index over title and abstract, ranked by term overlap
//! - **Entity tagging** - Subjects (organisms) and stressors (space conditions) from pattern tables
//! - **Relational lookups** - Subject, stressor and subject x stressor queries with name normalization
//! - **Query resolution** - Free-text questions resolved through the indices with a broadening fallback
//! - **Snapshot isolation** - Rebuilds never disturb queries that are already running
//!
//! ## Example
//!
//! ```ignore
//! use biokb_engine::{KnowledgeEngine, RawRecord};
//!
//! let engine = KnowledgeEngine::from_rows(vec![
//!     RawRecord::new("Mice skeletal unloading", "Microgravity causes bone loss in mice"),
//! ])?;
//!
//! let result = engine.resolve_query("effects of microgravity on mice");
//! for publication in result.publications() {
//!     println!("{}", publication.title);
//! }
//! ```

pub mod cache;
pub mod engine;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod keyword_index;
pub mod publication;
pub mod relational;
pub mod resolver;
pub mod snapshot;

// Re-exports for convenience
pub use cache::{CacheStats, QueryCache};
pub use engine::KnowledgeEngine;
pub use error::{EngineError, IngestionError, Result};
pub use extract::{CanonicalRule, EntityExtractor, EntityRules, Extraction};
pub use ingest::{
    ingest, ingest_json, ingest_with, parse_rows, read_rows, IngestReport, RawRecord, ScalarField,
};
pub use keyword_index::{KeywordHit, KeywordIndex, MatchKind};
pub use publication::{Publication, PublicationBuilder, PublicationBuilderError, PublicationId};
pub use relational::{EntityCount, GraphStats, RelationalIndex};
pub use resolver::{ConceptSet, QueryResolver, QueryResult, ResolutionPath, ResolverConfig};
pub use snapshot::{CorpusStats, IndexSnapshot, DEFAULT_FILTER_LIMIT};
