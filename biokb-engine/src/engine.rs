//! Knowledge engine facade
//!
//! Owns the active [`IndexSnapshot`], the entity extractor and the query
//! resolver. Readers take a cheap `Arc` clone of the current snapshot and
//! never hold the lock while querying; a rebuild constructs a complete new
//! snapshot before swapping it in.

use parking_lot::RwLock;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::cache::CacheStats;
use crate::error::Result;
use crate::extract::EntityExtractor;
use crate::ingest::{ingest_json, ingest_with, read_rows, IngestReport, RawRecord};
use crate::publication::Publication;
use crate::resolver::{QueryResolver, QueryResult, ResolverConfig};
use crate::snapshot::{CorpusStats, IndexSnapshot};

/// Thread-safe entry point for ingestion and every query operation.
#[derive(Debug)]
pub struct KnowledgeEngine {
    active: RwLock<Arc<IndexSnapshot>>,
    extractor: Arc<EntityExtractor>,
    resolver: QueryResolver,
    generation: AtomicU64,
}

impl KnowledgeEngine {
    /// Ingest `rows` with the default entity rules and resolver limits.
    pub fn from_rows(rows: impl IntoIterator<Item = RawRecord>) -> Result<Self> {
        Self::with_config(
            rows,
            Arc::new(EntityExtractor::default()),
            ResolverConfig::default(),
        )
    }

    /// Ingest `rows` with a custom extractor and resolver configuration.
    ///
    /// # Errors
    /// Returns [`crate::error::EngineError::Ingestion`] when the corpus is
    /// empty or contains no usable row.
    pub fn with_config(
        rows: impl IntoIterator<Item = RawRecord>,
        extractor: Arc<EntityExtractor>,
        config: ResolverConfig,
    ) -> Result<Self> {
        let snapshot = ingest_with(rows, Arc::clone(&extractor))?;
        Ok(Self::from_snapshot(snapshot, config))
    }

    /// Ingest untyped JSON rows, skipping any that do not decode.
    pub fn from_json(rows: Vec<serde_json::Value>, config: ResolverConfig) -> Result<Self> {
        let snapshot = ingest_json(rows, Arc::new(EntityExtractor::default()))?;
        Ok(Self::from_snapshot(snapshot, config))
    }

    /// Read a JSON corpus file and ingest it.
    ///
    /// # Errors
    /// `Io` when the file cannot be read, `Json` when it is not an array,
    /// `Ingestion` when no row is usable.
    pub fn open(path: &Path, config: ResolverConfig) -> Result<Self> {
        Self::from_json(read_rows(path)?, config)
    }

    /// Install an already built snapshot as generation 1.
    pub fn from_snapshot(snapshot: IndexSnapshot, config: ResolverConfig) -> Self {
        let extractor = snapshot.extractor_handle();
        Self {
            active: RwLock::new(Arc::new(snapshot.with_generation(1))),
            extractor,
            resolver: QueryResolver::new(config),
            generation: AtomicU64::new(1),
        }
    }

    /// The snapshot currently serving queries.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.active.read())
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn extractor(&self) -> &EntityExtractor {
        &self.extractor
    }

    pub fn config(&self) -> &ResolverConfig {
        self.resolver.config()
    }

    /// Replace the corpus. The new snapshot is built without holding the
    /// lock; queries already running keep the snapshot they started with.
    ///
    /// # Errors
    /// On failure the current snapshot stays installed.
    pub fn rebuild(&self, rows: impl IntoIterator<Item = RawRecord>) -> Result<IngestReport> {
        let snapshot = ingest_with(rows, Arc::clone(&self.extractor))?;
        Ok(self.install(snapshot))
    }

    /// [`Self::rebuild`] from untyped JSON rows.
    pub fn rebuild_json(&self, rows: Vec<serde_json::Value>) -> Result<IngestReport> {
        let snapshot = ingest_json(rows, Arc::clone(&self.extractor))?;
        Ok(self.install(snapshot))
    }

    fn install(&self, snapshot: IndexSnapshot) -> IngestReport {
        let report = snapshot.report();
        // Generation is assigned under the write lock so concurrent rebuilds
        // install in generation order
        let generation = {
            let mut active = self.active.write();
            let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
            *active = Arc::new(snapshot.with_generation(generation));
            generation
        };
        self.resolver.invalidate();

        info!(
            "Installed snapshot generation {} ({} publications, {} skipped)",
            generation, report.accepted, report.skipped
        );
        report
    }

    /// Ranked keyword search. Results are owned copies so they outlive a
    /// later rebuild.
    pub fn search(&self, query: &str, limit: usize) -> Vec<Publication> {
        owned(self.snapshot().search(query, limit))
    }

    /// Whole-query substring search in corpus order.
    pub fn phrase_search(&self, query: &str, limit: usize) -> Vec<Publication> {
        owned(self.snapshot().phrase_search(query, limit))
    }

    /// Resolve a research question into concepts and publications.
    pub fn resolve_query(&self, query: &str) -> QueryResult {
        self.resolver.resolve(&self.snapshot(), query)
    }

    pub fn stats(&self) -> CorpusStats {
        self.snapshot().stats()
    }

    pub fn related_subjects(&self, subject: &str) -> Vec<(String, usize)> {
        self.snapshot().related_subjects(subject)
    }

    pub fn subject(&self, name: &str, limit: Option<usize>) -> Vec<Publication> {
        owned(self.snapshot().query_by_subject(name, limit))
    }

    pub fn stressor(&self, name: &str, limit: Option<usize>) -> Vec<Publication> {
        owned(self.snapshot().query_by_stressor(name, limit))
    }

    pub fn connection(
        &self,
        subject: &str,
        stressor: &str,
        limit: Option<usize>,
    ) -> Vec<Publication> {
        owned(self.snapshot().query_connection(subject, stressor, limit))
    }

    pub fn filter_by_subject(&self, fragment: &str, limit: usize) -> Vec<Publication> {
        owned(self.snapshot().filter_by_subject(fragment, limit))
    }

    pub fn filter_by_stressor(&self, fragment: &str, limit: usize) -> Vec<Publication> {
        owned(self.snapshot().filter_by_stressor(fragment, limit))
    }

    pub fn publications(&self, limit: Option<usize>) -> Vec<Publication> {
        owned(self.snapshot().publications(limit))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.resolver.cache_stats()
    }
}

fn owned(publications: Vec<&Publication>) -> Vec<Publication> {
    publications.into_iter().cloned().collect()
}
