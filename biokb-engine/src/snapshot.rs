//! Immutable index snapshot
//!
//! A snapshot bundles the publication store with the keyword and relational
//! indices built from it. It is never mutated after construction, so it can
//! be shared behind an `Arc` and read from any number of threads. Rebuilding
//! means constructing a new snapshot.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::extract::EntityExtractor;
use crate::ingest::IngestReport;
use crate::keyword_index::{KeywordHit, KeywordIndex};
use crate::publication::{Publication, PublicationId, PublicationStore};
use crate::relational::{GraphStats, RelationalIndex};

/// Default cap for the tag filters.
pub const DEFAULT_FILTER_LIMIT: usize = 50;

/// A fully built, read-only set of index structures.
#[derive(Debug)]
pub struct IndexSnapshot {
    generation: u64,
    store: PublicationStore,
    keywords: KeywordIndex,
    relations: RelationalIndex,
    /// The extractor that tagged the store; queries must use the same one
    extractor: Arc<EntityExtractor>,
    report: IngestReport,
}

/// Corpus-wide statistics for a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusStats {
    #[serde(flatten)]
    pub graph: GraphStats,
    pub indexed_terms: usize,
    pub year_range: Option<(i32, i32)>,
    pub skipped_rows: usize,
    pub generation: u64,
}

impl IndexSnapshot {
    /// Build both indices over an already tagged store.
    pub fn from_store(
        store: PublicationStore,
        extractor: Arc<EntityExtractor>,
        report: IngestReport,
    ) -> Self {
        let keywords = KeywordIndex::build(&store);
        let relations = RelationalIndex::build(&store);
        Self {
            generation: 0,
            store,
            keywords,
            relations,
            extractor,
            report,
        }
    }

    /// Tag this snapshot with the generation it is installed under.
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn store(&self) -> &PublicationStore {
        &self.store
    }

    pub fn keywords(&self) -> &KeywordIndex {
        &self.keywords
    }

    pub fn relations(&self) -> &RelationalIndex {
        &self.relations
    }

    pub fn extractor(&self) -> &EntityExtractor {
        &self.extractor
    }

    pub fn extractor_handle(&self) -> Arc<EntityExtractor> {
        Arc::clone(&self.extractor)
    }

    pub fn report(&self) -> IngestReport {
        self.report
    }

    pub fn get(&self, id: PublicationId) -> Option<&Publication> {
        self.store.get(id)
    }

    /// Ranked keyword search.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&Publication> {
        let hits = self.keywords.search(&self.store, query, limit);
        self.hits_to_publications(&hits)
    }

    /// Substring search in corpus order.
    pub fn phrase_search(&self, query: &str, limit: usize) -> Vec<&Publication> {
        let hits = self.keywords.phrase_search(&self.store, query, limit);
        self.hits_to_publications(&hits)
    }

    pub fn query_by_subject(&self, name: &str, limit: Option<usize>) -> Vec<&Publication> {
        self.store
            .resolve(self.relations.query_by_subject(name, limit))
    }

    pub fn query_by_stressor(&self, name: &str, limit: Option<usize>) -> Vec<&Publication> {
        self.store
            .resolve(self.relations.query_by_stressor(name, limit))
    }

    pub fn query_connection(
        &self,
        subject: &str,
        stressor: &str,
        limit: Option<usize>,
    ) -> Vec<&Publication> {
        self.store
            .resolve(self.relations.query_connection(subject, stressor, limit))
    }

    pub fn related_subjects(&self, subject: &str) -> Vec<(String, usize)> {
        self.relations.related_subjects(subject)
    }

    /// Publications with a subject tag containing `fragment`, in corpus order.
    pub fn filter_by_subject(&self, fragment: &str, limit: usize) -> Vec<&Publication> {
        let fragment = fragment.trim().to_lowercase();
        self.filter(limit, |p| {
            p.subjects
                .iter()
                .any(|s| s.to_lowercase().contains(&fragment))
        })
    }

    /// Publications with a stressor tag containing `fragment`, in corpus order.
    pub fn filter_by_stressor(&self, fragment: &str, limit: usize) -> Vec<&Publication> {
        let fragment = fragment.trim().to_lowercase();
        self.filter(limit, |p| {
            p.stressors
                .iter()
                .any(|s| s.to_lowercase().contains(&fragment))
        })
    }

    /// All publications in corpus order, optionally capped.
    pub fn publications(&self, limit: Option<usize>) -> Vec<&Publication> {
        self.store
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .collect()
    }

    pub fn stats(&self) -> CorpusStats {
        CorpusStats {
            graph: self.relations.stats().clone(),
            indexed_terms: self.keywords.term_count(),
            year_range: self.store.year_range(),
            skipped_rows: self.report.skipped,
            generation: self.generation,
        }
    }

    fn filter(&self, limit: usize, keep: impl Fn(&Publication) -> bool) -> Vec<&Publication> {
        self.store.iter().filter(|p| keep(p)).take(limit).collect()
    }

    fn hits_to_publications(&self, hits: &[KeywordHit]) -> Vec<&Publication> {
        hits.iter()
            .filter_map(|hit| self.store.get(hit.publication_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{ingest, RawRecord};

    fn titles(publications: &[&Publication]) -> Vec<String> {
        publications.iter().map(|p| p.title.clone()).collect()
    }

    fn snapshot() -> IndexSnapshot {
        ingest(vec![
            RawRecord::new("Mice bone loss", "Microgravity reduces bone density").with_year(2012),
            RawRecord::new("Plant growth", "Arabidopsis roots under microgravity").with_year(2019),
            RawRecord::new("Radiation and mice", "Cosmic rays damage tissue"),
            RawRecord::new("Crew isolation", "Confinement effects on humans").with_year("n/a"),
        ])
        .unwrap()
    }

    #[test]
    fn test_search_maps_hits_to_publications() {
        let snapshot = snapshot();
        let results = snapshot.search("microgravity bone", 10);
        assert_eq!(titles(&results), vec!["Mice bone loss", "Plant growth"]);
    }

    #[test]
    fn test_phrase_search_maps_hits_to_publications() {
        let snapshot = snapshot();
        let results = snapshot.phrase_search("bone density", 10);
        assert_eq!(titles(&results), vec!["Mice bone loss"]);
    }

    #[test]
    fn test_query_by_subject_returns_records() {
        let snapshot = snapshot();
        let results = snapshot.query_by_subject("mice", None);
        assert_eq!(titles(&results), vec!["Mice bone loss", "Radiation and mice"]);
    }

    #[test]
    fn test_query_connection_returns_records() {
        let snapshot = snapshot();
        let results = snapshot.query_connection("Mice", "Space Radiation", None);
        assert_eq!(titles(&results), vec!["Radiation and mice"]);
    }

    #[test]
    fn test_filter_by_tag_fragment() {
        let snapshot = snapshot();
        assert_eq!(
            titles(&snapshot.filter_by_stressor("gravity", DEFAULT_FILTER_LIMIT)),
            vec!["Mice bone loss", "Plant growth"]
        );
        assert_eq!(
            titles(&snapshot.filter_by_subject("ARABID", 1)),
            vec!["Plant growth"]
        );
        assert!(snapshot.filter_by_subject("tardigrade", 10).is_empty());
    }

    #[test]
    fn test_publications_limit() {
        let snapshot = snapshot();
        assert_eq!(snapshot.publications(None).len(), 4);
        assert_eq!(snapshot.publications(Some(2)).len(), 2);
    }

    #[test]
    fn test_stats() {
        let snapshot = snapshot().with_generation(7);
        let stats = snapshot.stats();
        assert_eq!(stats.graph.publication_count, 4);
        assert_eq!(stats.year_range, Some((2012, 2019)));
        assert_eq!(stats.skipped_rows, 0);
        assert_eq!(stats.generation, 7);
        assert!(stats.indexed_terms > 10);
    }

    #[test]
    fn test_stats_serialize_flat() {
        let json = serde_json::to_value(snapshot().stats()).unwrap();
        assert_eq!(json["publication_count"], 4);
        assert!(json["top_subjects"].is_array());
    }
}
