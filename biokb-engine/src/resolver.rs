//! Query Resolution
//!
//! Turns a free-text research question into an ordered list of publications:
//!
//! 1. Extract concepts (subjects, stressors, free keywords) from the query,
//!    and add any indexed entity name that appears literally in it.
//! 2. Probe the relational index by subject, then by stressor, then by
//!    subject x stressor pair, deduplicating in first-seen order.
//! 3. If too few candidates were found, broaden with a substring scan of the
//!    whole store for any concept.
//! 4. Cap the list.
//!
//! The output order is accumulation order (subject hits, stressor hits,
//! pair hits, broadened hits). It is a precedence, not a relevance score.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::cache::{CacheStats, QueryCache, DEFAULT_CACHE_CAPACITY};
use crate::publication::{Publication, PublicationId};
use crate::snapshot::IndexSnapshot;

/// Tunable limits for query resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Broaden when fewer candidates than this were found (default: 5)
    pub min_candidates: usize,
    /// Stop broadening once the list holds this many (default: 20)
    pub broaden_cap: usize,
    /// Maximum publications returned (default: 50)
    pub final_cap: usize,
    /// Resolved queries kept in the cache (default: 100)
    pub cache_capacity: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_candidates: 5,
            broaden_cap: 20,
            final_cap: 50,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_candidates(mut self, min_candidates: usize) -> Self {
        self.min_candidates = min_candidates;
        self
    }

    pub fn with_broaden_cap(mut self, broaden_cap: usize) -> Self {
        self.broaden_cap = broaden_cap;
        self
    }

    pub fn with_final_cap(mut self, final_cap: usize) -> Self {
        self.final_cap = final_cap;
        self
    }

    pub fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }
}

/// Concepts found in a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptSet {
    /// Canonical subject names
    pub subjects: BTreeSet<String>,
    /// Canonical stressor names
    pub stressors: BTreeSet<String>,
    /// Lowercase surface forms and biological terms
    pub keywords: BTreeSet<String>,
}

impl ConceptSet {
    /// Every concept, lowercased.
    pub fn all(&self) -> BTreeSet<String> {
        self.subjects
            .iter()
            .chain(&self.stressors)
            .chain(&self.keywords)
            .map(|c| c.to_lowercase())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty() && self.stressors.is_empty() && self.keywords.is_empty()
    }
}

/// Whether the broadening scan ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionPath {
    /// Index lookups alone met the minimum
    Sufficient,
    /// The substring scan was used to top up
    Broadened,
}

/// Snapshot-independent outcome of resolving one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub concepts: ConceptSet,
    pub publication_ids: Vec<PublicationId>,
    pub path: ResolutionPath,
    /// Candidates found by the index lookups alone
    pub candidates_before_broadening: usize,
}

/// A resolution bound to the snapshot it was computed against.
#[derive(Debug, Clone)]
pub struct QueryResult {
    snapshot: Arc<IndexSnapshot>,
    resolution: Arc<Resolution>,
}

impl QueryResult {
    pub fn concepts(&self) -> &ConceptSet {
        &self.resolution.concepts
    }

    pub fn publication_ids(&self) -> &[PublicationId] {
        &self.resolution.publication_ids
    }

    /// Publications in result order.
    pub fn publications(&self) -> Vec<&Publication> {
        self.snapshot.store().resolve(&self.resolution.publication_ids)
    }

    pub fn path(&self) -> ResolutionPath {
        self.resolution.path
    }

    pub fn candidates_before_broadening(&self) -> usize {
        self.resolution.candidates_before_broadening
    }

    pub fn len(&self) -> usize {
        self.resolution.publication_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolution.publication_ids.is_empty()
    }

    /// The snapshot this result reads from.
    pub fn snapshot(&self) -> &Arc<IndexSnapshot> {
        &self.snapshot
    }
}

impl Serialize for QueryResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("QueryResult", 4)?;
        state.serialize_field("concepts", self.concepts())?;
        state.serialize_field("path", &self.path())?;
        state.serialize_field(
            "candidates_before_broadening",
            &self.candidates_before_broadening(),
        )?;
        state.serialize_field("publications", &self.publications())?;
        state.end()
    }
}

/// Resolves queries against snapshots, caching the outcome.
#[derive(Debug)]
pub struct QueryResolver {
    config: ResolverConfig,
    cache: QueryCache,
}

impl QueryResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            cache: QueryCache::new(config.cache_capacity),
            config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve `query` against `snapshot`, serving from the cache when the
    /// same query was already resolved against the same snapshot generation.
    pub fn resolve(&self, snapshot: &Arc<IndexSnapshot>, query: &str) -> QueryResult {
        let generation = snapshot.generation();
        let resolution = match self.cache.get(generation, query) {
            Some(cached) => cached,
            None => {
                let resolution = Arc::new(self.resolve_uncached(snapshot, query));
                self.cache.put(generation, query, Arc::clone(&resolution));
                resolution
            }
        };

        QueryResult {
            snapshot: Arc::clone(snapshot),
            resolution,
        }
    }

    /// Run the full resolution without touching the cache.
    ///
    /// The query is normalized first, exactly as the cache key is, so a
    /// cached answer and a fresh one never differ.
    pub fn resolve_uncached(&self, snapshot: &IndexSnapshot, query: &str) -> Resolution {
        let query = QueryCache::normalize(query);
        let concepts = extract_concepts(snapshot, &query);

        let mut gathered = Gathered::default();
        let relations = snapshot.relations();

        for subject in &concepts.subjects {
            gathered.extend(relations.query_by_subject(subject, None));
        }
        for stressor in &concepts.stressors {
            gathered.extend(relations.query_by_stressor(stressor, None));
        }
        for subject in &concepts.subjects {
            for stressor in &concepts.stressors {
                gathered.extend(relations.query_connection(subject, stressor, None));
            }
        }

        let candidates_before_broadening = gathered.ids.len();
        let path = if candidates_before_broadening < self.config.min_candidates {
            self.broaden(snapshot, &concepts, &mut gathered);
            ResolutionPath::Broadened
        } else {
            ResolutionPath::Sufficient
        };

        let mut publication_ids = gathered.ids;
        publication_ids.truncate(self.config.final_cap);

        debug!(
            "Resolved {:?}: {} candidates, {} returned, path {:?}",
            query,
            candidates_before_broadening,
            publication_ids.len(),
            path
        );

        Resolution {
            concepts,
            publication_ids,
            path,
            candidates_before_broadening,
        }
    }

    /// Append publications mentioning any concept, in corpus order, until
    /// the list reaches `broaden_cap`.
    fn broaden(&self, snapshot: &IndexSnapshot, concepts: &ConceptSet, gathered: &mut Gathered) {
        let needles: Vec<String> = concepts.all().into_iter().filter(|n| !n.is_empty()).collect();
        if needles.is_empty() {
            return;
        }

        for publication in snapshot.store().iter() {
            if gathered.ids.len() >= self.config.broaden_cap {
                break;
            }
            if gathered.seen.contains(&publication.id) {
                continue;
            }
            let title = publication.title.to_lowercase();
            let abstract_text = publication.abstract_text.to_lowercase();
            if needles
                .iter()
                .any(|n| title.contains(n.as_str()) || abstract_text.contains(n.as_str()))
            {
                gathered.push(publication.id);
            }
        }
    }

    /// Drop all cached resolutions.
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl Default for QueryResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

/// Concepts from the extractor plus indexed names found verbatim in the query.
pub fn extract_concepts(snapshot: &IndexSnapshot, query: &str) -> ConceptSet {
    let extractor = snapshot.extractor();
    let extraction = extractor.extract(query);
    let mut concepts = ConceptSet {
        subjects: extraction.subjects,
        stressors: extraction.stressors,
        keywords: extraction.mentions,
    };
    concepts.keywords.extend(extractor.biological_terms(query));

    let lowered = query.to_lowercase();
    let relations = snapshot.relations();
    for subject in relations.subject_names() {
        if lowered.contains(&subject.to_lowercase()) {
            concepts.subjects.insert(subject.to_string());
        }
    }
    for stressor in relations.stressor_names() {
        if lowered.contains(&stressor.to_lowercase()) {
            concepts.stressors.insert(stressor.to_string());
        }
    }

    concepts
}

/// Deduplicated ids in first-seen order.
#[derive(Default)]
struct Gathered {
    ids: Vec<PublicationId>,
    seen: HashSet<PublicationId>,
}

impl Gathered {
    fn push(&mut self, id: PublicationId) {
        if self.seen.insert(id) {
            self.ids.push(id);
        }
    }

    fn extend(&mut self, ids: &[PublicationId]) {
        for id in ids {
            self.push(*id);
        }
    }
}
