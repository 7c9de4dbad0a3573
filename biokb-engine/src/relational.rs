//! Subject / stressor indexing for fast relational lookups.
//!
//! Three mappings are derived from the tags on every publication:
//! subject -> ids, stressor -> ids, and (subject, stressor) -> ids. A
//! publication appears under a pair exactly when it carries both tags.
//!
//! Lookups try the exact key first, then the normalized form (trimmed,
//! lowercase) through a table that remembers the first canonical spelling
//! seen for each normalized name.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

use crate::publication::{PublicationId, PublicationStore};

/// Number of entries in the top-subject / top-stressor lists.
pub const TOP_ENTITIES: usize = 5;

/// Secondary indexes over publication tags.
#[derive(Debug, Default, Clone)]
pub struct RelationalIndex {
    /// Subject -> publication ids
    subjects: HashMap<String, Vec<PublicationId>>,

    /// Stressor -> publication ids
    stressors: HashMap<String, Vec<PublicationId>>,

    /// (Subject, stressor) -> publication ids
    connections: HashMap<(String, String), Vec<PublicationId>>,

    /// Normalized subject -> canonical subject
    subject_lookup: HashMap<String, String>,

    /// Normalized stressor -> canonical stressor
    stressor_lookup: HashMap<String, String>,

    /// Computed once at build time
    stats: GraphStats,
}

/// A named entity and how many publications mention it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCount {
    pub name: String,
    pub publications: usize,
}

/// Graph statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub publication_count: usize,
    pub subject_count: usize,
    pub stressor_count: usize,
    pub connection_count: usize,
    pub top_subjects: Vec<EntityCount>,
    pub top_stressors: Vec<EntityCount>,
    pub avg_subjects_per_publication: f64,
    pub avg_stressors_per_publication: f64,
    pub build_time_ms: f64,
}

impl RelationalIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the tags of every publication in the store, in one pass.
    pub fn build(store: &PublicationStore) -> Self {
        let start = Instant::now();
        let mut index = Self::new();
        let mut subject_tags = 0usize;
        let mut stressor_tags = 0usize;

        for publication in store.iter() {
            let id = publication.id;

            for subject in &publication.subjects {
                index
                    .subject_lookup
                    .entry(normalize(subject))
                    .or_insert_with(|| subject.clone());
                index.subjects.entry(subject.clone()).or_default().push(id);
            }

            for stressor in &publication.stressors {
                index
                    .stressor_lookup
                    .entry(normalize(stressor))
                    .or_insert_with(|| stressor.clone());
                index.stressors.entry(stressor.clone()).or_default().push(id);
            }

            for subject in &publication.subjects {
                for stressor in &publication.stressors {
                    index
                        .connections
                        .entry((subject.clone(), stressor.clone()))
                        .or_default()
                        .push(id);
                }
            }

            subject_tags += publication.subjects.len();
            stressor_tags += publication.stressors.len();
        }

        let publication_count = store.len();
        let per_publication = |tags: usize| {
            if publication_count == 0 {
                0.0
            } else {
                tags as f64 / publication_count as f64
            }
        };

        index.stats = GraphStats {
            publication_count,
            subject_count: index.subjects.len(),
            stressor_count: index.stressors.len(),
            connection_count: index.connections.len(),
            top_subjects: top_entities(&index.subjects),
            top_stressors: top_entities(&index.stressors),
            avg_subjects_per_publication: per_publication(subject_tags),
            avg_stressors_per_publication: per_publication(stressor_tags),
            build_time_ms: start.elapsed().as_secs_f64() * 1000.0,
        };

        index
    }

    /// Canonical indexed spelling of a subject name, if known.
    pub fn canonical_subject(&self, name: &str) -> Option<&str> {
        canonical(&self.subjects, &self.subject_lookup, name)
    }

    /// Canonical indexed spelling of a stressor name, if known.
    pub fn canonical_stressor(&self, name: &str) -> Option<&str> {
        canonical(&self.stressors, &self.stressor_lookup, name)
    }

    /// Publications studying a subject. Unknown names yield an empty slice.
    pub fn query_by_subject(&self, name: &str, limit: Option<usize>) -> &[PublicationId] {
        let ids = self
            .canonical_subject(name)
            .and_then(|canonical| self.subjects.get(canonical));
        capped(ids, limit)
    }

    /// Publications applying a stressor. Unknown names yield an empty slice.
    pub fn query_by_stressor(&self, name: &str, limit: Option<usize>) -> &[PublicationId] {
        let ids = self
            .canonical_stressor(name)
            .and_then(|canonical| self.stressors.get(canonical));
        capped(ids, limit)
    }

    /// Publications studying `subject` under `stressor`.
    pub fn query_connection(
        &self,
        subject: &str,
        stressor: &str,
        limit: Option<usize>,
    ) -> &[PublicationId] {
        let exact = self
            .connections
            .get(&(subject.to_string(), stressor.to_string()));
        let ids = exact.or_else(|| {
            let subject = self.canonical_subject(subject)?;
            let stressor = self.canonical_stressor(stressor)?;
            self.connections
                .get(&(subject.to_string(), stressor.to_string()))
        });
        capped(ids, limit)
    }

    /// Other subjects that share publications with `subject`, ordered by
    /// shared-publication count (descending) then name. Subjects with no
    /// overlap are omitted.
    pub fn related_subjects(&self, subject: &str) -> Vec<(String, usize)> {
        let Some(target) = self.canonical_subject(subject) else {
            return Vec::new();
        };
        let target_ids: HashSet<PublicationId> = self
            .subjects
            .get(target)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();

        let mut related: Vec<(String, usize)> = self
            .subjects
            .iter()
            .filter(|(name, _)| name.as_str() != target)
            .map(|(name, ids)| {
                let overlap = ids.iter().filter(|id| target_ids.contains(*id)).count();
                (name.clone(), overlap)
            })
            .filter(|(_, overlap)| *overlap > 0)
            .collect();

        related.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        related
    }

    /// Publication count per subject.
    pub fn subject_coverage(&self) -> BTreeMap<String, usize> {
        coverage(&self.subjects)
    }

    /// Publication count per stressor.
    pub fn stressor_coverage(&self) -> BTreeMap<String, usize> {
        coverage(&self.stressors)
    }

    /// Every indexed subject name.
    pub fn subject_names(&self) -> impl Iterator<Item = &str> {
        self.subjects.keys().map(String::as_str)
    }

    /// Every indexed stressor name.
    pub fn stressor_names(&self) -> impl Iterator<Item = &str> {
        self.stressors.keys().map(String::as_str)
    }

    /// Statistics computed when the index was built.
    pub fn stats(&self) -> &GraphStats {
        &self.stats
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn canonical<'a>(
    map: &'a HashMap<String, Vec<PublicationId>>,
    lookup: &'a HashMap<String, String>,
    name: &str,
) -> Option<&'a str> {
    if let Some((key, _)) = map.get_key_value(name) {
        return Some(key.as_str());
    }
    lookup
        .get(&normalize(name))
        .map(String::as_str)
        .filter(|canonical| map.contains_key(*canonical))
}

fn capped(ids: Option<&Vec<PublicationId>>, limit: Option<usize>) -> &[PublicationId] {
    let ids = ids.map(Vec::as_slice).unwrap_or(&[]);
    match limit {
        Some(limit) => &ids[..limit.min(ids.len())],
        None => ids,
    }
}

fn coverage(map: &HashMap<String, Vec<PublicationId>>) -> BTreeMap<String, usize> {
    map.iter()
        .map(|(name, ids)| (name.clone(), ids.len()))
        .collect()
}

fn top_entities(map: &HashMap<String, Vec<PublicationId>>) -> Vec<EntityCount> {
    let mut counts: Vec<EntityCount> = map
        .iter()
        .map(|(name, ids)| EntityCount {
            name: name.clone(),
            publications: ids.len(),
        })
        .collect();
    counts.sort_by(|a, b| {
        b.publications
            .cmp(&a.publications)
            .then_with(|| a.name.cmp(&b.name))
    });
    counts.truncate(TOP_ENTITIES);
    counts
}
