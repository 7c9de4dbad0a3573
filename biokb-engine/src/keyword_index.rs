//! Keyword Index with Term-Overlap Scoring
//!
//! Inverted index from lowercase terms (four characters or longer) to the
//! publications whose title or abstract contain them.
//!
//! Ranking is deliberately simple: a publication scores one point per
//! distinct query term it contains. There is no IDF weighting.
//!
//! Performance targets:
//! - Build time: < 50ms for ~600 publications
//! - Query time: < 1ms for typical queries

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::publication::{Publication, PublicationId, PublicationStore};

/// Shortest word that is indexed.
pub const MIN_TERM_LENGTH: usize = 4;

/// Result of a keyword search with scoring information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordHit {
    pub publication_id: PublicationId,
    /// Number of distinct query terms found in the publication
    pub score: usize,
    pub match_kind: MatchKind,
}

/// Which strategy produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Matched through the postings lists
    Terms,
    /// Matched by the substring fallback
    Phrase,
}

/// Inverted keyword index over a publication store.
#[derive(Debug, Default, Clone)]
pub struct KeywordIndex {
    /// Term -> publication ids, ascending
    postings: HashMap<String, Vec<PublicationId>>,
    total_docs: usize,
}

impl KeywordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index over every publication in the store.
    pub fn build(store: &PublicationStore) -> Self {
        let mut builder = KeywordIndexBuilder::new();
        for publication in store.iter() {
            builder.add_publication(publication);
        }
        builder.build()
    }

    /// Ranked term-overlap search, falling back to [`phrase_search`] when
    /// the query has terms but none of them are indexed.
    ///
    /// Results are sorted by descending score; ties keep corpus order.
    ///
    /// [`phrase_search`]: KeywordIndex::phrase_search
    pub fn search(&self, store: &PublicationStore, query: &str, limit: usize) -> Vec<KeywordHit> {
        let terms = distinct_terms(query);
        if terms.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut scores: HashMap<PublicationId, usize> = HashMap::new();
        for term in &terms {
            if let Some(ids) = self.postings.get(term) {
                for id in ids {
                    *scores.entry(*id).or_insert(0) += 1;
                }
            }
        }

        if scores.is_empty() {
            return self.phrase_search(store, query, limit);
        }

        let mut results: Vec<KeywordHit> = scores
            .into_iter()
            .map(|(publication_id, score)| KeywordHit {
                publication_id,
                score,
                match_kind: MatchKind::Terms,
            })
            .collect();

        // Ids are corpus positions, so the secondary key is corpus order
        results.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then(a.publication_id.cmp(&b.publication_id))
        });
        results.truncate(limit);
        results
    }

    /// Case-insensitive substring match of the whole query against title and
    /// abstract. Returns the first `limit` matches in corpus order.
    pub fn phrase_search(
        &self,
        store: &PublicationStore,
        query: &str,
        limit: usize,
    ) -> Vec<KeywordHit> {
        let phrase = query.trim().to_lowercase();
        if phrase.is_empty() {
            return Vec::new();
        }

        store
            .iter()
            .filter(|publication| publication.mentions(&phrase))
            .take(limit)
            .map(|publication| KeywordHit {
                publication_id: publication.id,
                score: 0,
                match_kind: MatchKind::Phrase,
            })
            .collect()
    }

    /// Postings list for a term, if indexed.
    pub fn postings(&self, term: &str) -> Option<&[PublicationId]> {
        self.postings.get(&term.to_lowercase()).map(Vec::as_slice)
    }

    /// Get the number of indexed publications.
    pub fn document_count(&self) -> usize {
        self.total_docs
    }

    /// Get the number of distinct terms.
    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    /// Check if a term exists in the index.
    pub fn has_term(&self, term: &str) -> bool {
        self.postings.contains_key(&term.to_lowercase())
    }
}

/// Builder for constructing a KeywordIndex one publication at a time.
#[derive(Debug, Default)]
pub struct KeywordIndexBuilder {
    postings: HashMap<String, Vec<PublicationId>>,
    total_docs: usize,
}

impl KeywordIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the title and abstract of a publication.
    pub fn add_publication(&mut self, publication: &Publication) {
        for term in distinct_terms(&publication.searchable_text()) {
            let ids = self.postings.entry(term).or_default();
            // Publications arrive in id order, so a repeat can only be the tail
            if ids.last() != Some(&publication.id) {
                ids.push(publication.id);
            }
        }
        self.total_docs += 1;
    }

    pub fn build(self) -> KeywordIndex {
        KeywordIndex {
            postings: self.postings,
            total_docs: self.total_docs,
        }
    }
}

/// Split text into lowercase words of at least [`MIN_TERM_LENGTH`]
/// characters. A word is a run of alphanumeric characters or underscores.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            current.extend(ch.to_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
        .into_iter()
        .filter(|t| t.chars().count() >= MIN_TERM_LENGTH)
        .collect()
}

fn distinct_terms(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(docs: &[(&str, &str)]) -> PublicationStore {
        let mut store = PublicationStore::new();
        for (title, abstract_text) in docs {
            store
                .insert(
                    Publication::builder()
                        .title(*title)
                        .abstract_text(*abstract_text),
                )
                .unwrap();
        }
        store
    }

    fn ids(hits: &[KeywordHit]) -> Vec<u32> {
        hits.iter().map(|h| h.publication_id.0).collect()
    }

    // ============================================
    // Tokenization Tests
    // ============================================

    #[test]
    fn test_tokenize_simple() {
        assert_eq!(
            tokenize("Bone loss during spaceflight"),
            vec!["bone", "loss", "during", "spaceflight"]
        );
    }

    #[test]
    fn test_tokenize_filters_short_words() {
        assert_eq!(tokenize("on a rat in the ISS"), Vec::<String>::new());
        assert_eq!(tokenize("mice and rats"), vec!["mice", "rats"]);
    }

    #[test]
    fn test_tokenize_punctuation_and_underscore() {
        assert_eq!(
            tokenize("gene_expression, (hindlimb-unloading)"),
            vec!["gene_expression", "hindlimb", "unloading"]
        );
    }

    #[test]
    fn test_tokenize_counts_characters_not_bytes() {
        // Three characters, six bytes
        assert!(tokenize("été").is_empty());
        assert_eq!(tokenize("Ärzte"), vec!["ärzte"]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").is_empty());
    }

    // ============================================
    // Build Tests
    // ============================================

    #[test]
    fn test_build_empty() {
        let index = KeywordIndex::build(&PublicationStore::new());
        assert_eq!(index.document_count(), 0);
        assert_eq!(index.term_count(), 0);
    }

    #[test]
    fn test_build_records_each_publication_once_per_term() {
        let store = store(&[("Muscle muscle MUSCLE", "muscle atrophy")]);
        let index = KeywordIndex::build(&store);
        assert_eq!(index.postings("muscle"), Some(&[PublicationId(0)][..]));
        assert!(index.has_term("ATROPHY"));
    }

    #[test]
    fn test_term_present_iff_occurs() {
        let store = store(&[
            ("Radiation effects", "on plant roots"),
            ("Hypoxia in mice", ""),
        ]);
        let index = KeywordIndex::build(&store);
        for term in ["radiation", "effects", "plant", "roots", "hypoxia", "mice"] {
            assert!(index.has_term(term), "missing {term}");
        }
        // Shorter than four characters
        assert!(!index.has_term("on"));
        assert!(!index.has_term("in"));
        assert_eq!(index.term_count(), 6);
    }

    // ============================================
    // Search Tests
    // ============================================

    #[test]
    fn test_search_empty_query() {
        let store = store(&[("Microgravity", "")]);
        let index = KeywordIndex::build(&store);
        assert!(index.search(&store, "", 10).is_empty());
        assert!(index.search(&store, "   ", 10).is_empty());
    }

    #[test]
    fn test_search_query_without_indexable_terms() {
        let store = store(&[("Rat bone", "")]);
        let index = KeywordIndex::build(&store);
        // "rat" is too short to be a term, and no phrase fallback is attempted
        assert!(index.search(&store, "rat", 10).is_empty());
    }

    #[test]
    fn test_search_ranks_by_distinct_term_overlap() {
        let store = store(&[
            ("Bone loss", "bone bone bone"),
            ("Bone loss in mice", "microgravity"),
            ("Plant growth", "microgravity"),
        ]);
        let index = KeywordIndex::build(&store);
        let hits = index.search(&store, "microgravity bone mice", 10);
        assert_eq!(ids(&hits), vec![1, 0, 2]);
        assert_eq!(hits[0].score, 3);
        // Repetition in the document does not add score
        assert_eq!(hits[1].score, 1);
        assert_eq!(hits[1].match_kind, MatchKind::Terms);
    }

    #[test]
    fn test_search_ties_keep_corpus_order() {
        let store = store(&[
            ("alpha", "spaceflight"),
            ("beta", "spaceflight"),
            ("gamma", "spaceflight"),
        ]);
        let index = KeywordIndex::build(&store);
        assert_eq!(ids(&index.search(&store, "spaceflight", 10)), vec![0, 1, 2]);
    }

    #[test]
    fn test_search_limit() {
        let docs: Vec<(&str, &str)> = (0..5).map(|_| ("retina", "")).collect();
        let store = store(&docs);
        let index = KeywordIndex::build(&store);
        assert_eq!(index.search(&store, "retina", 3).len(), 3);
        assert!(index.search(&store, "retina", 0).is_empty());
    }

    #[test]
    fn test_search_case_insensitive() {
        let store = store(&[("ARABIDOPSIS roots", "")]);
        let index = KeywordIndex::build(&store);
        assert_eq!(ids(&index.search(&store, "arabidopsis", 10)), vec![0]);
    }

    #[test]
    fn test_search_results_contain_a_query_term() {
        let store = store(&[
            ("Cardiovascular deconditioning", "astronauts"),
            ("Immune response", "in orbit"),
            ("Yeast genome", "stability"),
        ]);
        let index = KeywordIndex::build(&store);
        let query = "immune astronauts";
        let terms = tokenize(query);
        for hit in index.search(&store, query, 10) {
            let publication = store.get(hit.publication_id).unwrap();
            let text = publication.searchable_text().to_lowercase();
            assert!(terms.iter().any(|t| text.contains(t.as_str())));
        }
    }

    // ============================================
    // Phrase Fallback Tests
    // ============================================

    #[test]
    fn test_search_falls_back_to_phrase() {
        let store = store(&[
            ("Simulated microgravity", ""),
            ("Plant roots", "hypergravity"),
        ]);
        let index = KeywordIndex::build(&store);
        // "icrograv" is not a whole word, so only the substring fallback finds it
        let hits = index.search(&store, "icrograv", 10);
        assert_eq!(ids(&hits), vec![0]);
        assert_eq!(hits[0].match_kind, MatchKind::Phrase);
    }

    #[test]
    fn test_phrase_search_corpus_order_and_limit() {
        let store = store(&[
            ("one", "space biology"),
            ("two", "nothing"),
            ("Space Biology review", ""),
            ("four", "space biology again"),
        ]);
        let index = KeywordIndex::build(&store);
        assert_eq!(
            ids(&index.phrase_search(&store, "space biology", 2)),
            vec![0, 2]
        );
        assert!(index.phrase_search(&store, "", 2).is_empty());
    }

    // ============================================
    // Performance Tests
    // ============================================

    #[test]
    fn test_performance_corpus_sized_index() {
        let mut store = PublicationStore::new();
        for i in 0..600 {
            store
                .insert(
                    Publication::builder()
                        .title(format!("Publication {i} on spaceflight"))
                        .abstract_text(format!("Abstract body number{i} describing microgravity")),
                )
                .unwrap();
        }

        let start = std::time::Instant::now();
        let index = KeywordIndex::build(&store);
        let build_time = start.elapsed();
        assert!(
            build_time.as_millis() < 500,
            "Build took too long: {build_time:?}"
        );
        assert_eq!(index.document_count(), 600);

        let hits = index.search(&store, "spaceflight microgravity", 20);
        assert_eq!(hits.len(), 20);
        assert_eq!(hits[0].score, 2);
    }
}
