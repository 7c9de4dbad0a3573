//! Publication records and the store that owns them
//!
//! Every index in the crate refers to publications by [`PublicationId`] only;
//! the [`PublicationStore`] is the single owner of the records themselves.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Stable identifier of a publication: its position in the ingested corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicationId(pub u32);

impl PublicationId {
    /// Position of the publication in the store.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for PublicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single indexed research record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub id: PublicationId,
    /// Identifier carried by the source row (e.g. a PMID)
    pub external_id: Option<String>,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub year: Option<i32>,
    pub journal: Option<String>,
    pub url: Option<String>,
    /// Canonical subject tags
    pub subjects: BTreeSet<String>,
    /// Canonical stressor tags
    pub stressors: BTreeSet<String>,
}

impl Publication {
    /// Create a builder for a publication
    pub fn builder() -> PublicationBuilder {
        PublicationBuilder::new()
    }

    /// Title and abstract joined with a space, the text every index reads.
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.title, self.abstract_text)
    }

    /// Case-insensitive substring test against title and abstract.
    /// `needle` must already be lowercase.
    pub fn mentions(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.abstract_text.to_lowercase().contains(needle)
    }
}

/// Builder for [`Publication`] that validates required text at build time.
#[derive(Debug, Default, Clone)]
pub struct PublicationBuilder {
    external_id: Option<String>,
    title: String,
    abstract_text: String,
    year: Option<i32>,
    journal: Option<String>,
    url: Option<String>,
    subjects: BTreeSet<String>,
    stressors: BTreeSet<String>,
}

impl PublicationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = non_blank(id.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into().trim().to_string();
        self
    }

    pub fn abstract_text(mut self, text: impl Into<String>) -> Self {
        self.abstract_text = text.into().trim().to_string();
        self
    }

    pub fn year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    pub fn journal(mut self, journal: impl Into<String>) -> Self {
        self.journal = non_blank(journal.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = non_blank(url.into());
        self
    }

    /// Add a subject tag
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subjects.insert(subject.into());
        self
    }

    /// Add a stressor tag
    pub fn stressor(mut self, stressor: impl Into<String>) -> Self {
        self.stressors.insert(stressor.into());
        self
    }

    pub fn subjects(mut self, subjects: impl IntoIterator<Item = String>) -> Self {
        self.subjects.extend(subjects);
        self
    }

    pub fn stressors(mut self, stressors: impl IntoIterator<Item = String>) -> Self {
        self.stressors.extend(stressors);
        self
    }

    /// Borrow the title and abstract before the record is finalized,
    /// so tags can be derived from them.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.abstract_text)
    }

    /// Build the publication under the given id.
    pub fn build(self, id: PublicationId) -> Result<Publication, PublicationBuilderError> {
        if self.title.is_empty() && self.abstract_text.is_empty() {
            return Err(PublicationBuilderError::MissingText);
        }

        let url = self.url.or_else(|| {
            self.external_id
                .as_ref()
                .map(|pmid| format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/"))
        });

        Ok(Publication {
            id,
            external_id: self.external_id,
            title: self.title,
            abstract_text: self.abstract_text,
            year: self.year,
            journal: self.journal,
            url,
            subjects: self.subjects,
            stressors: self.stressors,
        })
    }
}

/// Errors that can occur when building a Publication
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PublicationBuilderError {
    #[error("Publication has neither a title nor an abstract")]
    MissingText,
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Owner of all publication records, addressed by [`PublicationId`].
#[derive(Debug, Default, Clone)]
pub struct PublicationStore {
    publications: Vec<Publication>,
}

impl PublicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the record under the next free id and store it.
    pub fn insert(
        &mut self,
        builder: PublicationBuilder,
    ) -> Result<PublicationId, PublicationBuilderError> {
        let id = PublicationId(self.publications.len() as u32);
        let publication = builder.build(id)?;
        self.publications.push(publication);
        Ok(id)
    }

    /// Store every builder, skipping invalid ones. Returns the skip count.
    pub fn extend(&mut self, builders: impl IntoIterator<Item = PublicationBuilder>) -> usize {
        let mut skipped = 0;
        for builder in builders {
            if self.insert(builder).is_err() {
                skipped += 1;
            }
        }
        skipped
    }

    pub fn get(&self, id: PublicationId) -> Option<&Publication> {
        self.publications.get(id.index())
    }

    /// Resolve ids to records, dropping ids that are not in the store.
    pub fn resolve<'a>(
        &'a self,
        ids: impl IntoIterator<Item = &'a PublicationId>,
    ) -> Vec<&'a Publication> {
        ids.into_iter().filter_map(|id| self.get(*id)).collect()
    }

    /// Publications in corpus order.
    pub fn iter(&self) -> impl Iterator<Item = &Publication> {
        self.publications.iter()
    }

    pub fn len(&self) -> usize {
        self.publications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.publications.is_empty()
    }

    /// Earliest and latest publication year, if any year is known.
    pub fn year_range(&self) -> Option<(i32, i32)> {
        let mut years = self.publications.iter().filter_map(|p| p.year);
        let first = years.next()?;
        Some(years.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y))))
    }
}
