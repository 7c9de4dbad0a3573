//! Corpus ingestion
//!
//! Turns raw tabular rows into a fully built [`IndexSnapshot`]. Rows are
//! tagged by the entity extractor as they are stored. A row that cannot be
//! used is skipped and counted rather than aborting the build.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::{IngestionError, Result as EngineResult};
use crate::extract::EntityExtractor;
use crate::publication::{Publication, PublicationStore};
use crate::snapshot::IndexSnapshot;

/// One raw corpus row. Field names are accepted both lowercase and in the
/// capitalized spelling of the source spreadsheet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default, alias = "Title")]
    pub title: Option<String>,
    #[serde(default, rename = "abstract", alias = "Abstract")]
    pub abstract_text: Option<String>,
    #[serde(default, alias = "Year")]
    pub year: Option<ScalarField>,
    #[serde(default, alias = "Journal")]
    pub journal: Option<String>,
    #[serde(default, alias = "PMID", alias = "pmid", alias = "id")]
    pub identifier: Option<ScalarField>,
    #[serde(default, alias = "Link", alias = "URL")]
    pub url: Option<String>,
}

impl RawRecord {
    /// Row with just the two text fields set.
    pub fn new(title: impl Into<String>, abstract_text: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            abstract_text: Some(abstract_text.into()),
            ..Self::default()
        }
    }

    pub fn with_year(mut self, year: impl Into<ScalarField>) -> Self {
        self.year = Some(year.into());
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<ScalarField>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_journal(mut self, journal: impl Into<String>) -> Self {
        self.journal = Some(journal.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Year as an integer; anything unparsable counts as absent.
    pub fn parsed_year(&self) -> Option<i32> {
        let year = self.year.as_ref()?;
        let parsed = year.as_integer().and_then(|y| i32::try_from(y).ok());
        if parsed.is_none() {
            debug!("Ignoring malformed year {:?}", year);
        }
        parsed
    }

    fn into_builder(self) -> crate::publication::PublicationBuilder {
        let year = self.parsed_year();
        let mut builder = Publication::builder()
            .title(self.title.unwrap_or_default())
            .abstract_text(self.abstract_text.unwrap_or_default())
            .year(year);
        if let Some(journal) = self.journal {
            builder = builder.journal(journal);
        }
        if let Some(identifier) = self.identifier.and_then(|id| id.as_text()) {
            builder = builder.external_id(identifier);
        }
        if let Some(url) = self.url {
            builder = builder.url(url);
        }
        builder
    }
}

/// A cell that may arrive as an integer, a float or a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScalarField {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ScalarField {
    /// Whole-number value. Spreadsheet exports often write `2015.0`.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Float(value) => whole(*value),
            Self::Text(text) => {
                let text = text.trim();
                text.parse::<i64>()
                    .ok()
                    .or_else(|| text.parse::<f64>().ok().and_then(whole))
            }
        }
    }

    /// Text form, with whole floats printed without a fraction.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Integer(value) => Some(value.to_string()),
            Self::Float(value) => whole(*value).map(|v| v.to_string()),
            Self::Text(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
        }
    }
}

impl From<i64> for ScalarField {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for ScalarField {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<&str> for ScalarField {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ScalarField {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

fn whole(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0).then_some(value as i64)
}

/// Outcome counts of one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub accepted: usize,
    pub skipped: usize,
}

/// Build a snapshot from typed rows with the default entity rules.
pub fn ingest(
    rows: impl IntoIterator<Item = RawRecord>,
) -> Result<IndexSnapshot, IngestionError> {
    ingest_with(rows, Arc::new(EntityExtractor::default()))
}

/// Build a snapshot from typed rows, tagging with `extractor`.
pub fn ingest_with(
    rows: impl IntoIterator<Item = RawRecord>,
    extractor: Arc<EntityExtractor>,
) -> Result<IndexSnapshot, IngestionError> {
    build_snapshot(rows.into_iter().map(Some), extractor)
}

/// Build a snapshot from untyped JSON rows. Rows that do not decode as a
/// [`RawRecord`] are skipped.
pub fn ingest_json(
    rows: Vec<serde_json::Value>,
    extractor: Arc<EntityExtractor>,
) -> Result<IndexSnapshot, IngestionError> {
    let decoded = rows
        .into_iter()
        .enumerate()
        .map(|(row, value)| match serde_json::from_value::<RawRecord>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("Skipping row {}: {}", row, e);
                None
            }
        });
    build_snapshot(decoded, extractor)
}

/// Decode a corpus document, which must be a JSON array of rows. The rows
/// themselves stay untyped so one bad row is skipped rather than fatal.
pub fn parse_rows(text: &str) -> EngineResult<Vec<serde_json::Value>> {
    Ok(serde_json::from_str(text)?)
}

/// Read and decode a corpus file.
pub fn read_rows(path: &Path) -> EngineResult<Vec<serde_json::Value>> {
    let text = std::fs::read_to_string(path)?;
    let rows = parse_rows(&text)?;
    debug!("Read {} rows from {:?}", rows.len(), path);
    Ok(rows)
}

/// `None` entries are rows that already failed to decode.
fn build_snapshot(
    rows: impl Iterator<Item = Option<RawRecord>>,
    extractor: Arc<EntityExtractor>,
) -> Result<IndexSnapshot, IngestionError> {
    let start = Instant::now();
    let mut store = PublicationStore::new();
    let mut report = IngestReport::default();
    let mut seen = 0usize;

    for (row, record) in rows.enumerate() {
        seen += 1;
        let Some(record) = record else {
            report.skipped += 1;
            continue;
        };

        let builder = record.into_builder();
        let tags = extractor.extract(&builder.text());
        let builder = builder.subjects(tags.subjects).stressors(tags.stressors);

        match store.insert(builder) {
            Ok(_) => report.accepted += 1,
            Err(e) => {
                debug!("Skipping row {}: {}", row, e);
                report.skipped += 1;
            }
        }
    }

    if seen == 0 {
        return Err(IngestionError::EmptyCorpus);
    }
    if store.is_empty() {
        return Err(IngestionError::NoUsableRows {
            skipped: report.skipped,
        });
    }

    let snapshot = IndexSnapshot::from_store(store, extractor, report);
    info!(
        "Ingested {} publications ({} skipped) in {:.2}ms",
        report.accepted,
        report.skipped,
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(snapshot)
}
