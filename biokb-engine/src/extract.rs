//! Entity Extraction
//!
//! Derives subject and stressor tags from free text using pre-compiled,
//! case-insensitive pattern alternations. The same extractor tags
//! publications at ingestion time and pulls concepts out of queries, so both
//! sides share one canonical vocabulary.
//!
//! The pattern and canonicalization tables live in [`EntityRules`], a plain
//! value that can be swapped without touching any index code.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::Result;

/// Maps any raw stressor match containing one of `needles` to `canonical`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRule {
    pub needles: Vec<String>,
    pub canonical: String,
}

impl CanonicalRule {
    pub fn new(needles: &[&str], canonical: &str) -> Self {
        Self {
            needles: needles.iter().map(|n| n.to_string()).collect(),
            canonical: canonical.to_string(),
        }
    }

    fn applies_to(&self, lowered: &str) -> bool {
        self.needles.iter().any(|n| lowered.contains(n.as_str()))
    }
}

/// Pattern and canonicalization tables for the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRules {
    /// Regex fragments naming studied organisms
    pub subject_patterns: Vec<String>,
    /// Regex fragments naming environmental conditions
    pub stressor_patterns: Vec<String>,
    /// Checked in order; first match wins, otherwise the match is title-cased
    pub stressor_rules: Vec<CanonicalRule>,
    /// Plain biological vocabulary picked up from queries as free keywords
    pub biological_terms: Vec<String>,
}

impl Default for EntityRules {
    fn default() -> Self {
        let owned =
            |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        Self {
            subject_patterns: owned(&[
                "mice?",
                "mouse",
                "rodents?",
                "rats?",
                "arabidopsis",
                "plants?",
                "wheat",
                "lettuce",
                "humans?",
                "cells?",
                "tissues?",
                "bacteria",
                "yeast",
                "fungus",
                "nematode",
            ]),
            stressor_patterns: owned(&[
                "microgravity",
                "gravity",
                "weightlessness",
                "radiation",
                r"cosmic\s*rays?",
                r"solar\s*particles?",
                "hypoxia",
                "oxygen",
                "temperature",
                "heat",
                "cold",
                "isolation",
                "confinement",
            ]),
            stressor_rules: vec![
                CanonicalRule::new(&["micro", "gravity"], "Microgravity"),
                CanonicalRule::new(&["radia"], "Space Radiation"),
                CanonicalRule::new(&["oxygen", "hypoxia"], "Hypoxia"),
            ],
            biological_terms: owned(&[
                "gene",
                "protein",
                "cell",
                "tissue",
                "bone",
                "muscle",
                "cardiovascular",
                "immune",
                "metabolism",
                "growth",
                "photosynthesis",
                "root",
                "leaf",
                "vision",
                "retina",
            ]),
        }
    }
}

/// Tags found in one piece of text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    /// Canonical subject names
    pub subjects: BTreeSet<String>,
    /// Canonical stressor names
    pub stressors: BTreeSet<String>,
    /// Lowercase surface forms that produced the tags
    pub mentions: BTreeSet<String>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty() && self.stressors.is_empty()
    }
}

/// Compiled extractor over a set of [`EntityRules`].
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    subject_pattern: Regex,
    stressor_pattern: Regex,
    rules: EntityRules,
}

impl EntityExtractor {
    /// Compile the rule tables.
    pub fn new(rules: EntityRules) -> Result<Self> {
        let subject_pattern = compile_alternation(&rules.subject_patterns)?;
        let stressor_pattern = compile_alternation(&rules.stressor_patterns)?;
        Ok(Self {
            subject_pattern,
            stressor_pattern,
            rules,
        })
    }

    pub fn rules(&self) -> &EntityRules {
        &self.rules
    }

    /// Extract canonical subject and stressor tags from `text`.
    pub fn extract(&self, text: &str) -> Extraction {
        let mut extraction = Extraction::default();

        for m in self.subject_pattern.find_iter(text) {
            extraction.subjects.insert(capitalize(m.as_str()));
            extraction.mentions.insert(m.as_str().to_lowercase());
        }

        for m in self.stressor_pattern.find_iter(text) {
            extraction
                .stressors
                .insert(self.canonical_stressor(m.as_str()));
            extraction.mentions.insert(m.as_str().to_lowercase());
        }

        extraction
    }

    /// Canonical spelling of a raw stressor match.
    pub fn canonical_stressor(&self, raw: &str) -> String {
        let lowered = raw.to_lowercase();
        self.rules
            .stressor_rules
            .iter()
            .find(|rule| rule.applies_to(&lowered))
            .map(|rule| rule.canonical.clone())
            .unwrap_or_else(|| title_case(raw))
    }

    /// Biological vocabulary terms occurring in `text` (lowercase substring test).
    pub fn biological_terms(&self, text: &str) -> BTreeSet<String> {
        let lowered = text.to_lowercase();
        self.rules
            .biological_terms
            .iter()
            .filter(|term| lowered.contains(term.as_str()))
            .cloned()
            .collect()
    }
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new(EntityRules::default()).expect("built-in entity patterns compile")
    }
}

/// `\b(?:a|b|c)\b`, case-insensitive. Word boundaries keep `mice?` from
/// tagging the front of "microgravity".
fn compile_alternation(patterns: &[String]) -> std::result::Result<Regex, regex::Error> {
    let alternation = if patterns.is_empty() {
        // Never matches
        r"\b\B".to_string()
    } else {
        format!(r"\b(?:{})\b", patterns.join("|"))
    };
    RegexBuilder::new(&alternation).case_insensitive(true).build()
}

/// "mICE" -> "Mice"
fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// "cosmic  RAYS" -> "Cosmic Rays". A letter is upper-cased when it follows
/// a non-letter, lower-cased otherwise. Whitespace runs collapse to one space.
fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for (i, word) in raw.split_whitespace().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let mut prev_is_letter = false;
        for ch in word.chars() {
            if ch.is_alphabetic() {
                if prev_is_letter {
                    out.extend(ch.to_lowercase());
                } else {
                    out.extend(ch.to_uppercase());
                }
                prev_is_letter = true;
            } else {
                out.push(ch);
                prev_is_letter = false;
            }
        }
    }
    out
}
