//! Search Configuration
//!
//! Field catalog and tuning constants for query synthesis.

use serde::{Deserialize, Serialize};

// ============================================================================
// Index Layout Constants
// ============================================================================

/// Child document type holding chunked volume text
pub const ETEXT_CHILD_TYPE: &str = "etext";
/// Nested path of volume text chunks
pub const CHUNKS_PATH: &str = "chunks";
/// Chunk text field searched by the child clause
pub const CHUNK_TEXT_FIELD: &str = "chunks.text_bo";
/// Nested path of work segments (titles, authors)
pub const SEGMENTS_PATH: &str = "segments";
/// Parent field returned with child inner hits
pub const VOLUME_NUMBER_FIELD: &str = "volume_number";

// ============================================================================
// Tuning Constants
// ============================================================================

/// Etext inner hits returned per result
pub const INNER_HITS_SIZE: u32 = 3;
/// One token of slop per this many query tokens
pub const SLOP_STEP: usize = 6;
pub const SLOP_MAX: u32 = 5;
pub const FULL_MATCH_BOOST: f64 = 1.1;
pub const SPLIT_BOOST: f64 = 0.2;
/// Split clauses stop once `clauses >= CLAUSE_BUDGET - CLAUSE_BUDGET_PER_TOKEN * n`
pub const CLAUSE_BUDGET: f64 = 18.0;
pub const CLAUSE_BUDGET_PER_TOKEN: f64 = 0.9;

/// Top-level title fields on instance documents.
pub const TOP_LEVEL_FIELDS: &[(&str, f64)] = &[
    ("prefLabel_bo", 1.0),
    ("prefLabel_bo.tibetan-phonetic", 0.9),
    ("altLabel_bo", 0.95),
    ("altLabel_bo.tibetan-phonetic", 0.85),
];

/// Title and author fields inside nested segments.
pub const SEGMENT_FIELDS: &[(&str, f64)] = &[
    ("segments.title_bo", 0.9),
    ("segments.title_bo.tibetan-phonetic", 0.85),
    ("segments.author_name_bo", 0.7),
    ("segments.author_name_bo.tibetan-phonetic", 0.65),
];

pub const SEGMENT_HIGHLIGHT_FIELDS: &[&str] = &["segments.title_bo", "segments.author_name_bo"];

/// Grammatical particles that never stand alone as the second half of a
/// split phrase.
pub const TWO_PHRASE_STOPS: &[&str] = &[
    "ཏུ", "དུ", "སུ", "གི", "ཀྱི", "གྱི", "གིས", "ཀྱིས", "གྱིས", "ཀྱང", "ཡང", "སྟེ", "དེ", "ཏེ",
    "གོ", "ངོ", "དོ", "ནོ", "བོ", "རོ", "སོ", "འོ", "ཏོ", "པ", "བ", "གིན", "ཀྱིན", "གྱིན", "ཡིན",
    "པས", "པའི", "པའོ", "བས", "བའི", "ལ",
];

// ============================================================================
// Field Catalog
// ============================================================================

/// A searchable field and its boost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedField {
    pub name: String,
    pub weight: f64,
}

impl WeightedField {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }

    /// `"name^weight"`, with the weight always carrying a decimal point.
    pub fn weighted(&self) -> String {
        format!("{}^{:?}", self.name, self.weight)
    }
}

fn from_table(table: &[(&str, f64)]) -> Vec<WeightedField> {
    table
        .iter()
        .map(|(name, weight)| WeightedField::new(*name, *weight))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldCatalog {
    pub top_level: Vec<WeightedField>,
    pub segments: Vec<WeightedField>,
    pub segment_highlight: Vec<String>,
}

impl Default for FieldCatalog {
    fn default() -> Self {
        Self {
            top_level: from_table(TOP_LEVEL_FIELDS),
            segments: from_table(SEGMENT_FIELDS),
            segment_highlight: SEGMENT_HIGHLIGHT_FIELDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FieldCatalog {
    pub fn top_level_weighted(&self) -> Vec<String> {
        self.top_level.iter().map(WeightedField::weighted).collect()
    }

    pub fn top_level_names(&self) -> Vec<String> {
        self.top_level.iter().map(|f| f.name.clone()).collect()
    }

    pub fn segments_weighted(&self) -> Vec<String> {
        self.segments.iter().map(WeightedField::weighted).collect()
    }
}

// ============================================================================
// Synthesis Configuration
// ============================================================================

/// Query synthesis tuning. Defaults reproduce the production index setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub inner_hits_size: u32,
    pub slop_step: usize,
    pub slop_max: u32,
    pub full_match_boost: f64,
    pub split_boost: f64,
    pub clause_budget: f64,
    pub clause_budget_per_token: f64,
    pub stop_particles: Vec<String>,
    pub fields: FieldCatalog,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            inner_hits_size: INNER_HITS_SIZE,
            slop_step: SLOP_STEP,
            slop_max: SLOP_MAX,
            full_match_boost: FULL_MATCH_BOOST,
            split_boost: SPLIT_BOOST,
            clause_budget: CLAUSE_BUDGET,
            clause_budget_per_token: CLAUSE_BUDGET_PER_TOKEN,
            stop_particles: TWO_PHRASE_STOPS.iter().map(|s| s.to_string()).collect(),
            fields: FieldCatalog::default(),
        }
    }
}

impl SynthesisConfig {
    /// Tokens of displacement tolerated in a phrase of `n_tokens` tokens.
    pub fn slop(&self, n_tokens: usize) -> u32 {
        let steps = n_tokens.checked_div(self.slop_step).unwrap_or(0);
        u32::try_from(steps).unwrap_or(u32::MAX).min(self.slop_max)
    }

    /// Whether a split may add another clause when `clauses` are present.
    pub fn under_clause_budget(&self, clauses: usize, n_tokens: usize) -> bool {
        (clauses as f64) < self.clause_budget - n_tokens as f64 * self.clause_budget_per_token
    }

    pub fn is_stop_particle(&self, token: &str) -> bool {
        self.stop_particles.iter().any(|p| p == token)
    }
}

/// `min(n_tokens / 6, 5)`
pub fn slop(n_tokens: usize) -> u32 {
    SynthesisConfig::default().slop(n_tokens)
}
