//! Query Pipeline
//!
//! Orchestrates query preprocessing ahead of query synthesis:
//! 1. Normalize input (trim)
//! 2. Strip honorific prefixes and suffixes
//! 3. Split into syllable tokens

use std::sync::Arc;

use super::honorifics::{HonorificCatalog, HonorificNormalizer};
use super::tsheg;

/// Complete query preprocessing pipeline.
#[derive(Debug, Clone, Default)]
pub struct QueryPipeline {
    normalizer: HonorificNormalizer,
}

/// Result of preprocessing a raw query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedQuery {
    /// Original user input
    pub original: String,
    /// Trimmed input
    pub normalized: String,
    /// Text after honorific removal; this is what gets searched
    pub stripped: String,
    /// Syllables of `stripped`
    pub tokens: Vec<String>,
}

impl QueryPipeline {
    pub fn new(normalizer: HonorificNormalizer) -> Self {
        Self { normalizer }
    }

    /// Pipeline over an explicit catalog.
    pub fn with_catalog(catalog: Arc<HonorificCatalog>) -> Self {
        Self::new(HonorificNormalizer::new(catalog))
    }

    /// Process a raw user query.
    pub fn process(&self, raw_query: &str) -> ProcessedQuery {
        let normalized = raw_query.trim().to_string();
        let stripped = if normalized.is_empty() {
            String::new()
        } else {
            self.normalizer.strip(&normalized)
        };

        if stripped != normalized {
            log::debug!("Stripped honorifics: '{}' -> '{}'", normalized, stripped);
        }

        let tokens = tsheg::tokenize(&stripped)
            .into_iter()
            .map(str::to_string)
            .collect();

        ProcessedQuery {
            original: raw_query.to_string(),
            normalized,
            stripped,
            tokens,
        }
    }

    pub fn normalizer(&self) -> &HonorificNormalizer {
        &self.normalizer
    }
}

impl ProcessedQuery {
    /// True when nothing searchable is left.
    pub fn is_empty(&self) -> bool {
        self.stripped.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn has_honorifics(&self) -> bool {
        self.stripped != self.normalized
    }
}
