/// Tibetan Corpus - search core for a Tibetan etext corpus
///
/// Query normalization and relevance query synthesis for an OpenSearch
/// index, plus chunking and import of OCR volumes.

pub mod config;
pub mod core;
pub mod ingestion;

#[cfg(test)]
mod tests;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
