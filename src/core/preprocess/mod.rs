//! Query Preprocessing
//!
//! Prepares a raw Tibetan query for query synthesis:
//! - Syllable tokenization on tsheg separators
//! - Honorific prefix/suffix removal from a compiled catalog
//! - EWTS transliteration used to build that catalog

pub mod error;
pub mod ewts;
pub mod honorifics;
pub mod pipeline;
pub mod tsheg;

pub use error::{PreprocessError, PreprocessResult};
pub use ewts::{Ewts, Transliterator};
pub use honorifics::{CatalogEntry, HonorificCatalog, HonorificNormalizer};
pub use pipeline::{ProcessedQuery, QueryPipeline};
pub use tsheg::{tokenize, TSHEG, TSHEG_CHARS};
