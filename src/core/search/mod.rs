//! Corpus Search
//!
//! - `dsl`: typed OpenSearch query clauses
//! - `query_builder`: relevance query synthesis from a Tibetan search string
//! - `requests` / `catalog`: work, person and volume operations
//! - `client`: document store trait and its OpenSearch implementation

pub mod catalog;
pub mod client;
pub mod config;
pub mod dsl;
pub mod error;
pub mod models;
pub mod query_builder;
pub mod requests;

pub use catalog::{CatalogService, VolumeFilter};
pub use client::{DocumentStore, OpenSearchClient, SearchParams, SearchResponse};
pub use config::{slop, FieldCatalog, SynthesisConfig};
pub use dsl::{BoolQuery, Highlight, Query};
pub use error::{Result, SearchError};
pub use query_builder::{CompiledQuery, QuerySpec, QuerySynthesizer};
