//! Crate-level tests
//!
//! - `mocks`: in-memory document store and fixtures
//! - `import_pipeline`: OCR import against mocked collaborators
//! - `catalog_service`: catalog operations against the in-memory store
//! - `property`: proptest invariants of the pure core

mod mocks;
mod property;
