//! In-memory collaborators for testing
//!
//! `MemoryStore` stands in for the OpenSearch index; the OCR, manifest and
//! metadata sources are generated with mockall next to their traits.

#![allow(dead_code)]

use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use indexmap::IndexMap;
use serde_json::{json, Value};

use crate::core::search::error::{Result, SearchError};
use crate::core::search::{DocumentStore, SearchParams, SearchResponse};

// ============================================================================
// Document Store
// ============================================================================

/// Document store keeping sources in insertion order.
///
/// `search` records the request and answers with the canned response set
/// through [`MemoryStore::respond_with`].
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<IndexMap<String, Value>>,
    response: Mutex<SearchResponse>,
    searches: Mutex<Vec<(Value, SearchParams)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, id: &str, source: Value) -> Self {
        self.docs.lock().unwrap().insert(id.to_string(), source);
        self
    }

    /// Answer every search with these hits (`(id, source)`) and aggregations.
    pub fn respond_with(&self, hits: Vec<(&str, Value)>, aggregations: Option<Value>) {
        let hits: Vec<Value> = hits
            .into_iter()
            .map(|(id, source)| json!({"_id": id, "_source": source}))
            .collect();
        let response = json!({
            "hits": {"total": {"value": hits.len()}, "hits": hits},
            "aggregations": aggregations,
        });
        *self.response.lock().unwrap() = serde_json::from_value(response).unwrap();
    }

    pub fn document(&self, id: &str) -> Option<Value> {
        self.docs.lock().unwrap().get(id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        self.docs.lock().unwrap().keys().cloned().collect()
    }

    pub fn searches(&self) -> Vec<(Value, SearchParams)> {
        self.searches.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn index(&self, id: &str, body: &Value) -> Result<()> {
        self.docs.lock().unwrap().insert(id.to_string(), body.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Value>> {
        Ok(self.document(id))
    }

    async fn update(&self, id: &str, partial: &Value) -> Result<()> {
        let mut docs = self.docs.lock().unwrap();
        let Some(Value::Object(target)) = docs.get_mut(id) else {
            return Err(SearchError::DocumentNotFound(id.to_string()));
        };
        if let Value::Object(changes) = partial {
            target.extend(changes.clone());
        }
        Ok(())
    }

    async fn search(&self, body: &Value, params: &SearchParams) -> Result<SearchResponse> {
        self.searches
            .lock()
            .unwrap()
            .push((body.clone(), params.clone()));
        Ok(self.response.lock().unwrap().clone())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Gzip-compressed dimensions manifest listing `files` in order.
pub fn dimensions_manifest(files: &[&str]) -> Vec<u8> {
    let entries: Vec<Value> = files
        .iter()
        .map(|f| json!({"filename": f, "width": 2650, "height": 1731}))
        .collect();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(serde_json::to_string(&entries).unwrap().as_bytes())
        .unwrap();
    encoder.finish().unwrap()
}
