//! Search Client
//!
//! Document store abstraction over the corpus index and its OpenSearch
//! implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use super::error::{Result, SearchError};
use crate::config::OpenSearchConfig;

/// Request timeout for index operations
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Search Response
// ============================================================================

/// Paging and source filtering for `_search`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pub size: Option<u32>,
    pub from: Option<u32>,
    pub source_excludes: Vec<String>,
}

impl SearchParams {
    pub fn page(size: u32, from: u32) -> Self {
        Self {
            size: Some(size),
            from: Some(from),
            ..Default::default()
        }
    }

    pub fn size(size: u32) -> Self {
        Self {
            size: Some(size),
            ..Default::default()
        }
    }

    pub fn excluding(mut self, fields: &[&str]) -> Self {
        self.source_excludes = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(size) = self.size {
            query.push(("size", size.to_string()));
        }
        if let Some(from) = self.from {
            query.push(("from", from.to_string()));
        }
        if !self.source_excludes.is_empty() {
            query.push(("_source_excludes", self.source_excludes.join(",")));
        }
        query
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Hits,
    #[serde(default)]
    pub aggregations: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Hits {
    #[serde(default)]
    pub total: Option<TotalHits>,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TotalHits {
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source", default)]
    pub source: Value,
}

impl SearchResponse {
    pub fn total(&self) -> u64 {
        self.hits
            .total
            .as_ref()
            .map(|t| t.value)
            .unwrap_or(self.hits.hits.len() as u64)
    }

    /// Hit sources with the document id merged in as `id`.
    pub fn documents(&self) -> Vec<Value> {
        self.hits
            .hits
            .iter()
            .map(|hit| {
                let mut doc = match &hit.source {
                    Value::Object(map) => map.clone(),
                    _ => serde_json::Map::new(),
                };
                doc.insert("id".to_string(), Value::String(hit.id.clone()));
                Value::Object(doc)
            })
            .collect()
    }

    pub fn parse_documents<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.documents()
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(SearchError::from))
            .collect()
    }
}

// ============================================================================
// Document Store
// ============================================================================

/// The index operations the catalog and importer rely on.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create or replace a document, visible to search on return.
    async fn index(&self, id: &str, body: &Value) -> Result<()>;

    /// Fetch a document's source; `None` when it does not exist.
    async fn get(&self, id: &str) -> Result<Option<Value>>;

    /// Merge `partial` into an existing document.
    async fn update(&self, id: &str, partial: &Value) -> Result<()>;

    async fn search(&self, body: &Value, params: &SearchParams) -> Result<SearchResponse>;
}

// ============================================================================
// OpenSearch Client
// ============================================================================

/// HTTP client for a single OpenSearch index.
#[derive(Debug, Clone)]
pub struct OpenSearchClient {
    http: Client,
    base_url: Url,
    index: String,
    credentials: Option<(String, String)>,
}

impl OpenSearchClient {
    pub fn new(config: &OpenSearchConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .danger_accept_invalid_certs(!config.verify_certs)
            .build()?;

        let mut client = Self::with_http(http, &config.base_url(), &config.index)?;
        if let (Some(user), Some(password)) = (&config.user, &config.password) {
            client.credentials = Some((user.clone(), password.clone()));
        }

        log::info!(
            "OpenSearch client for index '{}' at {}",
            client.index,
            client.base_url
        );
        Ok(client)
    }

    /// Client against an explicit base URL, without credentials.
    pub fn with_base_url(base_url: &str, index: &str) -> Result<Self> {
        Self::with_http(Client::new(), base_url, index)
    }

    fn with_http(http: Client, base_url: &str, index: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SearchError::ConfigError(format!("Invalid OpenSearch URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(SearchError::ConfigError(format!(
                "OpenSearch URL '{base_url}' cannot carry a path"
            )));
        }
        Ok(Self {
            http,
            base_url,
            index: index.to_string(),
            credentials: None,
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    /// `{base}/{index}/{segments...}` with each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(&self.index).extend(segments);
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some((user, password)) => request.basic_auth(user, Some(password)),
            None => request,
        }
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        log::warn!("OpenSearch request failed with {}: {}", status, body);
        Err(SearchError::Engine {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl DocumentStore for OpenSearchClient {
    async fn index(&self, id: &str, body: &Value) -> Result<()> {
        let response = self
            .authorized(self.http.put(self.url(&["_doc", id])))
            .query(&[("refresh", "true")])
            .json(body)
            .send()
            .await?;
        Self::check(response).await?;

        log::debug!("Indexed document '{}' into '{}'", id, self.index);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Value>> {
        let response = self
            .authorized(self.http.get(self.url(&["_doc", id])))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let mut body: Value = Self::check(response).await?.json().await?;
        if body.get("found") == Some(&Value::Bool(false)) {
            return Ok(None);
        }
        Ok(body.get_mut("_source").map(Value::take))
    }

    async fn update(&self, id: &str, partial: &Value) -> Result<()> {
        let response = self
            .authorized(self.http.post(self.url(&["_update", id])))
            .query(&[("refresh", "true")])
            .json(&json!({ "doc": partial }))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SearchError::DocumentNotFound(id.to_string()));
        }
        Self::check(response).await?;

        log::debug!("Updated document '{}' in '{}'", id, self.index);
        Ok(())
    }

    async fn search(&self, body: &Value, params: &SearchParams) -> Result<SearchResponse> {
        let response = self
            .authorized(self.http.post(self.url(&["_search"])))
            .query(&params.to_query())
            .json(body)
            .send()
            .await?;

        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }
}
