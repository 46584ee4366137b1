//! Catalog Service
//!
//! Work, person and volume operations over a [`DocumentStore`].

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};

use super::client::{DocumentStore, SearchParams};
use super::error::{Result, SearchError};
use super::models::{
    generate_id, volume_doc_id, CorpusStats, DocumentType, JoinField, Paginated, Person,
    PersonOutput, VolumeInput, VolumeOutput, VolumeStatus, Work, WorkOutput, ID_LENGTH,
};
use super::query_builder::QuerySynthesizer;
use super::requests::{
    list_volumes_body, search_persons_body, search_works_body, select_best_volume, stats_body,
    volume_versions_body, LISTING_EXCLUDES, MAX_VOLUME_VERSIONS,
};

/// Default page size for listings and searches
pub const DEFAULT_LIMIT: u32 = 50;
pub const DEFAULT_SEARCH_SIZE: u32 = 20;

/// Filters for [`CatalogService::list_volumes`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeFilter {
    pub status: Option<VolumeStatus>,
    pub etext_source: Option<String>,
    pub w_id: Option<String>,
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn DocumentStore>,
    synthesizer: Arc<QuerySynthesizer>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn DocumentStore>, synthesizer: Arc<QuerySynthesizer>) -> Self {
        Self { store, synthesizer }
    }

    pub fn synthesizer(&self) -> &QuerySynthesizer {
        &self.synthesizer
    }

    // ========================================================================
    // Volumes
    // ========================================================================

    pub async fn list_volumes(
        &self,
        filter: &VolumeFilter,
        offset: u32,
        limit: u32,
    ) -> Result<Paginated<VolumeOutput>> {
        let body = list_volumes_body(
            filter.status,
            filter.etext_source.as_deref(),
            filter.w_id.as_deref(),
        );
        let params = SearchParams::page(limit, offset).excluding(LISTING_EXCLUDES);
        let response = self.store.search(&body, &params).await?;

        Ok(Paginated {
            total: response.total(),
            offset,
            limit,
            items: response.parse_documents()?,
        })
    }

    /// The preferred version of a volume: newest with segments, else newest.
    pub async fn get_volume(&self, w_id: &str, i_id: &str) -> Result<Option<VolumeOutput>> {
        let body = volume_versions_body(w_id, i_id);
        let response = self
            .store
            .search(&body, &SearchParams::size(MAX_VOLUME_VERSIONS))
            .await?;
        let hits = response.documents();

        let Some(chosen) = select_best_volume(&hits) else {
            return Ok(None);
        };

        let mut chosen = chosen.clone();
        if let Value::Object(map) = &mut chosen {
            map.insert("w_id".into(), w_id.into());
            map.insert("i_id".into(), i_id.into());
        }
        Ok(Some(serde_json::from_value(chosen)?))
    }

    pub async fn create_volume(
        &self,
        w_id: &str,
        i_id: &str,
        input: &VolumeInput,
    ) -> Result<VolumeOutput> {
        let (i_version, etext_source) = Self::version_key(input, "create")?;
        let doc_id = volume_doc_id(w_id, i_id, i_version, etext_source);
        let now = Utc::now();

        let mut body = serde_json::to_value(input)?;
        if let Value::Object(map) = &mut body {
            map.insert("type".into(), DocumentType::VolumeEtext.as_str().into());
            map.insert("w_id".into(), w_id.into());
            map.insert("i_id".into(), i_id.into());
            map.insert("first_imported_at".into(), json!(now));
            map.insert("last_updated_at".into(), json!(now));
            map.insert("join_field".into(), serde_json::to_value(JoinField::instance())?);
        }

        self.store.index(&doc_id, &body).await?;
        log::info!("Created volume {}", doc_id);

        with_id(body, &doc_id)
    }

    /// Partial update of an existing volume; only fields set on `input` change.
    pub async fn update_volume(
        &self,
        w_id: &str,
        i_id: &str,
        input: &VolumeInput,
    ) -> Result<VolumeOutput> {
        let (i_version, etext_source) = Self::version_key(input, "update")?;
        let doc_id = volume_doc_id(w_id, i_id, i_version, etext_source);

        let Some(mut existing) = self.store.get(&doc_id).await? else {
            return Err(SearchError::DocumentNotFound(doc_id));
        };

        let mut partial = serde_json::to_value(input)?;
        if let Value::Object(map) = &mut partial {
            map.insert("last_updated_at".into(), json!(Utc::now()));
        }
        self.store.update(&doc_id, &partial).await?;

        if let (Value::Object(target), Value::Object(changes)) = (&mut existing, partial) {
            target.extend(changes);
        }
        with_id(existing, &doc_id)
    }

    fn version_key<'a>(input: &'a VolumeInput, action: &str) -> Result<(&'a str, &'a str)> {
        match (input.i_version.as_deref(), input.etext_source.as_deref()) {
            (Some(v), Some(s)) if !v.is_empty() && !s.is_empty() => Ok((v, s)),
            _ => Err(SearchError::InvalidRequest(format!(
                "i_version and etext_source are required to {action} a volume"
            ))),
        }
    }

    // ========================================================================
    // Works
    // ========================================================================

    pub async fn create_work(&self, work: &Work) -> Result<WorkOutput> {
        let id = generate_id("W", ID_LENGTH);
        let body = typed_body(work, DocumentType::Work)?;
        self.store.index(&id, &body).await?;
        log::info!("Created work {}", id);
        with_id(body, &id)
    }

    pub async fn get_work(&self, id: &str) -> Result<Option<WorkOutput>> {
        self.get_typed(id).await
    }

    pub async fn update_work(&self, id: &str, partial: &Value) -> Result<()> {
        self.store.update(id, partial).await
    }

    pub async fn search_works(
        &self,
        title: Option<&str>,
        author_name: Option<&str>,
        size: u32,
    ) -> Result<Vec<WorkOutput>> {
        let body = search_works_body(&self.synthesizer, title, author_name);
        let response = self.store.search(&body, &SearchParams::size(size)).await?;
        response.parse_documents()
    }

    // ========================================================================
    // Persons
    // ========================================================================

    pub async fn create_person(&self, person: &Person) -> Result<PersonOutput> {
        let id = generate_id("P", ID_LENGTH);
        let body = typed_body(person, DocumentType::Person)?;
        self.store.index(&id, &body).await?;
        log::info!("Created person {}", id);
        with_id(body, &id)
    }

    pub async fn get_person(&self, id: &str) -> Result<Option<PersonOutput>> {
        self.get_typed(id).await
    }

    pub async fn update_person(&self, id: &str, partial: &Value) -> Result<()> {
        self.store.update(id, partial).await
    }

    pub async fn search_persons(&self, author_name: &str, size: u32) -> Result<Vec<PersonOutput>> {
        let body = search_persons_body(&self.synthesizer, author_name);
        let response = self.store.search(&body, &SearchParams::size(size)).await?;
        response.parse_documents()
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub async fn stats(&self) -> Result<CorpusStats> {
        let response = self.store.search(&stats_body(), &SearchParams::size(0)).await?;
        Ok(response
            .aggregations
            .as_ref()
            .map(parse_stats)
            .unwrap_or_default())
    }

    async fn get_typed<T: serde::de::DeserializeOwned>(&self, id: &str) -> Result<Option<T>> {
        match self.store.get(id).await? {
            Some(source) => Ok(Some(with_id(source, id)?)),
            None => Ok(None),
        }
    }
}

fn typed_body<T: serde::Serialize>(value: &T, doc_type: DocumentType) -> Result<Value> {
    let mut body = serde_json::to_value(value)?;
    if let Value::Object(map) = &mut body {
        map.insert("type".into(), doc_type.as_str().into());
    }
    Ok(body)
}

fn with_id<T: serde::de::DeserializeOwned>(mut source: Value, id: &str) -> Result<T> {
    if let Value::Object(map) = &mut source {
        map.insert("id".into(), id.into());
    }
    Ok(serde_json::from_value(source)?)
}

/// Read the `stats_body` aggregation tree.
fn parse_stats(aggregations: &Value) -> CorpusStats {
    let mut stats = CorpusStats::default();
    let buckets = aggregations["by_type"]["buckets"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default();

    for bucket in buckets {
        let count = bucket["doc_count"].as_u64().unwrap_or(0);
        match bucket["key"].as_str() {
            Some("volume_etext") => {
                stats.nb_volumes = count;
                stats.nb_segments_total = bucket["total_segments"]["count"]["value"]
                    .as_u64()
                    .unwrap_or(0);
                for status in bucket["by_status"]["buckets"]
                    .as_array()
                    .map(Vec::as_slice)
                    .unwrap_or_default()
                {
                    if let Some(key) = status["key"].as_str() {
                        stats
                            .nb_volumes_by_status
                            .insert(key.to_string(), status["doc_count"].as_u64().unwrap_or(0));
                    }
                }
            }
            Some("work") => stats.nb_works_total = count,
            Some("person") => stats.nb_persons_total = count,
            _ => {}
        }
    }
    stats
}
