//! Catalog Request Bodies
//!
//! `_search` bodies for the catalog operations. Pure functions; the catalog
//! service sends them through a [`DocumentStore`](super::client::DocumentStore).

use serde_json::{json, Value};

use super::dsl::Query;
use super::models::{DocumentType, VolumeStatus};
use super::query_builder::{QuerySpec, QuerySynthesizer};

/// Heavy volume fields left out of listings
pub const LISTING_EXCLUDES: &[&str] = &["chunks", "pages", "segments"];
/// Upper bound on versions considered when picking a volume
pub const MAX_VOLUME_VERSIONS: u32 = 100;

fn type_filter(doc_type: DocumentType) -> Query {
    Query::term("type", doc_type.as_str())
}

fn to_body<T: serde::Serialize>(value: &T) -> Value {
    // Query trees only hold strings, numbers and maps.
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Volume listing filtered by status, OCR source and work.
pub fn list_volumes_body(
    status: Option<VolumeStatus>,
    etext_source: Option<&str>,
    w_id: Option<&str>,
) -> Value {
    let mut filters = vec![type_filter(DocumentType::VolumeEtext)];
    if let Some(status) = status {
        filters.push(Query::term("status", status.as_str()));
    }
    if let Some(source) = etext_source {
        filters.push(Query::term("etext_source", source));
    }
    if let Some(w_id) = w_id {
        filters.push(Query::term("w_id", w_id));
    }

    json!({ "query": to_body(&Query::filter_only(filters)) })
}

/// All versions of one image group, most recently updated first.
pub fn volume_versions_body(w_id: &str, i_id: &str) -> Value {
    let filters = vec![
        type_filter(DocumentType::VolumeEtext),
        Query::term("w_id", w_id),
        Query::term("i_id", i_id),
    ];

    json!({
        "query": to_body(&Query::filter_only(filters)),
        "sort": [{"last_updated_at": {"order": "desc"}}],
    })
}

/// Pick the volume to show among versions sorted newest first: the newest
/// one that has segments, else the newest.
pub fn select_best_volume(hits: &[Value]) -> Option<&Value> {
    let has_segments = |hit: &&Value| {
        hit.get("segments")
            .and_then(Value::as_array)
            .is_some_and(|s| !s.is_empty())
    };
    hits.iter().find(has_segments).or_else(|| hits.first())
}

/// Work search by title and/or author name.
pub fn search_works_body(
    synthesizer: &QuerySynthesizer,
    title: Option<&str>,
    author_name: Option<&str>,
) -> Value {
    let text = [title, author_name]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() {
        return json!({ "query": to_body(&Query::filter_only(vec![type_filter(DocumentType::Work)])) });
    }

    let spec = QuerySpec::new(text).with_filter(type_filter(DocumentType::Work));
    to_body(&synthesizer.compile(&spec))
}

pub fn search_persons_body(synthesizer: &QuerySynthesizer, author_name: &str) -> Value {
    let spec = QuerySpec::new(author_name).with_filter(type_filter(DocumentType::Person));
    to_body(&synthesizer.compile(&spec))
}

/// Document counts by type, by status within each type, and nested segment
/// counts.
pub fn stats_body() -> Value {
    json!({
        "size": 0,
        "aggs": {
            "by_type": {
                "terms": {"field": "type", "size": 10},
                "aggs": {
                    "by_status": {
                        "terms": {"field": "status", "size": 10}
                    },
                    "total_segments": {
                        "nested": {"path": "segments"},
                        "aggs": {
                            "count": {"value_count": {"field": "segments.cstart"}}
                        }
                    }
                }
            }
        }
    })
}
