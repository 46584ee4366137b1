//! Query DSL
//!
//! Typed query clauses for the OpenSearch `_search` body. Only the clause
//! kinds this crate emits are modelled; caller-supplied filters travel as
//! [`Query::Raw`] and are serialized verbatim.

use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ============================================================================
// Query Clauses
// ============================================================================

/// A query clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    MatchAll,
    Term { field: String, value: Value },
    Bool(BoolQuery),
    DisMax(Vec<Query>),
    MultiMatch(MultiMatch),
    MatchPhrase { field: String, query: String },
    Nested(Box<NestedQuery>),
    HasChild(Box<HasChildQuery>),
    /// Opaque clause passed through as given.
    Raw(Value),
}

impl Query {
    pub fn match_all() -> Self {
        Query::MatchAll
    }

    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn raw(value: Value) -> Self {
        Query::Raw(value)
    }

    pub fn match_phrase(field: impl Into<String>, query: impl Into<String>) -> Self {
        Query::MatchPhrase {
            field: field.into(),
            query: query.into(),
        }
    }

    /// `multi_match` of type `phrase`.
    pub fn phrase(query: impl Into<String>, fields: Vec<String>, slop: Option<u32>) -> Self {
        Query::MultiMatch(MultiMatch {
            match_type: MatchType::Phrase,
            query: query.into(),
            fields,
            slop,
        })
    }

    /// `bool { filter: filters }`
    pub fn filter_only(filters: Vec<Query>) -> Self {
        Query::Bool(BoolQuery {
            filter: filters,
            ..Default::default()
        })
    }

    /// `bool { must: [self], filter: filters }`, or `self` when there are no
    /// filters.
    pub fn with_filters(self, filters: Vec<Query>) -> Self {
        if filters.is_empty() {
            return self;
        }
        Query::Bool(BoolQuery {
            must: vec![self],
            filter: filters,
            ..Default::default()
        })
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, Query::MatchAll)
    }
}

impl From<BoolQuery> for Query {
    fn from(b: BoolQuery) -> Self {
        Query::Bool(b)
    }
}

impl From<NestedQuery> for Query {
    fn from(n: NestedQuery) -> Self {
        Query::Nested(Box::new(n))
    }
}

impl From<HasChildQuery> for Query {
    fn from(h: HasChildQuery) -> Self {
        Query::HasChild(Box::new(h))
    }
}

/// Boolean combination. Empty clause lists are omitted from the wire form.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoolQuery {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Query>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<Query>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<Query>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boost: Option<f64>,
}

impl BoolQuery {
    pub fn must(mut self, query: Query) -> Self {
        self.must.push(query);
        self
    }

    pub fn should(mut self, query: Query) -> Self {
        self.should.push(query);
        self
    }

    pub fn filter(mut self, query: Query) -> Self {
        self.filter.push(query);
        self
    }

    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Phrase,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiMatch {
    #[serde(rename = "type")]
    pub match_type: MatchType,
    pub query: String,
    /// `"field^weight"` or bare field names
    pub fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slop: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
    None,
    Max,
    Avg,
    Sum,
    Min,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestedQuery {
    pub path: String,
    pub score_mode: ScoreMode,
    pub query: Query,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_hits: Option<InnerHits>,
}

/// Parent-to-child relation clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HasChildQuery {
    #[serde(rename = "type")]
    pub child_type: String,
    pub score_mode: ScoreMode,
    pub query: Query,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_hits: Option<InnerHits>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InnerHits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Highlight>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SourceFilter {
    Enabled(bool),
    Includes { includes: Vec<String> },
}

// ============================================================================
// Highlighting
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Highlight {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_query: Option<Query>,
    pub fields: IndexMap<String, HighlightField>,
}

impl Highlight {
    pub fn field(mut self, name: impl Into<String>, field: HighlightField) -> Self {
        self.fields.insert(name.into(), field);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HighlightField {
    /// 0 returns the whole field instead of fragments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_fragments: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_query: Option<Query>,
}

// ============================================================================
// Wire Form
// ============================================================================

/// `{ "<key>": <value> }`
struct Keyed<'a, T: ?Sized>(&'a str, &'a T);

impl<T: Serialize + ?Sized> Serialize for Keyed<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.0, self.1)?;
        map.end()
    }
}

#[derive(Serialize)]
struct DisMaxBody<'a> {
    queries: &'a [Query],
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Query::MatchAll => Keyed("match_all", &serde_json::Map::new()).serialize(serializer),
            Query::Term { field, value } => {
                Keyed("term", &Keyed(field, value)).serialize(serializer)
            }
            Query::Bool(b) => Keyed("bool", b).serialize(serializer),
            Query::DisMax(queries) => {
                Keyed("dis_max", &DisMaxBody { queries }).serialize(serializer)
            }
            Query::MultiMatch(m) => Keyed("multi_match", m).serialize(serializer),
            Query::MatchPhrase { field, query } => {
                Keyed("match_phrase", &Keyed(field, query)).serialize(serializer)
            }
            Query::Nested(n) => Keyed("nested", n.as_ref()).serialize(serializer),
            Query::HasChild(h) => Keyed("has_child", h.as_ref()).serialize(serializer),
            Query::Raw(value) => value.serialize(serializer),
        }
    }
}

/// Incoming clauses are not interpreted; they become [`Query::Raw`].
impl<'de> Deserialize<'de> for Query {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Query::Raw)
    }
}
