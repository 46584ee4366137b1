//! Relevance Query Synthesis
//!
//! Turns a raw Tibetan search string into an OpenSearch query body aimed at
//! the instance/etext index layout:
//!
//! ```text
//! bool.must[ dis_max[
//!     full phrase on titles        (boost 1.1, slop)
//!     nested segments phrase       (slop, inner-hit highlights)
//!     has_child etext exact phrase (no score, 3 inner hits)
//!     two-way splits on titles     (boost 0.2, midpoint first)
//! ]]
//! ```
//!
//! A highlight query over every phrase used rides along with it.

use indexmap::IndexSet;
use serde::{Deserialize, Deserializer, Serialize};

use super::config::{
    SynthesisConfig, CHUNKS_PATH, CHUNK_TEXT_FIELD, ETEXT_CHILD_TYPE, SEGMENTS_PATH,
    VOLUME_NUMBER_FIELD,
};
use super::dsl::{
    BoolQuery, HasChildQuery, Highlight, HighlightField, InnerHits, NestedQuery, Query,
    ScoreMode, SourceFilter,
};
use crate::core::preprocess::tsheg;
use crate::core::preprocess::{ProcessedQuery, QueryPipeline};

// ============================================================================
// Input / Output
// ============================================================================

/// Search text plus caller filters.
///
/// Deserializes from `{"query": "...", "filter": [...]}` (`q` is accepted for
/// `query`); filter clauses are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QuerySpec {
    #[serde(rename = "query", alias = "q", default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(rename = "filter", default, deserialize_with = "null_as_default")]
    pub filters: Vec<Query>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl QuerySpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            filters: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: Query) -> Self {
        self.filters.push(filter);
        self
    }
}

impl From<&str> for QuerySpec {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// `_search` body: `{"query": ..., "highlight": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub query: Query,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Highlight>,
}

// ============================================================================
// Synthesizer
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct QuerySynthesizer {
    pipeline: QueryPipeline,
    config: SynthesisConfig,
}

impl QuerySynthesizer {
    pub fn new(pipeline: QueryPipeline, config: SynthesisConfig) -> Self {
        Self { pipeline, config }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &QueryPipeline {
        &self.pipeline
    }

    /// Compile a query. Total over any input.
    pub fn compile(&self, spec: &QuerySpec) -> CompiledQuery {
        let text = spec.text.trim();
        if text.is_empty() {
            return self.without_text(&spec.filters);
        }

        let processed = self.pipeline.process(text);
        if processed.is_empty() {
            log::debug!("Query '{}' is only honorifics", text);
            return self.without_text(&spec.filters);
        }

        let (query, highlight) = self.text_query(&processed);

        CompiledQuery {
            query: query.with_filters(spec.filters.clone()),
            highlight: Some(highlight),
        }
    }

    /// Shorthand for a filterless query.
    pub fn compile_text(&self, text: &str) -> CompiledQuery {
        self.compile(&QuerySpec::new(text))
    }

    fn without_text(&self, filters: &[Query]) -> CompiledQuery {
        if filters.is_empty() {
            return CompiledQuery {
                query: Query::match_all(),
                highlight: None,
            };
        }
        CompiledQuery {
            query: Query::filter_only(filters.to_vec()),
            highlight: Some(self.highlight(&[])),
        }
    }

    fn text_query(&self, processed: &ProcessedQuery) -> (Query, Highlight) {
        let phrase = processed.stripped.as_str();
        let tokens: Vec<&str> = processed.tokens.iter().map(String::as_str).collect();
        let n_tokens = tokens.len();
        let slop = self.config.slop(n_tokens);
        let top_fields = self.config.fields.top_level_weighted();

        let mut phrases: IndexSet<String> = IndexSet::new();
        phrases.insert(phrase.to_string());

        let mut clauses: Vec<Query> = vec![
            BoolQuery::default()
                .must(Query::phrase(phrase, top_fields.clone(), Some(slop)))
                .boost(self.config.full_match_boost)
                .into(),
            self.segments_clause(phrase, slop),
            self.etext_clause(phrase),
        ];

        if n_tokens > 1 {
            for cut in split_points(n_tokens) {
                if !self.config.under_clause_budget(clauses.len(), n_tokens) {
                    break;
                }

                let (head, tail) = tokens.split_at(cut);
                if let [single] = tail {
                    if self.config.is_stop_particle(single) {
                        continue;
                    }
                }

                let halves = [tsheg::join(head), tsheg::join(tail)];
                let must = halves
                    .iter()
                    .map(|half| {
                        Query::from(
                            BoolQuery::default()
                                .should(Query::phrase(half.as_str(), top_fields.clone(), None)),
                        )
                    })
                    .collect();

                clauses.push(
                    BoolQuery {
                        must,
                        boost: Some(self.config.split_boost),
                        ..Default::default()
                    }
                    .into(),
                );
                phrases.extend(halves);
            }
        }

        log::debug!(
            "Synthesized query: {} tokens, slop {}, {} clauses",
            n_tokens,
            slop,
            clauses.len()
        );

        let query: Query = BoolQuery::default().must(Query::DisMax(clauses)).into();
        let phrases: Vec<String> = phrases.into_iter().collect();
        (query, self.highlight(&phrases))
    }

    fn segments_clause(&self, phrase: &str, slop: u32) -> Query {
        let highlight = self
            .config
            .fields
            .segment_highlight
            .iter()
            .fold(Highlight::default(), |h, field| {
                h.field(field.as_str(), HighlightField::default())
            });

        NestedQuery {
            path: SEGMENTS_PATH.to_string(),
            score_mode: ScoreMode::Max,
            query: Query::phrase(phrase, self.config.fields.segments_weighted(), Some(slop)),
            inner_hits: Some(InnerHits {
                highlight: Some(highlight),
                ..Default::default()
            }),
        }
        .into()
    }

    /// Child etext documents containing the phrase exactly. Existence only.
    fn etext_clause(&self, phrase: &str) -> Query {
        let chunk_match = Query::match_phrase(CHUNK_TEXT_FIELD, phrase);
        let chunk_highlight = Highlight::default().field(
            CHUNK_TEXT_FIELD,
            HighlightField {
                highlight_query: Some(chunk_match.clone()),
                ..Default::default()
            },
        );

        let chunks: Query = NestedQuery {
            path: CHUNKS_PATH.to_string(),
            score_mode: ScoreMode::None,
            query: chunk_match,
            inner_hits: Some(InnerHits {
                source: Some(SourceFilter::Enabled(true)),
                highlight: Some(chunk_highlight),
                ..Default::default()
            }),
        }
        .into();

        HasChildQuery {
            child_type: ETEXT_CHILD_TYPE.to_string(),
            score_mode: ScoreMode::None,
            query: chunks,
            inner_hits: Some(InnerHits {
                size: Some(self.config.inner_hits_size),
                source: Some(SourceFilter::Includes {
                    includes: vec![VOLUME_NUMBER_FIELD.to_string()],
                }),
                highlight: None,
            }),
        }
        .into()
    }

    /// Highlight driver over `phrases`, each with its own slop.
    fn highlight(&self, phrases: &[String]) -> Highlight {
        let names = self.config.fields.top_level_names();
        let should: Vec<Query> = phrases
            .iter()
            .map(|p| {
                let slop = self.config.slop(tsheg::tokenize(p).len());
                Query::phrase(p.as_str(), names.clone(), Some(slop))
            })
            .collect();

        let highlight_query = (!should.is_empty()).then(|| {
            Query::from(BoolQuery {
                should,
                ..Default::default()
            })
        });

        Highlight {
            highlight_query,
            ..Default::default()
        }
        .field("*", HighlightField::default())
        .field(
            "*Label*",
            HighlightField {
                number_of_fragments: Some(0),
                ..Default::default()
            },
        )
    }
}

/// Cut positions for two-way splits of `n_tokens` tokens: the midpoint, then
/// alternating outward (`mid-1`, `mid+1`, `mid-2`, ...). Every cut leaves both
/// halves non-empty.
pub fn split_points(n_tokens: usize) -> Vec<usize> {
    let mid = n_tokens / 2;
    if mid == 0 {
        return Vec::new();
    }

    let mut cuts = vec![mid];
    for d in 1..=mid {
        if let Some(left) = mid.checked_sub(d).filter(|&c| c > 0) {
            cuts.push(left);
        }
        if mid + d < n_tokens {
            cuts.push(mid + d);
        }
    }
    cuts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn compile(text: &str) -> Value {
        let compiled = QuerySynthesizer::default().compile_text(text);
        serde_json::to_value(&compiled).unwrap()
    }

    fn dis_max(body: &Value) -> &Vec<Value> {
        body["query"]["bool"]["must"][0]["dis_max"]["queries"]
            .as_array()
            .unwrap()
    }

    #[test]
    fn test_split_points() {
        assert_eq!(split_points(0), Vec::<usize>::new());
        assert_eq!(split_points(1), Vec::<usize>::new());
        assert_eq!(split_points(2), vec![1]);
        assert_eq!(split_points(3), vec![1, 2]);
        assert_eq!(split_points(4), vec![2, 1, 3]);
        assert_eq!(split_points(5), vec![2, 1, 3, 4]);
        assert_eq!(split_points(6), vec![3, 2, 4, 1, 5]);
    }

    #[test]
    fn test_empty_text_matches_all() {
        let body = compile("   ");
        assert_eq!(body, json!({"query": {"match_all": {}}}));
    }

    #[test]
    fn test_empty_text_with_filters() {
        let spec = QuerySpec::new("").with_filter(Query::term("type", "work"));
        let compiled = QuerySynthesizer::default().compile(&spec);
        let body = serde_json::to_value(&compiled).unwrap();

        assert_eq!(body["query"], json!({"bool": {"filter": [{"term": {"type": "work"}}]}}));
        assert!(body["highlight"].get("highlight_query").is_none());
        assert_eq!(body["highlight"]["fields"]["*Label*"]["number_of_fragments"], 0);
    }

    #[test]
    fn test_honorific_only_behaves_as_empty() {
        assert_eq!(compile("བླ་མ་"), json!({"query": {"match_all": {}}}));
    }

    #[test]
    fn test_catalog_identifier_keeps_title() {
        let body = compile("tbrc-བཀའ་འགྱུར");
        let first = &dis_max(&body)[0]["bool"];
        assert_eq!(first["must"][0]["multi_match"]["query"], "བཀའ་འགྱུར");
    }

    #[test]
    fn test_single_token_has_three_clauses() {
        let body = compile("བཀའ");
        let clauses = dis_max(&body);
        assert_eq!(clauses.len(), 3);
    }

    #[test]
    fn test_full_phrase_clause() {
        let body = compile("བཀའ་འགྱུར");
        let first = &dis_max(&body)[0]["bool"];
        assert_eq!(first["boost"], 1.1);
        assert_eq!(first["must"][0]["multi_match"]["query"], "བཀའ་འགྱུར");
        assert_eq!(first["must"][0]["multi_match"]["slop"], 0);
        assert_eq!(first["must"][0]["multi_match"]["fields"][0], "prefLabel_bo^1.0");
    }

    #[test]
    fn test_segments_clause() {
        let body = compile("བཀའ་འགྱུར");
        let nested = &dis_max(&body)[1]["nested"];
        assert_eq!(nested["path"], "segments");
        assert_eq!(nested["score_mode"], "max");
        assert_eq!(
            nested["query"]["multi_match"]["fields"][0],
            "segments.title_bo^0.9"
        );
        assert_eq!(
            nested["inner_hits"]["highlight"]["fields"],
            json!({"segments.title_bo": {}, "segments.author_name_bo": {}})
        );
    }

    #[test]
    fn test_etext_clause() {
        let body = compile("བཀའ་འགྱུར");
        let child = &dis_max(&body)[2]["has_child"];
        assert_eq!(child["type"], "etext");
        assert_eq!(child["score_mode"], "none");
        assert_eq!(child["inner_hits"]["size"], 3);
        assert_eq!(child["inner_hits"]["_source"]["includes"], json!(["volume_number"]));

        let nested = &child["query"]["nested"];
        assert_eq!(nested["path"], "chunks");
        assert_eq!(
            nested["query"],
            json!({"match_phrase": {"chunks.text_bo": "བཀའ་འགྱུར"}})
        );
        assert_eq!(nested["inner_hits"]["_source"], true);
        assert_eq!(
            nested["inner_hits"]["highlight"]["fields"]["chunks.text_bo"]["highlight_query"],
            nested["query"]
        );
    }

    #[test]
    fn test_split_clause() {
        let body = compile("བཀའ་འགྱུར");
        let clauses = dis_max(&body);
        assert_eq!(clauses.len(), 4);

        let split = &clauses[3]["bool"];
        assert_eq!(split["boost"], 0.2);
        assert_eq!(split["must"][0]["bool"]["should"][0]["multi_match"]["query"], "བཀའ");
        assert_eq!(split["must"][1]["bool"]["should"][0]["multi_match"]["query"], "འགྱུར");
        assert!(split["must"][0]["bool"]["should"][0]["multi_match"]
            .get("slop")
            .is_none());
    }

    #[test]
    fn test_stop_particle_second_half_skipped() {
        // cuts [1, 2]; cut 2 leaves the lone particle ཀྱི
        let body = compile("ཆོས་འབྱུང་ཀྱི");
        let clauses = dis_max(&body);
        assert_eq!(clauses.len(), 4);
        assert_eq!(
            clauses[3]["bool"]["must"][1]["bool"]["should"][0]["multi_match"]["query"],
            "འབྱུང་ཀྱི"
        );
    }

    #[test]
    fn test_clause_budget_caps_splits() {
        let text = ["ཀ", "ཁ", "ག", "ང", "ཅ", "ཆ", "ཇ", "ཉ", "ཏ", "ཐ"].join("་");
        let body = compile(&text);
        // budget 18 - 9 = 9 clauses
        assert_eq!(dis_max(&body).len(), 9);
        assert_eq!(dis_max(&body)[0]["bool"]["must"][0]["multi_match"]["slop"], 1);
    }

    #[test]
    fn test_long_query_has_no_splits() {
        let tokens: Vec<&str> = std::iter::repeat("ཀ").take(20).collect();
        let body = compile(&tokens.join("་"));
        assert_eq!(dis_max(&body).len(), 3);
    }

    #[test]
    fn test_highlight_phrases() {
        let body = compile("བཀའ་འགྱུར");
        let should = body["highlight"]["highlight_query"]["bool"]["should"]
            .as_array()
            .unwrap();
        let phrases: Vec<&str> = should
            .iter()
            .map(|q| q["multi_match"]["query"].as_str().unwrap())
            .collect();
        assert_eq!(phrases, vec!["བཀའ་འགྱུར", "བཀའ", "འགྱུར"]);
        assert_eq!(
            should[0]["multi_match"]["fields"],
            json!([
                "prefLabel_bo",
                "prefLabel_bo.tibetan-phonetic",
                "altLabel_bo",
                "altLabel_bo.tibetan-phonetic"
            ])
        );
        assert_eq!(
            body["highlight"]["fields"],
            json!({"*": {}, "*Label*": {"number_of_fragments": 0}})
        );
    }

    #[test]
    fn test_highlight_phrases_deduplicated() {
        // both halves are the same syllable
        let body = compile("ཀ་ཀ");
        let should = body["highlight"]["highlight_query"]["bool"]["should"]
            .as_array()
            .unwrap();
        assert_eq!(should.len(), 2);
    }

    #[test]
    fn test_filters_wrap_query() {
        let spec = QuerySpec::new("བཀའ་འགྱུར").with_filter(Query::term("type", "work"));
        let compiled = QuerySynthesizer::default().compile(&spec);
        let body = serde_json::to_value(&compiled).unwrap();

        assert_eq!(body["query"]["bool"]["filter"], json!([{"term": {"type": "work"}}]));
        assert!(body["query"]["bool"]["must"][0]["bool"]["must"][0]["dis_max"].is_object());
    }

    #[test]
    fn test_honorific_is_stripped_before_synthesis() {
        let body = compile("བླ་མ་མི་ལ་རས་པ");
        assert_eq!(
            dis_max(&body)[0]["bool"]["must"][0]["multi_match"]["query"],
            "མི་ལ་རས་པ"
        );
    }

    #[test]
    fn test_spec_from_request_json() {
        let spec: QuerySpec = serde_json::from_value(json!({
            "q": "བཀའ་འགྱུར",
            "filter": [{"term": {"type": "work"}}]
        }))
        .unwrap();
        assert_eq!(spec.text, "བཀའ་འགྱུར");
        assert_eq!(spec.filters, vec![Query::Raw(json!({"term": {"type": "work"}}))]);

        let spec: QuerySpec = serde_json::from_value(json!({"query": null, "filter": null})).unwrap();
        assert_eq!(spec, QuerySpec::default());
    }
}
