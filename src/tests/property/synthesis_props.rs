//! Property-based tests for relevance query synthesis

use proptest::prelude::*;

use super::tibetan_phrase;
use crate::core::search::{Query, QuerySynthesizer};

/// Alternatives under the top-level `dis_max`, if the query has text.
fn alternatives(query: &Query) -> Option<&[Query]> {
    match query {
        Query::Bool(b) => match b.must.first() {
            Some(Query::DisMax(clauses)) => Some(clauses),
            _ => None,
        },
        _ => None,
    }
}

proptest! {
    #[test]
    fn prop_compile_is_deterministic(phrase in tibetan_phrase(20)) {
        let synthesizer = QuerySynthesizer::default();
        let first = serde_json::to_value(synthesizer.compile_text(&phrase)).unwrap();
        let second = serde_json::to_value(synthesizer.compile_text(&phrase)).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_clause_budget_holds(phrase in tibetan_phrase(30)) {
        let synthesizer = QuerySynthesizer::default();
        let n_tokens = synthesizer.pipeline().process(&phrase).token_count();
        let compiled = synthesizer.compile_text(&phrase);

        match alternatives(&compiled.query) {
            Some(clauses) => {
                let splits = clauses.len() - 3;
                prop_assert!(clauses.len() >= 3);
                prop_assert!(splits <= n_tokens.saturating_sub(1));
                if splits > 0 {
                    // the last split was added while under budget
                    prop_assert!(((clauses.len() - 1) as f64) < 18.0 - 0.9 * n_tokens as f64);
                }
            }
            None => {
                prop_assert_eq!(n_tokens, 0);
                prop_assert!(compiled.query.is_match_all());
            }
        }
    }
}
