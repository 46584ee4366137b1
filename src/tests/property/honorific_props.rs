//! Property-based tests for honorific stripping

use proptest::prelude::*;

use super::tibetan_phrase;
use crate::core::preprocess::HonorificNormalizer;

proptest! {
    #[test]
    fn prop_strip_is_idempotent(phrase in tibetan_phrase(12)) {
        let normalizer = HonorificNormalizer::default();
        let once = normalizer.strip(&phrase);
        prop_assert_eq!(normalizer.strip(&once), once);
    }

    #[test]
    fn prop_strip_is_idempotent_on_any_text(text in "\\PC{0,40}") {
        let normalizer = HonorificNormalizer::default();
        let once = normalizer.strip(&text);
        prop_assert_eq!(normalizer.strip(&once), once);
    }

    #[test]
    fn prop_strip_never_lengthens(phrase in tibetan_phrase(12)) {
        let stripped = HonorificNormalizer::default().strip(&phrase);
        prop_assert!(stripped.len() <= phrase.len());
        prop_assert_eq!(stripped.trim(), stripped.as_str());
    }
}
