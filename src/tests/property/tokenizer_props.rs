//! Property-based tests for tsheg tokenization

use proptest::prelude::*;

use crate::core::preprocess::tsheg::{is_separator, join, tokenize};

/// Text over letters, tsheg-class separators and whitespace.
fn mixed_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec!['ཀ', 'ག', 'ི', 'ུ', '་', '༌', '༔', ' ', '\n', '།', 'a']),
        0..60,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    #[test]
    fn prop_tokens_are_clean(text in mixed_text()) {
        for token in tokenize(&text) {
            prop_assert!(!token.is_empty());
            prop_assert!(!token.chars().any(is_separator));
        }
    }

    #[test]
    fn prop_join_then_tokenize_is_stable(text in mixed_text()) {
        let tokens = tokenize(&text);
        let joined = join(&tokens);
        prop_assert_eq!(tokenize(&joined), tokens);
    }

    #[test]
    fn prop_tokens_keep_every_letter(text in mixed_text()) {
        let letters: String = text.chars().filter(|c| !is_separator(*c)).collect();
        prop_assert_eq!(tokenize(&text).concat(), letters);
    }
}
