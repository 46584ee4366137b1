//! Property-based tests for chunk segmentation

use proptest::prelude::*;

use crate::ingestion::ChunkSegmenter;

/// Volume-like text: syllables, shads, tshegs, spaces and newlines.
fn volume_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec!["ཀ", "ག", "གོ", "ས", "་", "།", "།།", " ", "\n", "༄༅"]),
        0..400,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn prop_chunks_rebuild_text(text in volume_text(), size in 1usize..120) {
        let chunks = ChunkSegmenter::new(size).segment(&text);
        let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
        prop_assert_eq!(rebuilt, text);
    }

    #[test]
    fn prop_chunks_are_contiguous_and_bounded(text in volume_text(), size in 1usize..120) {
        let chunks = ChunkSegmenter::new(size).segment(&text);
        let mut expected_start = 0;

        for chunk in &chunks {
            prop_assert_eq!(chunk.cstart, expected_start);
            prop_assert!(!chunk.is_empty());
            prop_assert!(chunk.len() <= 2 * size, "chunk of {} for target {}", chunk.len(), size);
            prop_assert_eq!(chunk.text.chars().count(), chunk.len());
            expected_start = chunk.cend;
        }
        prop_assert_eq!(expected_start, text.chars().count());
    }

    #[test]
    fn prop_short_text_is_one_chunk(text in volume_text()) {
        let len = text.chars().count();
        let chunks = ChunkSegmenter::new(len.max(1)).segment(&text);
        prop_assert_eq!(chunks.len(), usize::from(len > 0));
    }
}
