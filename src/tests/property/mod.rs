//! Property-based tests for the search core
//!
//! Property tests verify invariants that should hold for all inputs, rather
//! than testing specific cases.
//!
//! ## Test Modules
//!
//! - `tokenizer_props`: tsheg tokenization
//!   - No token is empty or contains a separator
//!   - Re-joining and re-tokenizing gives the same tokens
//!
//! - `honorific_props`: honorific stripping
//!   - Stripping is idempotent
//!   - Stripping never lengthens the input
//!
//! - `chunking_props`: chunk segmentation
//!   - Chunks concatenate back to the input
//!   - Chunks are contiguous, non-empty, and at most twice the target size
//!
//! - `synthesis_props`: relevance query synthesis
//!   - Compilation is deterministic
//!   - The clause budget bounds the number of alternatives
//!
//! By default, proptest runs 256 cases per property. This can be configured
//! via the `PROPTEST_CASES` environment variable:
//!
//! ```sh
//! PROPTEST_CASES=1000 cargo test property --release
//! ```

mod chunking_props;
mod honorific_props;
mod synthesis_props;
mod tokenizer_props;

use proptest::prelude::*;

/// Syllables mixing plain words, particles and honorific material.
const SYLLABLES: &[&str] = &[
    "ཀ", "བཀའ", "འགྱུར", "བསྟན", "མི", "ལ", "རས", "པ", "གི", "ཀྱི", "གྱི", "ནི", "བླ", "མ",
    "རྗེ", "རིན", "པོ", "ཆེ", "མཁན", "སློབ", "དཔོན", "བུ", "སྟོན",
];

/// Tibetan phrase of 1 to `max` syllables joined by tshegs.
fn tibetan_phrase(max: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(SYLLABLES), 1..=max).prop_map(|s| s.join("་"))
}
