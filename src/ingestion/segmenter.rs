//! Chunk Segmentation
//!
//! Splits a volume's text into bounded chunks for phrase indexing. Cuts
//! prefer Tibetan sentence endings (a final syllable closed by a shad, or a
//! double shad / ornamental marker run), then the last newline or space, and
//! only then a hard cut.
//!
//! All offsets are character offsets, never bytes. A chunk is at most twice
//! the target size; chunks are contiguous and concatenate back to the input.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Default target chunk length in characters
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Sentence boundaries: `[final letter]ོ[tsheg]?[shad]` plus trailing
/// non-letters, or a double shad / ornament followed by its punctuation run.
static NATURAL_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"([སའངགདནབམརལཏ]ོ[་༌]?[།-༔][^ཀ-ཬ]*|(།།|[༎-༒])[^ཀ-ཬ༠-༩]*[།-༔][^ཀ-ཬ༠-༩]*)",
    )
    .unwrap()
});

// ============================================================================
// Types
// ============================================================================

/// A span of the source text. `cend` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub cstart: usize,
    pub cend: usize,
    #[serde(rename = "text_bo", default)]
    pub text: String,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.cend - self.cstart
    }

    pub fn is_empty(&self) -> bool {
        self.cend == self.cstart
    }
}

/// Character-offset view of a string.
struct CharIndex<'a> {
    text: &'a str,
    /// Byte offset and value of every character
    chars: Vec<(usize, char)>,
}

impl<'a> CharIndex<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.char_indices().collect(),
        }
    }

    fn len(&self) -> usize {
        self.chars.len()
    }

    fn byte_at(&self, char_pos: usize) -> usize {
        self.chars
            .get(char_pos)
            .map(|(b, _)| *b)
            .unwrap_or(self.text.len())
    }

    /// Character offset of a byte offset on a char boundary.
    fn char_at(&self, byte_pos: usize) -> usize {
        self.chars.partition_point(|(b, _)| *b < byte_pos)
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[self.byte_at(start)..self.byte_at(end)]
    }

    /// Last newline or space at a char position in `[from, to)`.
    fn last_whitespace(&self, from: usize, to: usize) -> Option<usize> {
        (from..to)
            .rev()
            .find(|&i| matches!(self.chars[i].1, '\n' | ' '))
    }
}

// ============================================================================
// Segmenter
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSegmenter {
    target_size: usize,
}

impl Default for ChunkSegmenter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl ChunkSegmenter {
    /// Segmenter aiming at `target_size` characters per chunk (at least 1).
    pub fn new(target_size: usize) -> Self {
        Self {
            target_size: target_size.max(1),
        }
    }

    pub fn target_size(&self) -> usize {
        self.target_size
    }

    /// Split `text` into chunks.
    pub fn segment(&self, text: &str) -> Vec<Chunk> {
        let index = CharIndex::new(text);
        let text_len = index.len();
        let size = self.target_size;

        if text_len <= size {
            if text_len == 0 {
                return Vec::new();
            }
            return vec![Chunk {
                cstart: 0,
                cend: text_len,
                text: text.to_string(),
            }];
        }

        let breaks: Vec<usize> = NATURAL_BREAK_RE
            .find_iter(text)
            .map(|m| index.char_at(m.end()))
            .collect();

        let mut chunks = Vec::with_capacity(text_len / size + 1);
        let mut start = 0;
        let mut cursor = 0;

        while text_len - start > size {
            let target = start + size;
            let max_end = text_len.min(start + 2 * size);

            while cursor < breaks.len() && breaks[cursor] < target {
                cursor += 1;
            }

            let end = match (cursor.checked_sub(1).map(|i| breaks[i]), breaks.get(cursor)) {
                (Some(before), _) if before > start => before,
                (_, Some(&at)) if at <= max_end => at,
                _ => index
                    .last_whitespace(start + 1, max_end)
                    .map(|ws| ws + 1)
                    .unwrap_or(max_end),
            };

            chunks.push(Chunk {
                cstart: start,
                cend: end,
                text: index.slice(start, end).to_string(),
            });
            start = end;
        }

        if start < text_len {
            chunks.push(Chunk {
                cstart: start,
                cend: text_len,
                text: index.slice(start, text_len).to_string(),
            });
        }

        log::debug!(
            "Segmented {} chars into {} chunks ({} natural breaks)",
            text_len,
            chunks.len(),
            breaks.len()
        );
        chunks
    }
}

/// Split `text` into chunks of about `target_size` characters.
pub fn segment(text: &str, target_size: usize) -> Vec<Chunk> {
    ChunkSegmenter::new(target_size).segment(text)
}
