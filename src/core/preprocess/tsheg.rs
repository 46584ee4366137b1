//! Tsheg Tokenization
//!
//! Splits Tibetan Unicode text into syllables on tsheg-class separators.

/// Syllable separators: U+0F0B tsheg, U+0F0C non-breaking tsheg, U+0F14 gter tsheg.
pub const TSHEG_CHARS: [char; 3] = ['\u{0f0b}', '\u{0f0c}', '\u{0f14}'];

/// The separator used when re-joining syllables into a phrase.
pub const TSHEG: char = '\u{0f0b}';

/// Returns true for characters that separate syllables (tshegs or whitespace).
#[inline]
pub fn is_separator(c: char) -> bool {
    TSHEG_CHARS.contains(&c) || c.is_whitespace()
}

/// Split `s` into syllable tokens.
///
/// Runs of separators collapse, so no token is ever empty. Text without any
/// separator comes back as a single token; empty or whitespace-only text
/// yields no tokens.
pub fn tokenize(s: &str) -> Vec<&str> {
    s.split(is_separator).filter(|t| !t.is_empty()).collect()
}

/// Re-join tokens into a phrase with the canonical tsheg.
pub fn join(tokens: &[&str]) -> String {
    let mut buf = [0u8; 4];
    tokens.join(TSHEG.encode_utf8(&mut buf))
}
