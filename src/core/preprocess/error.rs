//! Preprocessing Error Types

use thiserror::Error;

/// Errors raised while preparing query preprocessing state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreprocessError {
    #[error("Cannot transliterate '{literal}': {reason}")]
    Transliteration { literal: String, reason: String },

    #[error("Unbalanced alternation in catalog literal '{0}'")]
    Alternation(String),

    #[error("Pattern compilation failed: {0}")]
    Pattern(String),
}

impl From<regex::Error> for PreprocessError {
    fn from(e: regex::Error) -> Self {
        PreprocessError::Pattern(e.to_string())
    }
}

/// Result type alias for preprocessing operations
pub type PreprocessResult<T> = std::result::Result<T, PreprocessError>;
