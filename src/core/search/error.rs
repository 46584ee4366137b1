//! Search Error Types
//!
//! Error handling for the index client and catalog operations.

use thiserror::Error;

/// Search operation errors
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("OpenSearch returned {status}: {body}")]
    Engine { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl SearchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SearchError::DocumentNotFound(_))
            || matches!(self, SearchError::Engine { status: 404, .. })
    }
}

/// Result type alias for search operations
pub type Result<T> = std::result::Result<T, SearchError>;
