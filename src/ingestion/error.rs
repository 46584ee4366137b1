//! Ingestion Error Types

use thiserror::Error;

use crate::core::search::SearchError;

#[derive(Error, Debug)]
pub enum IngestionError {
    /// OCR output could not be fetched or decoded
    #[error("OCR source error: {0}")]
    Source(String),

    #[error("Dimensions manifest error: {0}")]
    Manifest(String),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type IngestionResult<T> = std::result::Result<T, IngestionError>;
