//! Volume Ingestion
//!
//! - `segmenter`: sentence-aware chunking of volume text
//! - `volume`: page assembly and page numbering from the image manifest
//! - `ocr_import`: the OCR-to-index import pipeline

pub mod error;
pub mod ocr_import;
pub mod segmenter;
pub mod volume;

pub use error::{IngestionError, IngestionResult};
pub use ocr_import::{
    BdrcMetadataClient, ImportRequest, ImportSummary, LocalMirror, ManifestSource, OcrImporter,
    OcrSource, VolumeMetadata, VolumeMetadataSource,
};
pub use segmenter::{Chunk, ChunkSegmenter, DEFAULT_CHUNK_SIZE};
pub use volume::{assemble, AssembledVolume, OcrPage};
