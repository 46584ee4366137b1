//! OCR Volume Import
//!
//! Turns the OCR output of one image group version into a volume document:
//! fetch pages, assemble the volume text, cut it into chunks, attach catalog
//! metadata and write the result to the index. A re-import keeps the
//! cataloging work (segments, status, first import date) of the previous
//! document.
//!
//! Blob storage, the image manifest and the metadata service are collaborator
//! traits so the pipeline runs the same against S3, a local mirror or tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use super::error::{IngestionError, IngestionResult};
use super::segmenter::ChunkSegmenter;
use super::volume::{assemble, ocr_object_key, page_numbers, parse_dimensions, OcrPage};
use crate::config::IngestionConfig;
use crate::core::search::models::{volume_doc_id, DocumentType, JoinField, VolumeDocument, VolumeStatus};
use crate::core::search::{DocumentStore, SearchError};

// ============================================================================
// Collaborators
// ============================================================================

/// Source of OCR output rows, addressed by object key.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OcrSource: Send + Sync {
    async fn fetch_pages(&self, key: &str) -> IngestionResult<Vec<OcrPage>>;
}

/// Source of an image group's gzip-compressed dimensions manifest.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// `Ok(None)` when the image group has no manifest.
    async fn dimensions(&self, w_id: &str, i_id: &str) -> IngestionResult<Option<Vec<u8>>>;
}

/// Catalog facts about a volume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMetadata {
    pub volume_number: Option<u32>,
    pub volume_pages_tbrc_intro: Option<u32>,
    pub volume_pages_total: Option<u32>,
}

/// Volume metadata lookup. Never fails: unknown facts are `None`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VolumeMetadataSource: Send + Sync {
    async fn fetch(&self, i_id: &str) -> VolumeMetadata;
}

// ============================================================================
// Local Mirror
// ============================================================================

/// OCR output and manifests mirrored on disk.
///
/// [`LocalMirror::from_config`] roots the mirror at
/// `{mirror_dir}/{ocr_bucket}`, a synced copy of the OCR bucket.
/// Pages live at `{root}/{key}` with the `.parquet` extension replaced by
/// `.json` (a JSON array of rows). Manifests live at
/// `{root}/manifests/{w_id}-{i_id}/dimensions.json`, gzip-compressed as in
/// the archive.
#[derive(Debug, Clone)]
pub struct LocalMirror {
    root: PathBuf,
}

impl LocalMirror {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &IngestionConfig) -> IngestionResult<Self> {
        let mirror_dir = config
            .mirror_dir
            .as_ref()
            .ok_or_else(|| IngestionError::Source("ingestion.mirror_dir is not configured".into()))?;
        Ok(Self::new(mirror_dir.join(&config.ocr_bucket)))
    }

    pub fn pages_path(&self, key: &str) -> PathBuf {
        self.root.join(key).with_extension("json")
    }

    pub fn manifest_path(&self, w_id: &str, i_id: &str) -> PathBuf {
        self.root
            .join("manifests")
            .join(format!("{w_id}-{i_id}"))
            .join("dimensions.json")
    }
}

#[async_trait]
impl OcrSource for LocalMirror {
    async fn fetch_pages(&self, key: &str) -> IngestionResult<Vec<OcrPage>> {
        let path = self.pages_path(key);
        log::info!("Reading OCR output from {}", path.display());

        let contents = tokio::fs::read_to_string(&path).await?;
        let pages: Vec<OcrPage> = serde_json::from_str(&contents)
            .map_err(|e| IngestionError::Source(format!("{}: {e}", path.display())))?;

        log::info!("Read {} rows from {}", pages.len(), path.display());
        Ok(pages)
    }
}

#[async_trait]
impl ManifestSource for LocalMirror {
    async fn dimensions(&self, w_id: &str, i_id: &str) -> IngestionResult<Option<Vec<u8>>> {
        read_optional(&self.manifest_path(w_id, i_id)).await
    }
}

async fn read_optional(path: &Path) -> IngestionResult<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// Metadata Service
// ============================================================================

static VOLUME_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| turtle_property("volumeNumber"));
static PAGES_INTRO_RE: LazyLock<Regex> = LazyLock::new(|| turtle_property("volumePagesTbrcIntro"));
static PAGES_TOTAL_RE: LazyLock<Regex> = LazyLock::new(|| turtle_property("volumePagesTotal"));

/// Integer object of a core ontology property, prefixed or as a full IRI,
/// bare or as a typed literal.
fn turtle_property(name: &str) -> Regex {
    Regex::new(&format!(
        r#"(?:bdo:{name}|<http://purl\.bdrc\.io/ontology/core/{name}>)\s+"?(\d+)"#
    ))
    .unwrap()
}

/// Split a Turtle document into statements at `.` terminators outside
/// literals and IRIs.
fn turtle_statements(turtle: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut start = 0;
    let mut in_literal = false;
    let mut in_iri = false;
    let mut escaped = false;
    let mut chars = turtle.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if in_literal {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_literal = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' if !in_iri => in_literal = true,
            '<' => in_iri = true,
            '>' => in_iri = false,
            '.' if !in_iri => {
                let at_end = chars.peek().map_or(true, |&(_, next)| next.is_whitespace());
                if at_end {
                    statements.push(turtle[start..i].trim());
                    start = i + 1;
                }
            }
            _ => {}
        }
    }
    statements.push(turtle[start..].trim());
    statements.retain(|s| !s.is_empty());
    statements
}

/// Whether a statement describes `i_id`, prefixed or as a full IRI.
fn is_about(statement: &str, i_id: &str) -> bool {
    let Some(subject) = statement.split_whitespace().next() else {
        return false;
    };
    subject == format!("bdr:{i_id}") || subject == format!("<http://purl.bdrc.io/resource/{i_id}>")
}

/// Extract the facts about volume `i_id` from its Turtle description.
/// Statements about other resources in the same document are ignored.
pub fn parse_volume_metadata(turtle: &str, i_id: &str) -> VolumeMetadata {
    let statements: Vec<&str> = turtle_statements(turtle)
        .into_iter()
        .filter(|s| is_about(s, i_id))
        .collect();
    let first = |re: &Regex| {
        statements.iter().find_map(|statement| {
            re.captures(statement)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
    };
    VolumeMetadata {
        volume_number: first(&VOLUME_NUMBER_RE),
        volume_pages_tbrc_intro: first(&PAGES_INTRO_RE),
        volume_pages_total: first(&PAGES_TOTAL_RE),
    }
}

/// Reads `{base}{i_id}.ttl` from the linked data server.
#[derive(Debug, Clone)]
pub struct BdrcMetadataClient {
    http: Client,
    base_url: String,
}

impl BdrcMetadataClient {
    pub fn new(config: &IngestionConfig) -> IngestionResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.metadata_timeout_secs))
            .build()
            .map_err(|e| IngestionError::Source(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.metadata_base_url.clone(),
        })
    }

    pub fn resource_url(&self, i_id: &str) -> String {
        format!("{}{}.ttl", self.base_url, i_id)
    }

    async fn fetch_turtle(&self, url: &str) -> Result<String, reqwest::Error> {
        self.http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl VolumeMetadataSource for BdrcMetadataClient {
    async fn fetch(&self, i_id: &str) -> VolumeMetadata {
        let url = self.resource_url(i_id);
        log::info!("Fetching volume metadata from {}", url);

        match self.fetch_turtle(&url).await {
            Ok(turtle) => {
                let metadata = parse_volume_metadata(&turtle, i_id);
                log::info!("Fetched metadata for {}: {:?}", i_id, metadata);
                metadata
            }
            Err(e) => {
                log::warn!("Failed to fetch volume metadata from {}: {}", url, e);
                VolumeMetadata::default()
            }
        }
    }
}

// ============================================================================
// Importer
// ============================================================================

/// One image group version to import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRequest {
    pub w_id: String,
    pub i_id: String,
    pub i_version: String,
    pub etext_source: String,
}

impl ImportRequest {
    pub fn doc_id(&self) -> String {
        volume_doc_id(&self.w_id, &self.i_id, &self.i_version, &self.etext_source)
    }

    pub fn object_key(&self) -> String {
        ocr_object_key(&self.w_id, &self.i_id, &self.i_version, &self.etext_source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub doc_id: String,
    pub nb_pages: usize,
    pub nb_chunks: usize,
    pub skipped_pages: usize,
    /// An earlier document was replaced
    pub reimported: bool,
}

/// Fields carried over from a previous import of the same volume.
struct Preserved {
    first_imported_at: DateTime<Utc>,
    segments: Vec<Value>,
    status: VolumeStatus,
}

impl Preserved {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            first_imported_at: now,
            segments: Vec::new(),
            status: VolumeStatus::New,
        }
    }

    fn from_existing(existing: &Value, now: DateTime<Utc>) -> Self {
        let first_imported_at = existing
            .get("first_imported_at")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or(now);
        let segments = existing
            .get("segments")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let status = existing
            .get("status")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        Self {
            first_imported_at,
            segments,
            status,
        }
    }
}

pub struct OcrImporter {
    ocr: Arc<dyn OcrSource>,
    manifests: Arc<dyn ManifestSource>,
    metadata: Arc<dyn VolumeMetadataSource>,
    store: Arc<dyn DocumentStore>,
    segmenter: ChunkSegmenter,
}

impl OcrImporter {
    pub fn new(
        ocr: Arc<dyn OcrSource>,
        manifests: Arc<dyn ManifestSource>,
        metadata: Arc<dyn VolumeMetadataSource>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            ocr,
            manifests,
            metadata,
            store,
            segmenter: ChunkSegmenter::default(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.segmenter = ChunkSegmenter::new(chunk_size);
        self
    }

    /// Import one volume and return what was written.
    #[instrument(skip(self), fields(doc_id = %request.doc_id()))]
    pub async fn import(&self, request: &ImportRequest) -> IngestionResult<ImportSummary> {
        let rows = self.ocr.fetch_pages(&request.object_key()).await?;

        let (numbers, metadata) = tokio::join!(
            self.page_numbers(&request.w_id, &request.i_id),
            self.metadata.fetch(&request.i_id),
        );

        let volume = assemble(rows, &numbers);
        let chunks = self.segmenter.segment(&volume.text);

        let doc_id = request.doc_id();
        let now = Utc::now();
        let existing = self.store.get(&doc_id).await?;
        let preserved = match &existing {
            Some(existing) => {
                let preserved = Preserved::from_existing(existing, now);
                log::info!(
                    "Reimporting existing volume {} - preserving {} segments and status={}",
                    doc_id,
                    preserved.segments.len(),
                    preserved.status.as_str()
                );
                preserved
            }
            None => {
                log::info!("Creating new volume {}", doc_id);
                Preserved::fresh(now)
            }
        };

        let summary = ImportSummary {
            doc_id: doc_id.clone(),
            nb_pages: volume.pages.len(),
            nb_chunks: chunks.len(),
            skipped_pages: volume.skipped,
            reimported: existing.is_some(),
        };

        let document = VolumeDocument {
            doc_type: DocumentType::VolumeEtext,
            w_id: request.w_id.clone(),
            i_id: request.i_id.clone(),
            i_version: request.i_version.clone(),
            etext_source: request.etext_source.clone(),
            status: preserved.status,
            volume_number: metadata.volume_number,
            volume_pages_tbrc_intro: metadata.volume_pages_tbrc_intro,
            volume_pages_total: metadata.volume_pages_total,
            nb_pages: volume.pages.len(),
            pages: volume.pages,
            segments: preserved.segments,
            chunks,
            cstart: 0,
            cend: volume.char_len,
            first_imported_at: preserved.first_imported_at,
            last_updated_at: now,
            join_field: JoinField::instance(),
        };

        let body = serde_json::to_value(&document).map_err(SearchError::from)?;
        self.store.index(&doc_id, &body).await?;

        log::info!(
            "Indexed volume {} ({} pages, {} chunks)",
            doc_id,
            summary.nb_pages,
            summary.nb_chunks
        );
        Ok(summary)
    }

    /// Page numbers from the manifest; empty when it is missing or unreadable.
    async fn page_numbers(&self, w_id: &str, i_id: &str) -> HashMap<String, u32> {
        let manifest = match self.manifests.dimensions(w_id, i_id).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                log::warn!("No dimensions manifest for {}-{}", w_id, i_id);
                return HashMap::new();
            }
            Err(e) => {
                log::warn!("Cannot fetch dimensions manifest for {}-{}: {}", w_id, i_id, e);
                return HashMap::new();
            }
        };

        match parse_dimensions(&manifest) {
            Ok(dimensions) => page_numbers(&dimensions),
            Err(e) => {
                log::warn!("Error parsing dimensions manifest for {}-{}: {}", w_id, i_id, e);
                HashMap::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TURTLE: &str = r#"
@prefix bdo: <http://purl.bdrc.io/ontology/core/> .
@prefix bdr: <http://purl.bdrc.io/resource/> .

bdr:I1CZ35  a  bdo:ImageGroup ;
    bdo:volumeNumber  3 ;
    bdo:volumePagesTbrcIntro  "2"^^xsd:integer ;
    bdo:volumeOf  bdr:W1CZ35 .
"#;

    #[test]
    fn test_parse_volume_metadata() {
        assert_eq!(
            parse_volume_metadata(TURTLE, "I1CZ35"),
            VolumeMetadata {
                volume_number: Some(3),
                volume_pages_tbrc_intro: Some(2),
                volume_pages_total: None,
            }
        );
    }

    #[test]
    fn test_parse_volume_metadata_full_iri() {
        let turtle = "<http://purl.bdrc.io/resource/I1> <http://purl.bdrc.io/ontology/core/volumePagesTotal> 412 .";
        assert_eq!(parse_volume_metadata(turtle, "I1").volume_pages_total, Some(412));
    }

    #[test]
    fn test_parse_volume_metadata_garbage() {
        assert_eq!(parse_volume_metadata("<html>", "I1"), VolumeMetadata::default());
    }

    #[test]
    fn test_parse_volume_metadata_ignores_other_subjects() {
        let turtle = r#"
bdr:I1CZ34  bdo:volumeNumber  2 ;
    bdo:volumePagesTotal  300 .
bdr:W1CZ35  skos:prefLabel  "bka' 'gyur. vol. 3"@bo-x-ewts ;
    bdo:volumeNumber  9 .
bdr:I1CZ35  bdo:volumeNumber  3 .
"#;
        let metadata = parse_volume_metadata(turtle, "I1CZ35");
        assert_eq!(metadata.volume_number, Some(3));
        assert_eq!(metadata.volume_pages_total, None);

        assert_eq!(parse_volume_metadata(turtle, "I1CZ34").volume_number, Some(2));
        assert_eq!(parse_volume_metadata(turtle, "I9").volume_number, None);
    }

    #[test]
    fn test_request_keys() {
        let request = ImportRequest {
            w_id: "W22084".into(),
            i_id: "I0886".into(),
            i_version: "v1".into(),
            etext_source: "ocrv1-ws-ldv1".into(),
        };
        assert_eq!(
            request.object_key(),
            "ocrv1-ws-ldv1/W22084/I0886/v1/W22084-I0886-v1_ocrv1.parquet"
        );
        assert_eq!(
            request.doc_id(),
            volume_doc_id("W22084", "I0886", "v1", "ocrv1-ws-ldv1")
        );
    }

    #[test]
    fn test_preserved_from_existing() {
        let now = Utc::now();
        let existing = serde_json::json!({
            "first_imported_at": "2024-01-02T03:04:05Z",
            "segments": [{"cstart": 0, "cend": 10}],
            "status": "review"
        });
        let preserved = Preserved::from_existing(&existing, now);
        assert_eq!(preserved.first_imported_at.to_rfc3339(), "2024-01-02T03:04:05+00:00");
        assert_eq!(preserved.segments.len(), 1);
        assert_eq!(preserved.status, VolumeStatus::Review);
    }

    #[test]
    fn test_preserved_tolerates_bad_fields() {
        let now = Utc::now();
        let existing = serde_json::json!({"first_imported_at": "yesterday", "status": 7});
        let preserved = Preserved::from_existing(&existing, now);
        assert_eq!(preserved.first_imported_at, now);
        assert!(preserved.segments.is_empty());
        assert_eq!(preserved.status, VolumeStatus::New);
    }

    #[test]
    fn test_local_mirror_paths() {
        let mirror = LocalMirror::new("/data");
        assert_eq!(
            mirror.pages_path("ocrv1/W1/I1/v1/W1-I1-v1_ocrv1.parquet"),
            PathBuf::from("/data/ocrv1/W1/I1/v1/W1-I1-v1_ocrv1.json")
        );
        assert_eq!(
            mirror.manifest_path("W1", "I1"),
            PathBuf::from("/data/manifests/W1-I1/dimensions.json")
        );
    }

    #[test]
    fn test_local_mirror_from_config() {
        let config = IngestionConfig {
            mirror_dir: Some(PathBuf::from("/data")),
            ocr_bucket: "ocr.example.org".into(),
            ..Default::default()
        };
        let mirror = LocalMirror::from_config(&config).unwrap();
        assert_eq!(
            mirror.pages_path("ocrv1/W1/I1/v1/W1-I1-v1_ocrv1.parquet"),
            PathBuf::from("/data/ocr.example.org/ocrv1/W1/I1/v1/W1-I1-v1_ocrv1.json")
        );

        let unset = IngestionConfig::default();
        assert!(matches!(
            LocalMirror::from_config(&unset),
            Err(IngestionError::Source(_))
        ));
    }
}
