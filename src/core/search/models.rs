//! Search Document Models
//!
//! Document shapes stored in the corpus index: works, persons and OCR
//! volumes with their pages, segments and text chunks.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use crate::ingestion::segmenter::Chunk;

// ============================================================================
// Enumerations
// ============================================================================

/// Value of the `type` field on every indexed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    VolumeEtext,
    Work,
    Person,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::VolumeEtext => "volume_etext",
            DocumentType::Work => "work",
            DocumentType::Person => "person",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Editorial workflow state of a volume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeStatus {
    #[default]
    New,
    InProgress,
    Review,
    Completed,
}

impl VolumeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeStatus::New => "new",
            VolumeStatus::InProgress => "in_progress",
            VolumeStatus::Review => "review",
            VolumeStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    #[default]
    Text,
    MainText,
    Editorial,
}

// ============================================================================
// Identifiers
// ============================================================================

const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default length of the random part of a generated id
pub const ID_LENGTH: usize = 7;

/// `prefix` followed by `length` random characters from `[A-Z0-9]`.
pub fn generate_id(prefix: &str, length: usize) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..length)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{prefix}{suffix}")
}

/// Id of the volume document for one OCR version of an image group.
pub fn volume_doc_id(w_id: &str, i_id: &str, i_version: &str, etext_source: &str) -> String {
    format!("{w_id}_{i_id}_{i_version}_{etext_source}")
}

// ============================================================================
// Volume Parts
// ============================================================================

/// A page's span in the volume text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    pub cstart: usize,
    pub cend: usize,
    pub pnum: u32,
    #[serde(default)]
    pub pname: Option<String>,
    #[serde(default)]
    pub img_link: Option<String>,
}

/// A cataloged span of the volume text (a text, its title page, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default)]
    pub id: Option<String>,
    pub cstart: usize,
    pub cend: usize,
    #[serde(default)]
    pub segment_type: SegmentType,
    #[serde(default)]
    pub parent_segment: Option<String>,
    #[serde(default)]
    pub title_bo: Option<String>,
    #[serde(default)]
    pub author_name_bo: Option<String>,
}

// ============================================================================
// Works & Persons
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Work {
    #[serde(default)]
    pub pref_label_bo: Option<String>,
    #[serde(default)]
    pub alt_label_bo: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub versions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOutput {
    pub id: String,
    #[serde(flatten)]
    pub work: Work,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub pref_label_bo: Option<String>,
    #[serde(default)]
    pub alt_label_bo: Option<String>,
    #[serde(default)]
    pub dates: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonOutput {
    pub id: String,
    #[serde(flatten)]
    pub person: Person,
}

// ============================================================================
// Volumes
// ============================================================================

/// Client-sent volume fields. Absent fields are left untouched by updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub i_version: Option<String>,
    #[serde(default, alias = "source", skip_serializing_if = "Option::is_none")]
    pub etext_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<VolumeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<PageEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<Segment>>,
}

/// A volume document as read back from the index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeOutput {
    pub id: String,
    pub w_id: String,
    pub i_id: String,
    #[serde(default)]
    pub i_version: Option<String>,
    #[serde(default)]
    pub etext_source: Option<String>,
    #[serde(default)]
    pub volume_number: Option<u32>,
    #[serde(default)]
    pub status: VolumeStatus,
    #[serde(default)]
    pub pages: Vec<PageEntry>,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub nb_pages: Option<usize>,
    #[serde(default)]
    pub first_imported_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub replaced_by: Option<String>,
    #[serde(default)]
    pub cstart: Option<usize>,
    #[serde(default)]
    pub cend: Option<usize>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub chunks: Vec<Chunk>,
}

/// `{"name": "instance"}` parent side of the instance/etext join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinField {
    pub name: String,
}

impl JoinField {
    pub fn instance() -> Self {
        Self {
            name: "instance".to_string(),
        }
    }
}

/// Full volume document written by an OCR import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeDocument {
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub w_id: String,
    pub i_id: String,
    pub i_version: String,
    pub etext_source: String,
    pub status: VolumeStatus,
    pub volume_number: Option<u32>,
    #[serde(default)]
    pub volume_pages_tbrc_intro: Option<u32>,
    #[serde(default)]
    pub volume_pages_total: Option<u32>,
    pub nb_pages: usize,
    pub pages: Vec<PageEntry>,
    /// Kept verbatim from a previous import
    pub segments: Vec<Value>,
    pub chunks: Vec<Chunk>,
    pub cstart: usize,
    pub cend: usize,
    pub first_imported_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub join_field: JoinField,
}

impl VolumeDocument {
    pub fn doc_id(&self) -> String {
        volume_doc_id(&self.w_id, &self.i_id, &self.i_version, &self.etext_source)
    }
}

// ============================================================================
// Listing & Statistics
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub total: u64,
    pub offset: u32,
    pub limit: u32,
    pub items: Vec<T>,
}

/// Document counts by type and volume status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub nb_volumes: u64,
    pub nb_volumes_by_status: IndexMap<String, u64>,
    pub nb_segments_total: u64,
    pub nb_works_total: u64,
    pub nb_persons_total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generate_id() {
        let id = generate_id("W", ID_LENGTH);
        assert_eq!(id.len(), 8);
        assert!(id.starts_with('W'));
        assert!(id[1..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert_ne!(generate_id("P", 12), generate_id("P", 12));
    }

    #[test]
    fn test_volume_doc_id() {
        assert_eq!(
            volume_doc_id("W22084", "I0886", "v1", "ocrv1-ws-ldv1"),
            "W22084_I0886_v1_ocrv1-ws-ldv1"
        );
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_value(DocumentType::VolumeEtext).unwrap(), "volume_etext");
        assert_eq!(serde_json::to_value(VolumeStatus::InProgress).unwrap(), "in_progress");
        assert_eq!(serde_json::to_value(SegmentType::MainText).unwrap(), "main_text");
        assert_eq!(DocumentType::Person.to_string(), "person");
    }

    #[test]
    fn test_volume_input_skips_unset() {
        let input = VolumeInput {
            status: Some(VolumeStatus::Review),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&input).unwrap(), json!({"status": "review"}));
    }

    #[test]
    fn test_volume_input_source_alias() {
        let input: VolumeInput =
            serde_json::from_value(json!({"i_version": "v1", "source": "ocrv1"})).unwrap();
        assert_eq!(input.etext_source.as_deref(), Some("ocrv1"));
    }

    #[test]
    fn test_volume_output_from_sparse_hit() {
        let volume: VolumeOutput = serde_json::from_value(json!({
            "id": "W1_I1_v1_ocr",
            "w_id": "W1",
            "i_id": "I1",
            "chunks": [{"cstart": 0, "cend": 3, "text_bo": "ཀཁག"}],
            "last_updated_at": "2025-01-02T03:04:05Z"
        }))
        .unwrap();
        assert_eq!(volume.status, VolumeStatus::New);
        assert_eq!(volume.chunks[0].text, "ཀཁག");
        assert!(volume.last_updated_at.is_some());
    }

    #[test]
    fn test_work_output_flattens() {
        let work: WorkOutput = serde_json::from_value(json!({
            "id": "WABC1234",
            "pref_label_bo": "བཀའ་འགྱུར",
            "type": "work"
        }))
        .unwrap();
        assert_eq!(work.work.pref_label_bo.as_deref(), Some("བཀའ་འགྱུར"));
        assert!(work.work.versions.is_empty());
    }
}
