//! Volume Assembly
//!
//! Builds one continuous volume text from OCR pages and records where each
//! page sits in it. Page numbers come from the image dimensions manifest when
//! it lists the page image, else from the page's position among kept pages.

use std::collections::HashMap;
use std::io::Read;

use flate2::read::GzDecoder;
use serde::Deserialize;

use super::error::{IngestionError, IngestionResult};
use crate::core::search::models::PageEntry;

/// Separator placed between page texts
pub const PAGE_SEPARATOR: char = '\n';

/// Long source name shortened in OCR object file names
const LONG_OCR_SOURCE: &str = "ocrv1-ws-ldv1";
const SHORT_OCR_SOURCE: &str = "ocrv1";

// ============================================================================
// OCR Pages
// ============================================================================

/// One OCR output row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OcrPage {
    pub img_file_name: String,
    pub ok: bool,
    #[serde(default)]
    pub line_texts: Vec<String>,
}

impl OcrPage {
    pub fn new(img_file_name: impl Into<String>, lines: &[&str]) -> Self {
        Self {
            img_file_name: img_file_name.into(),
            ok: true,
            line_texts: lines.iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn failed(img_file_name: impl Into<String>) -> Self {
        Self {
            img_file_name: img_file_name.into(),
            ok: false,
            line_texts: Vec::new(),
        }
    }

    pub fn text(&self) -> String {
        self.line_texts.join("\n")
    }
}

/// Object key of a volume's OCR output.
///
/// `ocrv1-ws-ldv1/W1/I1/v1/W1-I1-v1_ocrv1.parquet`
pub fn ocr_object_key(w_id: &str, i_id: &str, i_version: &str, etext_source: &str) -> String {
    let source_in_name = if etext_source == LONG_OCR_SOURCE {
        SHORT_OCR_SOURCE
    } else {
        etext_source
    };
    format!("{etext_source}/{w_id}/{i_id}/{i_version}/{w_id}-{i_id}-{i_version}_{source_in_name}.parquet")
}

// ============================================================================
// Dimensions Manifest
// ============================================================================

/// Entry of an image group's `dimensions.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageDimension {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl ImageDimension {
    /// Entries that count as pages: real images with both dimensions.
    fn is_page(&self) -> bool {
        let is_json = self
            .filename
            .as_deref()
            .is_some_and(|f| f.ends_with(".json"));
        !is_json && self.width.is_some() && self.height.is_some()
    }
}

/// Decode a gzip-compressed dimensions manifest, keeping page entries only.
pub fn parse_dimensions(gzipped: &[u8]) -> IngestionResult<Vec<ImageDimension>> {
    let mut json = String::new();
    GzDecoder::new(gzipped)
        .read_to_string(&mut json)
        .map_err(|e| IngestionError::Manifest(format!("cannot decompress: {e}")))?;

    let entries: Vec<ImageDimension> = serde_json::from_str(&json)
        .map_err(|e| IngestionError::Manifest(format!("invalid JSON: {e}")))?;

    let pages: Vec<ImageDimension> = entries.into_iter().filter(ImageDimension::is_page).collect();
    log::info!("Loaded {} valid image entries from dimensions manifest", pages.len());
    Ok(pages)
}

/// File name to 1-based page number.
pub fn page_numbers(dimensions: &[ImageDimension]) -> HashMap<String, u32> {
    dimensions
        .iter()
        .zip(1u32..)
        .filter_map(|(entry, pnum)| entry.filename.clone().map(|f| (f, pnum)))
        .collect()
}

// ============================================================================
// Assembly
// ============================================================================

/// Continuous text of a volume with its page spans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledVolume {
    pub text: String,
    pub pages: Vec<PageEntry>,
    /// Character length of `text`
    pub char_len: usize,
    /// Pages dropped because OCR failed
    pub skipped: usize,
}

/// Join successful pages, in file-name order, into one text.
///
/// Page texts are separated by a single newline; each page's `cend` is
/// exclusive and the next page starts one past it.
pub fn assemble(mut pages: Vec<OcrPage>, page_numbers: &HashMap<String, u32>) -> AssembledVolume {
    let before = pages.len();
    pages.retain(|p| p.ok);
    let skipped = before - pages.len();
    pages.sort_by(|a, b| a.img_file_name.cmp(&b.img_file_name));

    log::info!("Processing {} pages ({} skipped due to errors)", pages.len(), skipped);

    let mut text = String::new();
    let mut entries = Vec::with_capacity(pages.len());
    let mut offset = 0;

    for (position, page) in (1u32..).zip(&pages) {
        let page_text = page.text();
        let cstart = offset;
        let cend = cstart + page_text.chars().count();

        let pnum = match page_numbers.get(&page.img_file_name) {
            Some(&pnum) => pnum,
            None => {
                log::warn!(
                    "Page number not found for {}, using position {}",
                    page.img_file_name,
                    position
                );
                position
            }
        };

        if !entries.is_empty() {
            text.push(PAGE_SEPARATOR);
        }
        text.push_str(&page_text);

        entries.push(PageEntry {
            cstart,
            cend,
            pnum,
            pname: Some(page.img_file_name.clone()),
            img_link: None,
        });
        offset = cend + 1;
    }

    AssembledVolume {
        char_len: offset.saturating_sub(1),
        text,
        pages: entries,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(json: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(json.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_ocr_object_key() {
        assert_eq!(
            ocr_object_key("W1", "I1", "v1", "ocrv1-ws-ldv1"),
            "ocrv1-ws-ldv1/W1/I1/v1/W1-I1-v1_ocrv1.parquet"
        );
        assert_eq!(
            ocr_object_key("W1", "I1", "v1", "gv"),
            "gv/W1/I1/v1/W1-I1-v1_gv.parquet"
        );
    }

    #[test]
    fn test_parse_dimensions_filters_entries() {
        let manifest = gzip(
            r#"[
                {"filename": "I1_001.jpg", "width": 100, "height": 50},
                {"filename": "info.json", "width": 1, "height": 1},
                {"filename": "I1_002.jpg", "width": null, "height": 50},
                {"filename": "I1_003.jpg", "width": 100, "height": 50}
            ]"#,
        );
        let dims = parse_dimensions(&manifest).unwrap();
        assert_eq!(dims.len(), 2);

        let numbers = page_numbers(&dims);
        assert_eq!(numbers["I1_001.jpg"], 1);
        assert_eq!(numbers["I1_003.jpg"], 2);
    }

    #[test]
    fn test_parse_dimensions_rejects_plain_json() {
        let err = parse_dimensions(b"[]").unwrap_err();
        assert!(matches!(err, IngestionError::Manifest(_)));
    }

    #[test]
    fn test_assemble_offsets() {
        let pages = vec![
            OcrPage::new("b.jpg", &["ཁཁ", "ག"]),
            OcrPage::new("a.jpg", &["ཀཀཀ"]),
        ];
        let volume = assemble(pages, &HashMap::new());

        assert_eq!(volume.text, "ཀཀཀ\nཁཁ\nག");
        assert_eq!(volume.char_len, 8);
        assert_eq!((volume.pages[0].cstart, volume.pages[0].cend), (0, 3));
        assert_eq!((volume.pages[1].cstart, volume.pages[1].cend), (4, 8));
        assert_eq!(volume.pages[0].pname.as_deref(), Some("a.jpg"));
    }

    #[test]
    fn test_assemble_skips_failed_pages() {
        let pages = vec![
            OcrPage::new("a.jpg", &["ཀ"]),
            OcrPage::failed("b.jpg"),
            OcrPage::new("c.jpg", &["ཁ"]),
        ];
        let volume = assemble(pages, &HashMap::new());

        assert_eq!(volume.skipped, 1);
        assert_eq!(volume.text, "ཀ\nཁ");
        assert_eq!(volume.pages.len(), 2);
    }

    #[test]
    fn test_page_numbers_from_manifest_with_fallback() {
        let numbers = HashMap::from([("a.jpg".to_string(), 7)]);
        let pages = vec![OcrPage::new("a.jpg", &["ཀ"]), OcrPage::new("z.jpg", &["ཁ"])];
        let volume = assemble(pages, &numbers);

        assert_eq!(volume.pages[0].pnum, 7);
        assert_eq!(volume.pages[1].pnum, 2);
    }

    #[test]
    fn test_assemble_empty_pages() {
        let volume = assemble(vec![OcrPage::new("a.jpg", &[]), OcrPage::new("b.jpg", &["ཀ"])], &HashMap::new());
        assert_eq!(volume.text, "\nཀ");
        assert_eq!((volume.pages[0].cstart, volume.pages[0].cend), (0, 0));
        assert_eq!((volume.pages[1].cstart, volume.pages[1].cend), (1, 2));
        assert_eq!(volume.char_len, 2);
    }

    #[test]
    fn test_assemble_nothing() {
        let volume = assemble(vec![], &HashMap::new());
        assert!(volume.text.is_empty());
        assert_eq!(volume.char_len, 0);
    }
}
