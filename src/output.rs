//! Records produced by the pipeline: document metadata, page text, and
//! per-document / per-batch reports.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Default for title, author, dates and producer when the PDF lacks them.
pub const UNKNOWN: &str = "Unknown";
/// Default for subject and keywords when the PDF lacks them.
pub const NONE: &str = "None";

/// Normalised document metadata, one per filename.
///
/// Field order is the serialisation order of the metadata JSON file and of
/// the API response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub filename: String,
    pub title: String,
    pub author: String,
    pub subject: String,
    pub keywords: String,
    pub creation_date: String,
    pub modification_date: String,
    pub producer: String,
}

impl DocumentMetadata {
    /// A record with every field at its default.
    pub fn unknown(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            title: UNKNOWN.to_string(),
            author: UNKNOWN.to_string(),
            subject: NONE.to_string(),
            keywords: NONE.to_string(),
            creation_date: UNKNOWN.to_string(),
            modification_date: UNKNOWN.to_string(),
            producer: UNKNOWN.to_string(),
        }
    }
}

/// Where a page's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    /// Embedded text layer.
    Selectable,
    /// Recognised from the rasterised page.
    Ocr,
}

impl PageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageKind::Selectable => "selectable",
            PageKind::Ocr => "ocr",
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text of one page of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// 1-indexed page number.
    pub page_num: usize,
    pub kind: PageKind,
    pub text: String,
    /// Encoding label chosen for persistence (selectable pages only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

impl PageText {
    /// Label used as key in API responses: `Page N`.
    pub fn label(&self) -> String {
        format!("Page {}", self.page_num)
    }
}

/// Serialises a list of pages as a JSON object `{"Page 1": "...", ...}`
/// in page order.
pub struct PageMap<'a>(pub &'a [PageText]);

impl Serialize for PageMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for page in self.0 {
            map.serialize_entry(&page.label(), &page.text)?;
        }
        map.end()
    }
}

/// Read-only summary of a document, as shown by `pdfsift inspect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub metadata: DocumentMetadata,
    pub page_count: usize,
    /// Pages that carry a non-empty text layer.
    pub text_pages: usize,
    pub file_size_bytes: u64,
}

impl DocumentInfo {
    /// Pages without a text layer; these only yield text through OCR.
    pub fn scanned_pages(&self) -> usize {
        self.page_count.saturating_sub(self.text_pages)
    }
}

/// Outcome of processing one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub filename: String,
    pub document_id: i64,
    pub page_count: usize,
    /// Pages persisted with non-empty selectable text.
    pub selectable_pages: usize,
    /// Pages persisted with non-empty OCR text.
    pub ocr_pages: usize,
    pub duration_ms: u64,
}

/// A document the batch gave up on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFailure {
    pub filename: String,
    pub error: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub processed: Vec<DocumentReport>,
    pub failed: Vec<DocumentFailure>,
    pub total_duration_ms: u64,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.processed.len() + self.failed.len()
    }
}
