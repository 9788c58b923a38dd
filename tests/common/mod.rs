//! In-memory test doubles for the page reader and OCR engine.
//!
//! A [`FakeDoc`] lists each page's selectable text and the text OCR should
//! "recognise" on it. The fake reader hands the OCR text over to the fake OCR
//! engine through a shared queue when a page is rasterised, so the two stay
//! in step exactly like the real reader → OCR hand-off.

#![allow(dead_code)]

use image::DynamicImage;
use pdfsift::pipeline::ocr::OcrExtractor;
use pdfsift::pipeline::reader::{DocumentHandle, InfoField, PageReader};
use pdfsift::{Orchestrator, PipelineConfig, PipelineError, SqliteStore};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// OCR text that makes [`FakeOcr`] fail for the page.
pub const OCR_FAILS: &str = "<ocr-fails>";

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub text: String,
    pub ocr: String,
}

impl FakePage {
    pub fn new(text: &str, ocr: &str) -> Self {
        Self {
            text: text.to_string(),
            ocr: ocr.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeDoc {
    pub pages: Vec<FakePage>,
    pub info: HashMap<InfoField, String>,
}

impl FakeDoc {
    pub fn with_pages(pages: Vec<FakePage>) -> Self {
        Self {
            pages,
            info: HashMap::new(),
        }
    }

    pub fn info(mut self, field: InfoField, value: &str) -> Self {
        self.info.insert(field, value.to_string());
        self
    }
}

type Rendered = Arc<Mutex<VecDeque<String>>>;

/// Reader keyed by file name. Unknown names open as corrupt PDFs.
pub struct FakeReader {
    docs: HashMap<String, FakeDoc>,
    rendered: Rendered,
}

struct FakeHandle<'a> {
    doc: &'a FakeDoc,
    rendered: &'a Rendered,
}

impl PageReader for FakeReader {
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn DocumentHandle + 'a>, PipelineError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match self.docs.get(&name) {
            Some(doc) => Ok(Box::new(FakeHandle {
                doc,
                rendered: &self.rendered,
            })),
            None => Err(PipelineError::CorruptPdf {
                path: path.to_path_buf(),
                detail: "no xref table".into(),
            }),
        }
    }
}

impl DocumentHandle for FakeHandle<'_> {
    fn page_count(&self) -> usize {
        self.doc.pages.len()
    }

    fn page_text(&self, index: usize) -> Result<String, PipelineError> {
        Ok(self.doc.pages[index].text.clone())
    }

    fn page_image(&self, index: usize) -> Result<DynamicImage, PipelineError> {
        self.rendered
            .lock()
            .unwrap()
            .push_back(self.doc.pages[index].ocr.clone());
        Ok(DynamicImage::new_luma8(4, 4))
    }

    fn info(&self, field: InfoField) -> Option<String> {
        self.doc.info.get(&field).cloned()
    }
}

pub struct FakeOcr {
    rendered: Rendered,
}

impl OcrExtractor for FakeOcr {
    fn recognize(&self, _image: &DynamicImage) -> Result<String, PipelineError> {
        let text = self.rendered.lock().unwrap().pop_front().unwrap_or_default();
        if text == OCR_FAILS {
            return Err(PipelineError::OcrFailed("engine crashed".into()));
        }
        Ok(text.trim().to_string())
    }
}

/// Orchestrator over the fakes and a real SQLite store at `config.db_path`.
pub fn orchestrator_for(config: PipelineConfig, docs: HashMap<String, FakeDoc>) -> Orchestrator {
    let rendered: Rendered = Arc::default();
    let reader = FakeReader {
        docs,
        rendered: rendered.clone(),
    };
    let ocr = FakeOcr { rendered };
    let store = SqliteStore::open(&config.db_path).unwrap();
    Orchestrator::new(config, Box::new(reader), Box::new(ocr), Box::new(store))
}

/// A temp root with the standard directory layout and a set of fake PDFs.
pub struct Fixture {
    pub dir: TempDir,
    pub config: PipelineConfig,
    pub docs: HashMap<String, FakeDoc>,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::with_root(dir.path());
        Self::with_config(dir, config)
    }

    pub fn with_config(dir: TempDir, config: PipelineConfig) -> Self {
        config.ensure_directories().unwrap();
        Self {
            dir,
            config,
            docs: HashMap::new(),
        }
    }

    /// Register `doc` and write a file with PDF magic bytes under the input dir.
    pub fn add(&mut self, name: &str, doc: FakeDoc) -> PathBuf {
        let path = self.config.input_dir.join(name);
        std::fs::write(&path, b"%PDF-1.7\n% fake\n").unwrap();
        self.docs.insert(name.to_string(), doc);
        path
    }

    pub fn orchestrator(&self) -> Orchestrator {
        orchestrator_for(self.config.clone(), self.docs.clone())
    }
}

/// The two-page document of the reference scenario: page 1 has a text layer
/// saying "Hello", page 2 is a scan that OCRs to "World".
pub fn sample_doc() -> FakeDoc {
    FakeDoc::with_pages(vec![FakePage::new("Hello", ""), FakePage::new("", "World")])
        .info(InfoField::Title, "Sample")
        .info(InfoField::Author, "Jane Roe")
        .info(InfoField::CreationDate, "D:20240131120000+01'00'")
}
