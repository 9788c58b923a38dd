//! Pipeline orchestrator: drives documents through the reader, OCR and store.
//!
//! One document and one page at a time. For every document:
//!
//! ```text
//! resolve ──▶ open ──▶ metadata ──▶ upsert ──▶ selectable text ──▶ OCR
//!                                    (id)       (per page)        (per page)
//! ```
//!
//! Selectable extraction and OCR run independently of each other. A failure
//! on one page is logged and that page is treated as empty; a failure that
//! prevents the document from being opened or stored abandons the document,
//! and a batch always moves on to the next one.

use crate::config::{PageWritePolicy, PipelineConfig};
use crate::error::PipelineError;
use crate::output::{
    BatchReport, DocumentFailure, DocumentInfo, DocumentMetadata, DocumentReport, PageKind,
    PageText,
};
use crate::pipeline::reader::{DocumentHandle, PageReader, PdfiumReader};
use crate::pipeline::ocr::{OcrExtractor, TesseractOcr};
use crate::pipeline::{encoding, files, metadata, source};
use crate::store::{DocumentId, DocumentStore, SqliteStore};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Runs extraction for single documents and batches.
pub struct Orchestrator {
    config: PipelineConfig,
    reader: Box<dyn PageReader>,
    ocr: Box<dyn OcrExtractor>,
    store: Box<dyn DocumentStore>,
}

impl Orchestrator {
    pub fn new(
        config: PipelineConfig,
        reader: Box<dyn PageReader>,
        ocr: Box<dyn OcrExtractor>,
        store: Box<dyn DocumentStore>,
    ) -> Self {
        Self {
            config,
            reader,
            ocr,
            store,
        }
    }

    /// Production wiring: create the directory layout, bind pdfium, use the
    /// `tesseract` binary and open the SQLite store (schema included).
    ///
    /// Whether tesseract can be started is not checked here; long-running
    /// callers do that once with [`Orchestrator::check_ocr_engine`].
    pub fn from_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.ensure_directories()?;
        let reader = PdfiumReader::bind(&config)?;
        let ocr = TesseractOcr::new(config.ocr_language.clone());
        let store = SqliteStore::open(&config.db_path)?;
        Ok(Self::new(
            config,
            Box::new(reader),
            Box::new(ocr),
            Box::new(store),
        ))
    }

    /// Warn when the production OCR engine cannot be started. Returns whether
    /// it is available.
    pub fn check_ocr_engine(config: &PipelineConfig) -> bool {
        TesseractOcr::new(config.ocr_language.clone()).check()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// Process every matching file in the input directory.
    pub fn run(&self) -> Result<BatchReport, PipelineError> {
        let paths = source::scan_directory(&self.config.input_dir, &self.config.extension)?;
        if paths.is_empty() {
            return Err(PipelineError::EmptyInput(format!(
                "no .{} files in {}",
                self.config.extension,
                self.config.input_dir.display()
            )));
        }
        self.process_batch(&paths)
    }

    /// Process `paths` in order. A failing document is recorded in the report
    /// and never stops the batch.
    pub fn process_batch(&self, paths: &[PathBuf]) -> Result<BatchReport, PipelineError> {
        if paths.is_empty() {
            return Err(PipelineError::EmptyInput("empty batch".into()));
        }

        let start = Instant::now();
        let total = paths.len();
        info!("Starting batch of {} documents", total);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_start(total);
        }

        let mut report = BatchReport::default();
        for (index, path) in paths.iter().enumerate() {
            let filename = source::file_name(path);
            if let Some(ref cb) = self.config.progress_callback {
                cb.on_document_start(&filename, index + 1, total);
            }

            match self.process_document(path) {
                Ok(doc) => {
                    if let Some(ref cb) = self.config.progress_callback {
                        cb.on_document_complete(&filename, doc.selectable_pages, doc.ocr_pages);
                    }
                    report.processed.push(doc);
                }
                Err(e) => {
                    warn!("Skipping {} ({:?}): {}", filename, e.kind(), e);
                    if let Some(ref cb) = self.config.progress_callback {
                        cb.on_document_error(&filename, &e.to_string());
                    }
                    report.failed.push(DocumentFailure {
                        filename,
                        error: e.to_string(),
                    });
                }
            }
        }

        report.total_duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Batch complete: {} processed, {} failed in {}ms",
            report.processed.len(),
            report.failed.len(),
            report.total_duration_ms
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_complete(report.processed.len(), report.failed.len());
        }
        Ok(report)
    }

    /// Extract metadata, selectable text and OCR text for one document and
    /// persist them.
    pub fn process_document(&self, path: &Path) -> Result<DocumentReport, PipelineError> {
        let start = Instant::now();

        // ── Step 1: Resolve and open ─────────────────────────────────────────
        let path = source::resolve_local(path)?;
        let filename = source::file_name(&path);
        let stem = file_stem(&path);
        info!("Processing {}", filename);

        let handle = self.reader.open(&path)?;
        let page_count = handle.page_count();

        // ── Step 2: Metadata ─────────────────────────────────────────────────
        let meta = metadata::extract(handle.as_ref(), &filename);
        let document_id = self
            .store
            .upsert_metadata(&meta)
            .inspect_err(|e| error!("Storing metadata for {} failed: {}", filename, e))?;
        if self.config.write_metadata_json {
            files::write_metadata(&self.config.metadata_dir, &stem, &meta)?;
        }

        // ── Step 3: Selectable text ──────────────────────────────────────────
        let selectable = self.read_selectable(handle.as_ref(), &filename);
        let selectable_pages =
            self.persist_pages(document_id, PageKind::Selectable, &selectable, &filename)?;
        if self.config.write_text_files {
            files::write_page_texts(
                &self.config.selectable_text_dir,
                &stem,
                &selectable,
                self.config.text_layout,
            )?;
        }

        // ── Step 4: OCR ──────────────────────────────────────────────────────
        let ocr = self.read_ocr(handle.as_ref(), &filename)?;
        let ocr_pages = self.persist_pages(document_id, PageKind::Ocr, &ocr, &filename)?;
        if self.config.write_text_files {
            files::write_page_texts(
                &self.config.ocr_text_dir,
                &stem,
                &ocr,
                self.config.text_layout,
            )?;
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "{}: {} pages, {} selectable, {} OCR in {}ms",
            filename, page_count, selectable_pages, ocr_pages, duration_ms
        );

        Ok(DocumentReport {
            filename,
            document_id,
            page_count,
            selectable_pages,
            ocr_pages,
            duration_ms,
        })
    }

    /// Extract the metadata record of one document, store it (insert if
    /// absent) and write its JSON file when enabled.
    pub fn extract_metadata(&self, path: &Path) -> Result<DocumentMetadata, PipelineError> {
        let path = source::resolve_local(path)?;
        let filename = source::file_name(&path);
        let handle = self.reader.open(&path)?;

        let meta = metadata::extract(handle.as_ref(), &filename);
        self.store.upsert_metadata(&meta)?;
        if self.config.write_metadata_json {
            files::write_metadata(&self.config.metadata_dir, &file_stem(&path), &meta)?;
        }
        Ok(meta)
    }

    /// Selectable text of every page, empty pages included. Nothing is stored.
    pub fn extract_text(&self, path: &Path) -> Result<Vec<PageText>, PipelineError> {
        let path = source::resolve_local(path)?;
        let handle = self.reader.open(&path)?;
        Ok(self.read_selectable(handle.as_ref(), &source::file_name(&path)))
    }

    /// OCR text of every page, empty pages included. Nothing is stored.
    pub fn extract_ocr(&self, path: &Path) -> Result<Vec<PageText>, PipelineError> {
        let path = source::resolve_local(path)?;
        let handle = self.reader.open(&path)?;
        self.read_ocr(handle.as_ref(), &source::file_name(&path))
    }

    /// Page count, metadata and text-layer coverage, without storing anything.
    pub fn inspect(&self, path: &Path) -> Result<DocumentInfo, PipelineError> {
        let path = source::resolve_local(path)?;
        let filename = source::file_name(&path);
        let handle = self.reader.open(&path)?;

        let text_pages = self
            .read_selectable(handle.as_ref(), &filename)
            .iter()
            .filter(|p| !p.text.trim().is_empty())
            .count();

        Ok(DocumentInfo {
            metadata: metadata::extract(handle.as_ref(), &filename),
            page_count: handle.page_count(),
            text_pages,
            file_size_bytes: std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0),
        })
    }

    fn read_selectable(&self, handle: &dyn DocumentHandle, filename: &str) -> Vec<PageText> {
        (0..handle.page_count())
            .map(|index| {
                let text = handle.page_text(index).unwrap_or_else(|e| {
                    warn!("{}: {}", filename, e);
                    String::new()
                });
                let encoding = if text.trim().is_empty() {
                    None
                } else {
                    Some(encoding::detect_label(&text))
                };
                debug!("{} page {}: {} chars selectable", filename, index + 1, text.len());
                PageText {
                    page_num: index + 1,
                    kind: PageKind::Selectable,
                    text,
                    encoding,
                }
            })
            .collect()
    }

    fn read_ocr(
        &self,
        handle: &dyn DocumentHandle,
        filename: &str,
    ) -> Result<Vec<PageText>, PipelineError> {
        let mut pages = Vec::with_capacity(handle.page_count());
        for index in 0..handle.page_count() {
            let recognised = handle
                .page_image(index)
                .and_then(|image| self.ocr.recognize(&image));
            let text = match recognised {
                Ok(text) => text,
                // Engine missing: abandon the document.
                Err(e @ PipelineError::OcrUnavailable(_)) => return Err(e),
                Err(e) => {
                    warn!("{} page {}: {}", filename, index + 1, e);
                    String::new()
                }
            };
            debug!("{} page {}: {} chars OCR", filename, index + 1, text.len());
            pages.push(PageText {
                page_num: index + 1,
                kind: PageKind::Ocr,
                text,
                encoding: None,
            });
        }
        Ok(pages)
    }

    /// Store the non-empty pages of one kind per the configured policy.
    /// Returns how many were stored.
    fn persist_pages(
        &self,
        document_id: DocumentId,
        kind: PageKind,
        pages: &[PageText],
        filename: &str,
    ) -> Result<usize, PipelineError> {
        let non_empty: Vec<PageText> = pages
            .iter()
            .filter(|p| !p.text.trim().is_empty())
            .cloned()
            .collect();

        let stored = match self.config.page_policy {
            PageWritePolicy::Replace => self
                .store
                .replace_pages(document_id, kind, &non_empty)
                .map(|_| ()),
            PageWritePolicy::Append => non_empty
                .iter()
                .try_for_each(|page| self.store.insert_page(document_id, page)),
        };
        stored.inspect_err(|e| error!("Storing {} pages for {} failed: {}", kind, filename, e))?;

        debug!("{}: stored {} {} pages", filename, non_empty.len(), kind);
        Ok(non_empty.len())
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}
