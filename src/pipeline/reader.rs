//! Page reader: open a PDF and expose page count, per-page selectable text,
//! per-page raster images and the document information dictionary.
//!
//! The [`PageReader`] / [`DocumentHandle`] pair is the seam between the
//! orchestrator and pdfium. Tests substitute an in-memory implementation;
//! production uses [`PdfiumReader`].
//!
//! pdfium keeps thread-local state and is not async-safe, so every caller in
//! this crate drives a reader from a blocking context (the CLI thread, or
//! `spawn_blocking` inside the HTTP server).

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Fields of the PDF document-information dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoField {
    Title,
    Author,
    Subject,
    Keywords,
    Creator,
    Producer,
    CreationDate,
    ModificationDate,
}

/// Opens documents.
pub trait PageReader {
    /// Open `path`. Fails with `FileNotFound` when it is absent and with a
    /// parse error (`CorruptPdf`, `PasswordRequired`) when it cannot be parsed.
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn DocumentHandle + 'a>, PipelineError>;
}

/// An open document.
pub trait DocumentHandle {
    fn page_count(&self) -> usize;

    /// Embedded text of the page at 0-based `index`. An empty string means
    /// the page has no text layer (typically a scan); it is not an error.
    fn page_text(&self, index: usize) -> Result<String, PipelineError>;

    /// Rasterise the page at 0-based `index`.
    fn page_image(&self, index: usize) -> Result<DynamicImage, PipelineError>;

    /// Raw value of an information-dictionary field, `None` when absent or empty.
    fn info(&self, field: InfoField) -> Option<String>;
}

/// [`PageReader`] backed by pdfium.
pub struct PdfiumReader {
    pdfium: Pdfium,
    dpi: u32,
    max_rendered_pixels: u32,
}

impl PdfiumReader {
    /// Bind to libpdfium.
    ///
    /// Lookup order: `config.pdfium_lib_dir`, else the working directory,
    /// else the system library search path.
    pub fn bind(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let bindings = match config.pdfium_lib_dir.as_deref() {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| PipelineError::PdfiumBindingFailed(format!("{:?}", e)))?;

        debug!("Bound pdfium library");
        Ok(Self {
            pdfium: Pdfium::new(bindings),
            dpi: config.dpi,
            max_rendered_pixels: config.max_rendered_pixels,
        })
    }
}

impl PageReader for PdfiumReader {
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn DocumentHandle + 'a>, PipelineError> {
        if !path.is_file() {
            return Err(PipelineError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let document = self.pdfium.load_pdf_from_file(path, None).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                PipelineError::PasswordRequired {
                    path: path.to_path_buf(),
                }
            } else {
                PipelineError::CorruptPdf {
                    path: path.to_path_buf(),
                    detail: err_str,
                }
            }
        })?;

        let page_count = document.pages().len() as usize;
        info!("PDF loaded: {} ({} pages)", path.display(), page_count);

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(self.dpi as f32 / 72.0)
            .set_maximum_width(self.max_rendered_pixels as i32)
            .set_maximum_height(self.max_rendered_pixels as i32);

        Ok(Box::new(PdfiumDocument {
            document,
            page_count,
            render_config,
        }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
    page_count: usize,
    render_config: PdfRenderConfig,
}

impl PdfiumDocument<'_> {
    fn page(&self, index: usize) -> Result<PdfPage<'_>, String> {
        let idx = index
            .try_into()
            .map_err(|_| format!("page index {} exceeds pdfium range", index))?;
        self.document
            .pages()
            .get(idx)
            .map_err(|e| format!("{:?}", e))
    }
}

impl DocumentHandle for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_text(&self, index: usize) -> Result<String, PipelineError> {
        let failed = |detail| PipelineError::TextExtractionFailed {
            page: index + 1,
            detail,
        };
        let page = self.page(index).map_err(failed)?;
        let text = page.text().map_err(|e| failed(format!("{:?}", e)))?;
        Ok(text.all())
    }

    fn page_image(&self, index: usize) -> Result<DynamicImage, PipelineError> {
        let failed = |detail| PipelineError::RasterisationFailed {
            page: index + 1,
            detail,
        };
        let page = self.page(index).map_err(failed)?;
        let bitmap = page
            .render_with_config(&self.render_config)
            .map_err(|e| failed(format!("{:?}", e)))?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );
        Ok(image)
    }

    fn info(&self, field: InfoField) -> Option<String> {
        let tag = match field {
            InfoField::Title => PdfDocumentMetadataTagType::Title,
            InfoField::Author => PdfDocumentMetadataTagType::Author,
            InfoField::Subject => PdfDocumentMetadataTagType::Subject,
            InfoField::Keywords => PdfDocumentMetadataTagType::Keywords,
            InfoField::Creator => PdfDocumentMetadataTagType::Creator,
            InfoField::Producer => PdfDocumentMetadataTagType::Producer,
            InfoField::CreationDate => PdfDocumentMetadataTagType::CreationDate,
            InfoField::ModificationDate => PdfDocumentMetadataTagType::ModificationDate,
        };
        self.document.metadata().get(tag).and_then(|t| {
            let v = t.value().trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    }
}
