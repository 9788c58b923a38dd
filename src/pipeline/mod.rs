//! Pipeline stages for PDF text, OCR and metadata extraction.
//!
//! Each submodule implements one step. The orchestrator composes them; none
//! of them knows about the store or the HTTP layer.
//!
//! ## Data Flow
//!
//! ```text
//! source ──▶ reader ──┬──▶ metadata ──────────────▶ files (JSON)
//! (path)    (pdfium)  ├──▶ page text ──▶ encoding ──▶ files (.txt)
//!                     └──▶ page image ──▶ ocr ──────▶ files (.txt)
//! ```
//!
//! 1. [`source`]:   validate a local path, scan the input directory, store uploads
//! 2. [`reader`]:   page count, selectable text, rasters and the info dictionary
//! 3. [`metadata`]: normalise the info dictionary into a [`crate::output::DocumentMetadata`]
//! 4. [`encoding`]: pick the encoding selectable text is written in
//! 5. [`ocr`]:      recognise text in a page raster (tesseract)
//! 6. [`files`]:    text and metadata output files

pub mod encoding;
pub mod files;
pub mod metadata;
pub mod ocr;
pub mod reader;
pub mod source;
