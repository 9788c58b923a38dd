//! Error types for the pdfsift library.
//!
//! Every failure surfaces as a [`PipelineError`]. The variants are grouped
//! into a small set of [`ErrorKind`]s that decide how far a failure reaches:
//!
//! * `NotFound` / `EmptyInput`: reported straight back to the caller; only
//!   the affected unit of work (one document, one request) is abandoned.
//! * `ParseFailure` / `StoreFailure`: caught per document by the
//!   orchestrator, logged with the filename and operation, and the batch
//!   moves on to the next document.
//! * `Startup`: the pipeline cannot run at all (directories cannot be
//!   created, pdfium cannot be bound, invalid configuration). A missing OCR
//!   engine is classified here too, but it only abandons the document being
//!   read; the process checks for it once when it starts.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    ParseFailure,
    StoreFailure,
    EmptyInput,
    Startup,
    Internal,
}

/// All errors returned by the pdfsift library.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// Nothing to process: an empty batch, an input directory without PDFs,
    /// or an upload without a file.
    #[error("No input: {0}")]
    EmptyInput(String),

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password.
    #[error("PDF '{path}' is encrypted and cannot be opened without a password.")]
    PasswordRequired { path: PathBuf },

    /// pdfium failed to extract the text layer of a page.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// pdfium returned an error while rendering a page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The OCR engine is not installed or cannot be started.
    #[error("OCR engine unavailable: {0}")]
    OcrUnavailable(String),

    /// The OCR engine ran but reported a failure for a page.
    #[error("OCR failed: {0}")]
    OcrFailed(String),

    // ── Store errors ──────────────────────────────────────────────────────
    /// A SQLite operation failed.
    #[error("Store operation '{operation}' failed: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required directory could not be created.
    #[error("Failed to create directory '{path}': {source}")]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Server errors ─────────────────────────────────────────────────────
    /// The HTTP listener could not be bound or stopped with an I/O error.
    #[error("HTTP server on {addr} failed: {source}")]
    ServerFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium next to the binary, install it system-wide, or set\n\
PDFIUM_LIB_PATH to the directory that contains it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Shorthand used by the store: wrap a rusqlite error with the operation name.
    pub(crate) fn store(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| PipelineError::Store { operation, source }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::FileNotFound { .. } | PipelineError::PermissionDenied { .. } => {
                ErrorKind::NotFound
            }
            PipelineError::NotAPdf { .. }
            | PipelineError::CorruptPdf { .. }
            | PipelineError::PasswordRequired { .. }
            | PipelineError::TextExtractionFailed { .. }
            | PipelineError::RasterisationFailed { .. }
            | PipelineError::OcrFailed(_) => ErrorKind::ParseFailure,
            PipelineError::Store { .. } | PipelineError::OutputWriteFailed { .. } => {
                ErrorKind::StoreFailure
            }
            PipelineError::EmptyInput(_) => ErrorKind::EmptyInput,
            PipelineError::OcrUnavailable(_)
            | PipelineError::DirectoryCreateFailed { .. }
            | PipelineError::InvalidConfig(_)
            | PipelineError::ServerFailed { .. }
            | PipelineError::PdfiumBindingFailed(_) => ErrorKind::Startup,
            PipelineError::Internal(_) => ErrorKind::Internal,
        }
    }
}
