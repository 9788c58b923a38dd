//! # pdfsift
//!
//! Extract selectable text, OCR text and metadata from PDF documents, and
//! persist them to text files and a SQLite database.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Source    fixed path, input-directory scan, or HTTP upload
//!  ├─ 2. Reader    open via pdfium: page count, text layer, rasters, info dict
//!  ├─ 3. Metadata  normalise the info dictionary, upsert by filename
//!  ├─ 4. Text      per-page selectable text + encoding detection
//!  ├─ 5. OCR       per-page raster → tesseract
//!  └─ 6. Persist   SQLite rows + text/metadata files
//! ```
//!
//! Selectable text and OCR are independent: a page can yield one, both, or
//! neither. Only pages with non-empty text are stored.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfsift::{Orchestrator, PipelineConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::with_root("./data");
//!     let orchestrator = Orchestrator::from_config(config)?;
//!     let report = orchestrator.run()?;
//!     eprintln!("{} processed, {} failed", report.processed.len(), report.failed.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfsift` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdfsift = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime requirements
//!
//! - libpdfium, found via `PipelineConfig::pdfium_lib_dir`, the working
//!   directory, or the system library path
//! - the `tesseract` binary on `PATH`, with the configured language data

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod server;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PageWritePolicy, PipelineConfig, PipelineConfigBuilder, TextFileLayout};
pub use error::{ErrorKind, PipelineError};
pub use orchestrator::Orchestrator;
pub use output::{
    BatchReport, DocumentFailure, DocumentInfo, DocumentMetadata, DocumentReport, PageKind,
    PageMap, PageText,
};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use server::{create_router, serve, AppState, OrchestratorFactory};
pub use store::{DocumentId, DocumentStore, SqliteStore};
