//! Configuration types for the extraction pipeline.
//!
//! Everything the pipeline needs to know about its environment lives in
//! [`PipelineConfig`]: where input PDFs are found, where each kind of output
//! goes, how pages are rasterised for OCR, and how re-runs treat existing
//! page rows. The config is built once and passed into
//! [`crate::orchestrator::Orchestrator`]; nothing reads global state.

use crate::error::PipelineError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration for an extraction run.
///
/// Built via [`PipelineConfig::builder()`] or [`PipelineConfig::with_root()`].
///
/// # Example
/// ```rust
/// use pdfsift::{PageWritePolicy, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .root("/srv/pdfsift")
///     .dpi(300)
///     .page_policy(PageWritePolicy::Append)
///     .build()
///     .unwrap();
/// assert!(config.input_dir.ends_with("input"));
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Directory scanned for input documents and where uploads are stored.
    pub input_dir: PathBuf,

    /// Directory for selectable-text output files.
    pub selectable_text_dir: PathBuf,

    /// Directory for OCR-text output files.
    pub ocr_text_dir: PathBuf,

    /// Directory for per-document metadata JSON files.
    pub metadata_dir: PathBuf,

    /// Directory for the daily-rotated log files.
    pub log_dir: PathBuf,

    /// SQLite database file.
    pub db_path: PathBuf,

    /// File extension (without the dot) matched when scanning `input_dir`.
    /// Matching is case-insensitive. Default: `pdf`.
    pub extension: String,

    /// Rendering DPI used when rasterising a page for OCR. Range: 72–600. Default: 300.
    ///
    /// Tesseract is trained on roughly 300 DPI scans; much lower and small
    /// print drops out, much higher and recognition slows without gaining accuracy.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 5000.
    ///
    /// Caps memory for oversized pages (posters, engineering drawings)
    /// independently of DPI.
    pub max_rendered_pixels: u32,

    /// Tesseract language code(s), e.g. `eng` or `eng+deu`. Default: `eng`.
    pub ocr_language: String,

    /// Directory containing libpdfium. If None, the working directory and
    /// then the system library path are tried.
    pub pdfium_lib_dir: Option<PathBuf>,

    /// How re-running extraction treats existing page rows. Default: Replace.
    pub page_policy: PageWritePolicy,

    /// Write selectable/OCR text files next to the database. Default: true.
    pub write_text_files: bool,

    /// Write `<stem>_metadata.json` files. Default: true.
    pub write_metadata_json: bool,

    /// One text file per document or one per page. Default: per document.
    pub text_layout: TextFileLayout,

    /// Maximum accepted upload size in bytes for the HTTP API. Default: 64 MiB.
    pub max_upload_bytes: usize,

    /// Optional progress callback for per-document events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::with_root(".")
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("input_dir", &self.input_dir)
            .field("selectable_text_dir", &self.selectable_text_dir)
            .field("ocr_text_dir", &self.ocr_text_dir)
            .field("metadata_dir", &self.metadata_dir)
            .field("log_dir", &self.log_dir)
            .field("db_path", &self.db_path)
            .field("extension", &self.extension)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("ocr_language", &self.ocr_language)
            .field("pdfium_lib_dir", &self.pdfium_lib_dir)
            .field("page_policy", &self.page_policy)
            .field("write_text_files", &self.write_text_files)
            .field("write_metadata_json", &self.write_metadata_json)
            .field("text_layout", &self.text_layout)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Default layout under a single root directory:
    ///
    /// ```text
    /// root/
    ///   input/
    ///   logs/
    ///   output/
    ///     selectable_text/
    ///     ocr_text/
    ///     metadata/
    ///     documents.db
    /// ```
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let output = root.join("output");
        Self {
            input_dir: root.join("input"),
            selectable_text_dir: output.join("selectable_text"),
            ocr_text_dir: output.join("ocr_text"),
            metadata_dir: output.join("metadata"),
            log_dir: root.join("logs"),
            db_path: output.join("documents.db"),
            extension: "pdf".to_string(),
            dpi: 300,
            max_rendered_pixels: 5000,
            ocr_language: "eng".to_string(),
            pdfium_lib_dir: None,
            page_policy: PageWritePolicy::default(),
            write_text_files: true,
            write_metadata_json: true,
            text_layout: TextFileLayout::default(),
            max_upload_bytes: 64 * 1024 * 1024,
            progress_callback: None,
        }
    }

    /// Create every directory the pipeline writes to.
    ///
    /// Failure here is the one unrecoverable startup condition.
    pub fn ensure_directories(&self) -> Result<(), PipelineError> {
        let db_parent = self.db_path.parent().filter(|p| !p.as_os_str().is_empty());
        let dirs = [
            Some(self.input_dir.as_path()),
            Some(self.selectable_text_dir.as_path()),
            Some(self.ocr_text_dir.as_path()),
            Some(self.metadata_dir.as_path()),
            Some(self.log_dir.as_path()),
            db_parent,
        ];
        for dir in dirs.into_iter().flatten() {
            std::fs::create_dir_all(dir).map_err(|source| {
                PipelineError::DirectoryCreateFailed {
                    path: dir.to_path_buf(),
                    source,
                }
            })?;
            debug!("Ensured directory {}", dir.display());
        }
        Ok(())
    }
}

/// Builder for [`PipelineConfig`].
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl fmt::Debug for PipelineConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl PipelineConfigBuilder {
    /// Reset every directory to the default layout under `root`,
    /// keeping all non-path settings.
    pub fn root(mut self, root: impl AsRef<Path>) -> Self {
        let laid_out = PipelineConfig::with_root(root);
        self.config.input_dir = laid_out.input_dir;
        self.config.selectable_text_dir = laid_out.selectable_text_dir;
        self.config.ocr_text_dir = laid_out.ocr_text_dir;
        self.config.metadata_dir = laid_out.metadata_dir;
        self.config.log_dir = laid_out.log_dir;
        self.config.db_path = laid_out.db_path;
        self
    }

    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn selectable_text_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.selectable_text_dir = dir.into();
        self
    }

    pub fn ocr_text_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.ocr_text_dir = dir.into();
        self
    }

    pub fn metadata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.metadata_dir = dir.into();
        self
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.db_path = path.into();
        self
    }

    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        self.config.extension = ext.into().trim_start_matches('.').to_string();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn pdfium_lib_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_dir = Some(dir.into());
        self
    }

    pub fn page_policy(mut self, policy: PageWritePolicy) -> Self {
        self.config.page_policy = policy;
        self
    }

    pub fn write_text_files(mut self, v: bool) -> Self {
        self.config.write_text_files = v;
        self
    }

    pub fn write_metadata_json(mut self, v: bool) -> Self {
        self.config.write_metadata_json = v;
        self
    }

    pub fn text_layout(mut self, layout: TextFileLayout) -> Self {
        self.config.text_layout = layout;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(PipelineError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.extension.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "Input extension must not be empty".into(),
            ));
        }
        if c.ocr_language.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(PipelineError::InvalidConfig(
                "Upload limit must be > 0 bytes".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// What happens to existing page rows when a document is extracted again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageWritePolicy {
    /// Delete the document's previous rows of the same kind, then insert,
    /// in one transaction. Re-runs are idempotent. (default)
    #[default]
    Replace,
    /// Append rows unconditionally; every re-run duplicates the pages.
    Append,
}

/// How text output files are laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextFileLayout {
    /// `<stem>.txt` with a `-- Page N --` banner before each page. (default)
    #[default]
    PerDocument,
    /// `<stem>_page_<N>.txt`, each starting with its own banner.
    PerPage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_root_lays_out_directories() {
        let c = PipelineConfig::with_root("/data");
        assert_eq!(c.input_dir, PathBuf::from("/data/input"));
        assert_eq!(c.selectable_text_dir, PathBuf::from("/data/output/selectable_text"));
        assert_eq!(c.ocr_text_dir, PathBuf::from("/data/output/ocr_text"));
        assert_eq!(c.db_path, PathBuf::from("/data/output/documents.db"));
        assert_eq!(c.log_dir, PathBuf::from("/data/logs"));
    }

    #[test]
    fn builder_clamps_dpi() {
        let c = PipelineConfig::builder().dpi(10_000).build().unwrap();
        assert_eq!(c.dpi, 600);
        let c = PipelineConfig::builder().dpi(1).build().unwrap();
        assert_eq!(c.dpi, 72);
    }

    #[test]
    fn builder_rejects_empty_extension() {
        let err = PipelineConfig::builder().extension("").build().unwrap_err();
        assert!(err.to_string().contains("extension"), "got: {err}");
    }

    #[test]
    fn extension_strips_leading_dot() {
        let c = PipelineConfig::builder().extension(".PDF").build().unwrap();
        assert_eq!(c.extension, "PDF");
    }

    #[test]
    fn root_keeps_non_path_settings() {
        let c = PipelineConfig::builder()
            .dpi(150)
            .root("/x")
            .build()
            .unwrap();
        assert_eq!(c.dpi, 150);
        assert_eq!(c.input_dir, PathBuf::from("/x/input"));
    }

    #[test]
    fn ensure_directories_creates_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let c = PipelineConfig::with_root(tmp.path());
        c.ensure_directories().unwrap();
        assert!(c.input_dir.is_dir());
        assert!(c.selectable_text_dir.is_dir());
        assert!(c.ocr_text_dir.is_dir());
        assert!(c.metadata_dir.is_dir());
        assert!(c.log_dir.is_dir());
        // idempotent
        c.ensure_directories().unwrap();
    }

    #[test]
    fn default_policy_is_replace() {
        assert_eq!(PipelineConfig::default().page_policy, PageWritePolicy::Replace);
        assert_eq!(PipelineConfig::default().text_layout, TextFileLayout::PerDocument);
    }
}
