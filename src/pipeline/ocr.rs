//! OCR stage: recognise text in a rasterised page.
//!
//! The production backend shells out to the `tesseract` binary. The page is
//! written as a lossless PNG into a private temp directory first.

use crate::error::PipelineError;
use image::{DynamicImage, ImageFormat};
use std::path::Path;
use std::process::Command;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, warn};

/// Turns a page raster into text.
pub trait OcrExtractor {
    /// Recognise the text on `image`, trimmed of surrounding whitespace.
    /// An empty string means nothing was found and is not an error.
    fn recognize(&self, image: &DynamicImage) -> Result<String, PipelineError>;
}

/// [`OcrExtractor`] backed by the Tesseract command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    language: String,
    binary: String,
}

impl TesseractOcr {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            binary: "tesseract".to_string(),
        }
    }

    /// Use a specific executable instead of `tesseract` from `PATH`.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Whether the executable can be started at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// [`Self::is_available`], logging a warning when it is not.
    pub fn check(&self) -> bool {
        let available = self.is_available();
        if !available {
            warn!("{} cannot be started; OCR will fail for every page", self.binary);
        }
        available
    }

    fn run(&self, image_path: &Path) -> Result<String, PipelineError> {
        let output = Command::new(&self.binary)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .output();

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(PipelineError::OcrFailed(format!(
                    "{} exited with {}: {}",
                    self.binary,
                    output.status,
                    stderr.trim()
                )))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(PipelineError::OcrUnavailable(
                format!("{} not found (install tesseract-ocr)", self.binary),
            )),
            Err(e) => Err(PipelineError::OcrUnavailable(format!(
                "failed to start {}: {}",
                self.binary, e
            ))),
        }
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("eng")
    }
}

impl OcrExtractor for TesseractOcr {
    fn recognize(&self, image: &DynamicImage) -> Result<String, PipelineError> {
        let start = Instant::now();

        let temp_dir = TempDir::new()
            .map_err(|e| PipelineError::Internal(format!("OCR temp dir: {}", e)))?;
        let image_path = temp_dir.path().join("page.png");
        image
            .save_with_format(&image_path, ImageFormat::Png)
            .map_err(|e| PipelineError::OcrFailed(format!("PNG encoding failed: {}", e)))?;

        let text = self.run(&image_path)?;
        debug!(
            "Tesseract recognised {} chars from {}x{} px in {}ms",
            text.trim().len(),
            image.width(),
            image.height(),
            start.elapsed().as_millis()
        );
        Ok(text.trim().to_string())
    }
}
