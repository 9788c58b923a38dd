//! Progress-callback trait for per-document extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the orchestrator works through a batch. The CLI uses this to
//! drive its progress bar; library callers can forward events anywhere.
//!
//! # Example
//!
//! ```rust
//! use pdfsift::{ExtractionProgressCallback, PipelineConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, filename: &str, selectable: usize, ocr: usize) {
//!         let n = self.done.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{n}: {filename} ({selectable} text pages, {ocr} OCR pages)");
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator as it processes each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before the first document of a batch.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called before a document is opened.
    ///
    /// # Arguments
    /// * `filename`: file name of the document
    /// * `index`:    1-indexed position in the batch
    /// * `total`:    number of documents in the batch
    fn on_document_start(&self, filename: &str, index: usize, total: usize) {
        let _ = (filename, index, total);
    }

    /// Called when a document has been fully processed.
    ///
    /// # Arguments
    /// * `selectable_pages`: pages persisted with selectable text
    /// * `ocr_pages`:        pages persisted with OCR text
    fn on_document_complete(&self, filename: &str, selectable_pages: usize, ocr_pages: usize) {
        let _ = (filename, selectable_pages, ocr_pages);
    }

    /// Called when a document was abandoned; the batch carries on.
    fn on_document_error(&self, filename: &str, error: &str) {
        let _ = (filename, error);
    }

    /// Called once after every document has been attempted.
    fn on_batch_complete(&self, succeeded: usize, failed: usize) {
        let _ = (succeeded, failed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        batch_total: AtomicUsize,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total_documents: usize) {
            self.batch_total.store(total_documents, Ordering::SeqCst);
        }

        fn on_document_start(&self, _filename: &str, _index: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _filename: &str, _selectable: usize, _ocr: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_error(&self, _filename: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_document_start("a.pdf", 1, 2);
        cb.on_document_complete("a.pdf", 3, 0);
        cb.on_document_error("b.pdf", "corrupt");
        cb.on_batch_complete(1, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_batch_start(2);
        tracker.on_document_start("a.pdf", 1, 2);
        tracker.on_document_complete("a.pdf", 1, 1);
        tracker.on_document_start("b.pdf", 2, 2);
        tracker.on_document_error("b.pdf", "store locked");

        assert_eq!(tracker.batch_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }
}
