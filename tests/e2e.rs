//! End-to-end tests against real pdfium and tesseract.
//!
//! These tests use real PDF files in `./test_cases/` and need libpdfium plus
//! the `tesseract` binary. They are gated behind the `E2E_ENABLED`
//! environment variable so they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=. cargo test --test e2e -- --nocapture

use pdfsift::{DocumentStore, Orchestrator, PageKind, PipelineConfig};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Copy `pdf` into a fresh root's input directory and build a real orchestrator.
fn orchestrator_with(pdf: &PathBuf) -> (Orchestrator, PathBuf, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut builder = PipelineConfig::builder().root(dir.path()).dpi(200);
    if let Ok(lib) = std::env::var("PDFIUM_LIB_PATH") {
        builder = builder.pdfium_lib_dir(lib);
    }
    let config = builder.build().unwrap();
    config.ensure_directories().unwrap();

    let target = config.input_dir.join(pdf.file_name().unwrap());
    std::fs::copy(pdf, &target).unwrap();

    let orchestrator = Orchestrator::from_config(config).expect("pdfium must be bindable");
    (orchestrator, target, dir)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn e2e_inspect_sample() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));
    let (orchestrator, path, _dir) = orchestrator_with(&pdf);

    let info = orchestrator.inspect(&path).unwrap();
    println!("{}", serde_json::to_string_pretty(&info).unwrap());
    assert!(info.page_count > 0);
    assert_eq!(info.metadata.filename, "sample.pdf");
    assert!(info.text_pages <= info.page_count);
}

#[test]
fn e2e_process_sample() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));
    let (orchestrator, path, dir) = orchestrator_with(&pdf);

    let report = orchestrator.process_document(&path).unwrap();
    println!(
        "{} pages: {} selectable, {} OCR in {}ms",
        report.page_count, report.selectable_pages, report.ocr_pages, report.duration_ms
    );
    assert!(report.selectable_pages + report.ocr_pages > 0, "no text at all");

    let store = orchestrator.store();
    let id = store.lookup_document_id("sample.pdf").unwrap().unwrap();
    let selectable = store.pages(id, PageKind::Selectable).unwrap();
    assert_eq!(selectable.len(), report.selectable_pages);
    assert!(selectable.iter().all(|p| p.encoding.is_some()));
    assert_eq!(store.pages(id, PageKind::Ocr).unwrap().len(), report.ocr_pages);

    let metadata_json = dir.path().join("output/metadata/sample_metadata.json");
    assert!(metadata_json.is_file());
}

#[test]
fn e2e_scanned_document_yields_ocr_text() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("scanned.pdf"));
    let (orchestrator, path, _dir) = orchestrator_with(&pdf);

    let ocr = orchestrator.extract_ocr(&path).unwrap();
    let chars: usize = ocr.iter().map(|p| p.text.len()).sum();
    println!("OCR: {} pages, {} chars", ocr.len(), chars);
    assert!(chars > 0, "tesseract recognised nothing");
}
