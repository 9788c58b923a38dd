//! File outputs: page text files and metadata JSON.
//!
//! Text files carry a `-- Page N --` banner before each page. Selectable text
//! is written in the encoding chosen by [`crate::pipeline::encoding`]; OCR
//! text is always UTF-8. Every file is written to a `.tmp` sibling first and
//! renamed into place, so a crash never leaves a truncated output behind.

use crate::config::TextFileLayout;
use crate::error::PipelineError;
use crate::output::{DocumentMetadata, PageKind, PageText};
use crate::pipeline::encoding;
use encoding_rs::{Encoding, UTF_8};
use std::path::{Path, PathBuf};
use tracing::debug;

/// `-- Page N --` banner line.
pub fn banner(page_num: usize) -> String {
    format!("-- Page {} --", page_num)
}

/// Render pages as banner + text blocks.
pub fn render_pages(pages: &[PageText]) -> String {
    pages
        .iter()
        .map(|p| format!("{}\n{}\n", banner(p.page_num), p.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write the text files for one document and kind. Returns the written paths.
///
/// `stem` is the document file name without extension.
pub fn write_page_texts(
    dir: &Path,
    stem: &str,
    pages: &[PageText],
    layout: TextFileLayout,
) -> Result<Vec<PathBuf>, PipelineError> {
    if pages.is_empty() {
        return Ok(Vec::new());
    }
    let kind = pages[0].kind;

    match layout {
        TextFileLayout::PerDocument => {
            let content = render_pages(pages);
            let enc = file_encoding(kind, &content);
            let path = dir.join(format!("{stem}.txt"));
            write_atomic(&path, &encoding::encode(&content, enc))?;
            debug!("Wrote {} ({}, {})", path.display(), kind, enc.name());
            Ok(vec![path])
        }
        TextFileLayout::PerPage => {
            let mut written = Vec::with_capacity(pages.len());
            for page in pages {
                let content = render_pages(std::slice::from_ref(page));
                let enc = file_encoding(kind, &page.text);
                let path = dir.join(format!("{stem}_page_{}.txt", page.page_num));
                write_atomic(&path, &encoding::encode(&content, enc))?;
                written.push(path);
            }
            debug!("Wrote {} {} page files for {}", written.len(), kind, stem);
            Ok(written)
        }
    }
}

/// Write `<stem>_metadata.json`, pretty-printed.
pub fn write_metadata(
    dir: &Path,
    stem: &str,
    metadata: &DocumentMetadata,
) -> Result<PathBuf, PipelineError> {
    let path = dir.join(format!("{stem}_metadata.json"));
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| PipelineError::Internal(format!("metadata serialisation: {e}")))?;
    write_atomic(&path, json.as_bytes())?;
    debug!("Wrote {}", path.display());
    Ok(path)
}

fn file_encoding(kind: PageKind, text: &str) -> &'static Encoding {
    match kind {
        PageKind::Selectable => encoding::detect(text),
        PageKind::Ocr => UTF_8,
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let write_err = |source| PipelineError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, bytes).map_err(write_err)?;
    std::fs::rename(&tmp_path, path).map_err(write_err)?;
    Ok(())
}
