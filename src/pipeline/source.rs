//! Document source: turn a fixed path, an input-directory scan, or an
//! uploaded payload into a local PDF file the reader can open.
//!
//! pdfium needs a file-system path, so uploads are written into the input
//! directory before anything else touches them. The `%PDF` magic bytes are
//! checked up front so callers get a meaningful error rather than a pdfium
//! failure deep inside page extraction.

use crate::error::PipelineError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]+").expect("valid regex"));

/// Resolve a local file path, validating existence and PDF magic bytes.
pub fn resolve_local(path: impl AsRef<Path>) -> Result<PathBuf, PipelineError> {
    let path = path.as_ref().to_path_buf();

    if !path.is_file() {
        return Err(PipelineError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(PipelineError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PipelineError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(PipelineError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// Resolve a bare filename against the input directory.
///
/// Anything but a plain file name (`../x.pdf`, `a/b.pdf`) is treated as not
/// found, so callers cannot reach outside `input_dir`.
pub fn resolve_in_dir(input_dir: &Path, filename: &str) -> Result<PathBuf, PipelineError> {
    let candidate = Path::new(filename);
    let is_plain = candidate.file_name().is_some_and(|n| n == candidate.as_os_str());
    if !is_plain {
        return Err(PipelineError::FileNotFound {
            path: input_dir.join(filename),
        });
    }
    resolve_local(input_dir.join(filename))
}

/// List every file in `dir` whose extension matches `extension`
/// (case-insensitive), sorted by name. Subdirectories are not descended.
pub fn scan_directory(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, PipelineError> {
    let entries = std::fs::read_dir(dir).map_err(|_| PipelineError::FileNotFound {
        path: dir.to_path_buf(),
    })?;

    let mut found: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension))
        })
        .collect();
    found.sort();

    info!("Found {} .{} files in {}", found.len(), extension, dir.display());
    Ok(found)
}

/// Reduce a client-supplied file name to a safe single path component.
///
/// Directory parts are dropped, whitespace becomes `_`, and any other
/// character outside `[A-Za-z0-9_.-]` is removed. Leading dots are stripped
/// so the result can never be `.`/`..` or a hidden file. Returns an empty
/// string when nothing usable is left.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or("");
    let spaced: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(&spaced, "");
    cleaned.trim_start_matches('.').to_string()
}

/// Store an uploaded payload under `input_dir`, returning its path.
///
/// The write is atomic (temp file in the same directory + rename) so a
/// concurrent directory scan never sees a half-written PDF.
pub fn save_upload(
    input_dir: &Path,
    filename: &str,
    bytes: &[u8],
) -> Result<PathBuf, PipelineError> {
    let safe = sanitize_filename(filename);
    if safe.is_empty() {
        return Err(PipelineError::EmptyInput(format!(
            "upload file name '{filename}' has no usable characters"
        )));
    }
    let target = input_dir.join(&safe);

    let write_err = |source| PipelineError::OutputWriteFailed {
        path: target.clone(),
        source,
    };
    std::fs::create_dir_all(input_dir).map_err(write_err)?;
    let mut tmp = tempfile::NamedTempFile::new_in(input_dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.persist(&target).map_err(|e| write_err(e.error))?;

    info!("Stored upload {} ({} bytes)", target.display(), bytes.len());
    Ok(target)
}

/// File name component of `path` as a `String`, used as document identity.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let p = dir.join(name);
        std::fs::write(&p, bytes).unwrap();
        p
    }

    #[test]
    fn resolve_missing_is_not_found() {
        let err = resolve_local("/definitely/not/here.pdf").unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound { .. }));
    }

    #[test]
    fn resolve_rejects_non_pdf_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let p = write(tmp.path(), "fake.pdf", b"GIF89a....");
        let err = resolve_local(&p).unwrap_err();
        assert!(matches!(err, PipelineError::NotAPdf { magic, .. } if &magic == b"GIF8"));
    }

    #[test]
    fn resolve_accepts_pdf_magic() {
        let tmp = tempfile::tempdir().unwrap();
        let p = write(tmp.path(), "ok.pdf", b"%PDF-1.7\n...");
        assert_eq!(resolve_local(&p).unwrap(), p);
    }

    #[test]
    fn resolve_in_dir_refuses_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "ok.pdf", b"%PDF-1.4");
        assert!(resolve_in_dir(tmp.path(), "ok.pdf").is_ok());
        assert!(matches!(
            resolve_in_dir(tmp.path(), "../ok.pdf"),
            Err(PipelineError::FileNotFound { .. })
        ));
        assert!(matches!(
            resolve_in_dir(tmp.path(), "sub/ok.pdf"),
            Err(PipelineError::FileNotFound { .. })
        ));
    }

    #[test]
    fn scan_filters_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "b.pdf", b"%PDF");
        write(tmp.path(), "a.PDF", b"%PDF");
        write(tmp.path(), "notes.txt", b"x");
        std::fs::create_dir(tmp.path().join("dir.pdf")).unwrap();

        let found = scan_directory(tmp.path(), "pdf").unwrap();
        let names: Vec<String> = found.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
    }

    #[test]
    fn scan_missing_dir_is_not_found() {
        let err = scan_directory(Path::new("/no/such/dir"), "pdf").unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound { .. }));
    }

    #[test]
    fn sanitize_strips_directories_and_junk() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\My Report.pdf"), "My_Report.pdf");
        assert_eq!(sanitize_filename("..hidden.pdf"), "hidden.pdf");
        assert_eq!(sanitize_filename("résumé 2024.pdf"), "rsum_2024.pdf");
        assert_eq!(sanitize_filename("///"), "");
    }

    #[test]
    fn save_upload_writes_sanitised_name() {
        let tmp = tempfile::tempdir().unwrap();
        let path = save_upload(tmp.path(), "../evil name.pdf", b"%PDF-1.4").unwrap();
        assert_eq!(path, tmp.path().join("evil_name.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn save_upload_rejects_unusable_name() {
        let tmp = tempfile::tempdir().unwrap();
        let err = save_upload(tmp.path(), "...", b"%PDF").unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput(_)));
    }
}
