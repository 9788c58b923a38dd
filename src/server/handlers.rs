//! Request handlers. Every response body is JSON; errors are
//! `{"error": "..."}` with 400, 404 or 500.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{info, warn};

use super::AppState;
use crate::error::{ErrorKind, PipelineError};
use crate::output::PageMap;
use crate::pipeline::source;

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn failure_response(e: &PipelineError) -> Response {
    match e.kind() {
        ErrorKind::NotFound => error_response(StatusCode::NOT_FOUND, "File not found"),
        ErrorKind::EmptyInput => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        _ => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Store an uploaded PDF and extract its metadata.
///
/// Metadata failures do not fail the upload: the reply is still 200, with
/// `"metadata": null` and the error message. A request that is not
/// `multipart/form-data` at all is treated like one without a file.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(e) => {
            warn!("Upload rejected: {}", e.body_text());
            return error_response(StatusCode::BAD_REQUEST, "No file provided");
        }
    };
    let mut upload = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_response(e.status(), e.body_text()),
        };
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        match field.bytes().await {
            Ok(bytes) => upload = Some((name, bytes)),
            Err(e) => return error_response(e.status(), e.body_text()),
        }
        break;
    }

    let Some((name, bytes)) = upload else {
        return error_response(StatusCode::BAD_REQUEST, "No file provided");
    };
    if name.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No selected file");
    }

    let path = match source::save_upload(&state.config.input_dir, &name, &bytes) {
        Ok(path) => path,
        Err(PipelineError::EmptyInput(_)) => {
            return error_response(StatusCode::BAD_REQUEST, "No selected file");
        }
        Err(e) => {
            warn!("Saving upload {} failed: {}", name, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };
    let filename = source::file_name(&path);
    info!("Uploaded {} ({} bytes)", filename, bytes.len());

    match state.run_blocking(move |o| o.extract_metadata(&path)).await {
        Ok(metadata) => Json(json!({
            "message": "File uploaded successfully",
            "filename": filename,
            "metadata": metadata,
        }))
        .into_response(),
        Err(e) => {
            warn!("Metadata extraction for {} failed: {}", filename, e);
            Json(json!({
                "message": "File uploaded, metadata extraction failed",
                "filename": filename,
                "metadata": null,
                "error": e.to_string(),
            }))
            .into_response()
        }
    }
}

/// Metadata record of a file in the input directory.
pub async fn get_metadata(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    let path = match source::resolve_in_dir(&state.config.input_dir, &filename) {
        Ok(path) => path,
        Err(e) => return failure_response(&e),
    };
    match state.run_blocking(move |o| o.extract_metadata(&path)).await {
        Ok(metadata) => Json(metadata).into_response(),
        Err(e) => {
            warn!("GET /metadata/{} failed: {}", filename, e);
            failure_response(&e)
        }
    }
}

/// Selectable text of every page.
pub async fn get_selectable_text(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    let path = match source::resolve_in_dir(&state.config.input_dir, &filename) {
        Ok(path) => path,
        Err(e) => return failure_response(&e),
    };
    match state.run_blocking(move |o| o.extract_text(&path)).await {
        Ok(pages) => Json(PageMap(&pages)).into_response(),
        Err(e) => {
            warn!("GET /extract/{} failed: {}", filename, e);
            failure_response(&e)
        }
    }
}

/// OCR text of every page.
pub async fn get_ocr_text(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    let path = match source::resolve_in_dir(&state.config.input_dir, &filename) {
        Ok(path) => path,
        Err(e) => return failure_response(&e),
    };
    match state.run_blocking(move |o| o.extract_ocr(&path)).await {
        Ok(pages) => Json(PageMap(&pages)).into_response(),
        Err(e) => {
            warn!("GET /ocr/{} failed: {}", filename, e);
            failure_response(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn error_kinds_map_to_status_codes() {
        let not_found = PipelineError::FileNotFound {
            path: PathBuf::from("input/x.pdf"),
        };
        assert_eq!(failure_response(&not_found).status(), StatusCode::NOT_FOUND);

        let empty = PipelineError::EmptyInput("no file".into());
        assert_eq!(failure_response(&empty).status(), StatusCode::BAD_REQUEST);

        let corrupt = PipelineError::CorruptPdf {
            path: PathBuf::from("x.pdf"),
            detail: "xref".into(),
        };
        assert_eq!(
            failure_response(&corrupt).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
