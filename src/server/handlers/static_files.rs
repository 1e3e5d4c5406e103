//! File serving for archived images and documents.

use std::path::Path as FsPath;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use super::archive::is_plain_segment;
use super::super::AppState;

/// Read `relative` from under `root`, refusing anything that resolves
/// outside it.
async fn serve_under(root: &FsPath, relative: &FsPath) -> Response {
    let canonical_root = match root.canonicalize() {
        Ok(p) => p,
        Err(_) => return (StatusCode::NOT_FOUND, "File not found").into_response(),
    };

    let canonical_file = match root.join(relative).canonicalize() {
        Ok(p) => p,
        Err(_) => return (StatusCode::NOT_FOUND, "File not found").into_response(),
    };

    if !canonical_file.starts_with(&canonical_root) || !canonical_file.is_file() {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    }

    let content = match tokio::fs::read(&canonical_file).await {
        Ok(c) => c,
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read file").into_response();
        }
    };

    let mime = mime_guess::from_path(&canonical_file)
        .first_or_octet_stream()
        .to_string();

    ([(header::CONTENT_TYPE, mime)], content).into_response()
}

/// `GET /api/image/:course/:name/:file`
pub async fn serve_image(
    State(state): State<AppState>,
    Path((course_code, display_name, filename)): Path<(String, String, String)>,
) -> Response {
    if ![&course_code, &display_name, &filename]
        .iter()
        .all(|s| is_plain_segment(s))
    {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    }
    let relative = FsPath::new(&course_code)
        .join(&display_name)
        .join(&filename);
    serve_under(&state.layout.images_root(), &relative).await
}

/// `GET|HEAD /api/thread/:course/:name/pdf`
pub async fn serve_pdf(
    State(state): State<AppState>,
    Path((course_code, display_name)): Path<(String, String)>,
) -> Response {
    if !is_plain_segment(&course_code) || !is_plain_segment(&display_name) {
        return (StatusCode::NOT_FOUND, "PDF not found").into_response();
    }
    let relative = FsPath::new(&course_code).join(format!("{}.pdf", display_name));
    let mut response = serve_under(&state.layout.documents_root(), &relative).await;
    if response.status() == StatusCode::OK {
        let disposition = format!("inline; filename=\"{}.pdf\"", display_name);
        if let Ok(value) = disposition.parse() {
            response
                .headers_mut()
                .insert(header::CONTENT_DISPOSITION, value);
        }
    }
    response
}
