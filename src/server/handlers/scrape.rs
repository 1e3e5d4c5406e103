//! Capture job endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::api_types::{
    conflict_response, error_response, ApiResponse, SubmittedData, TaskData, TasksData,
};
use super::super::AppState;
use crate::config::CaptureOverrides;
use crate::jobs::SubmitError;

/// Body of `POST /api/scrape`.
#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
    #[serde(flatten)]
    pub options: CaptureOverrides,
}

/// Queue a capture. Answers immediately with the task id.
pub async fn submit_scrape(
    State(state): State<AppState>,
    Json(request): Json<ScrapeRequest>,
) -> Response {
    match state.jobs.submit(&request.url, request.options) {
        Ok(task_id) => ApiResponse::ok(SubmittedData { task_id }).into_response(),
        Err(SubmitError::AlreadyRunning(task_id)) => conflict_response(
            format!("A capture for {} is already in progress", task_id),
            task_id,
        ),
        Err(e @ (SubmitError::ForeignSite { .. } | SubmitError::InvalidIdentity(_))) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e @ (SubmitError::Configuration(_) | SubmitError::ShuttingDown)) => {
            tracing::warn!("Refusing capture of {}: {}", request.url, e);
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}

pub async fn scrape_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Response {
    match state.jobs.status(&task_id) {
        Some(task) => ApiResponse::ok(TaskData { task }).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Task not found"),
    }
}

/// Every job seen since startup, oldest first.
pub async fn list_tasks(State(state): State<AppState>) -> impl IntoResponse {
    ApiResponse::ok(TasksData {
        tasks: state.jobs.list(),
    })
}
