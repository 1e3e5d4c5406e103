//! Typed API response bodies.
//!
//! Every JSON endpoint answers with a flat object carrying `success`:
//! ```json
//! { "success": true, "task_id": "JPD113:JPD113_SU25" }
//! { "success": false, "error": "Task not found" }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::jobs::Job;
use crate::models::ThreadRecord;

/// Response envelope: `success` plus the payload's fields.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<ApiResponse<T>> {
        Json(ApiResponse {
            success: true,
            data,
        })
    }
}

/// Error payload.
#[derive(Debug, Serialize)]
pub struct ErrorData {
    pub error: String,
    /// Job that caused a conflict, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiResponse {
            success: false,
            data: ErrorData {
                error: message.into(),
                task_id: None,
            },
        }),
    )
        .into_response()
}

pub fn conflict_response(message: impl Into<String>, task_id: String) -> Response {
    (
        StatusCode::CONFLICT,
        Json(ApiResponse {
            success: false,
            data: ErrorData {
                error: message.into(),
                task_id: Some(task_id),
            },
        }),
    )
        .into_response()
}

#[derive(Debug, Serialize)]
pub struct SubmittedData {
    pub task_id: String,
}

#[derive(Debug, Serialize)]
pub struct TaskData {
    pub task: Job,
}

#[derive(Debug, Serialize)]
pub struct TasksData {
    pub tasks: Vec<Job>,
}

/// One archived thread as listed by the browsing endpoints.
#[derive(Debug, Serialize)]
pub struct ThreadSummary {
    pub course_code: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub image_count: usize,
    pub has_pdf: bool,
    pub captured_at: DateTime<Utc>,
}

impl From<ThreadRecord> for ThreadSummary {
    fn from(record: ThreadRecord) -> Self {
        let has_pdf = record.has_document();
        Self {
            course_code: record.archive_key,
            display_name: record.display_name,
            source_url: record.source_url,
            image_count: record.image_count,
            has_pdf,
            captured_at: record.captured_at,
        }
    }
}

/// Threads sharing one archive key.
#[derive(Debug, Serialize)]
pub struct CourseGroup {
    pub course_code: String,
    pub threads: Vec<ThreadSummary>,
}

#[derive(Debug, Serialize)]
pub struct CoursesData {
    pub courses: Vec<CourseGroup>,
}

#[derive(Debug, Serialize)]
pub struct SearchData {
    pub query: String,
    pub total: usize,
    pub results: Vec<CourseGroup>,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsData {
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ThreadImage {
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ThreadImagesData {
    pub course_code: String,
    pub display_name: String,
    pub images: Vec<ThreadImage>,
}

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: &'static str,
    pub active_tasks: usize,
}
