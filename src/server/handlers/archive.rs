//! Archive browsing endpoints backed by the thread store.

use std::collections::{BTreeMap, BTreeSet};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::api_types::{
    error_response, ApiResponse, CourseGroup, CoursesData, HealthData, SearchData,
    SuggestionsData, ThreadImage, ThreadImagesData, ThreadSummary,
};
use super::super::AppState;
use crate::models::ThreadRecord;
use crate::storage::list_thread_images;

/// Matches consulted when building suggestions.
const SUGGESTION_SOURCE_LIMIT: usize = 10;
const SUGGESTION_LIMIT: usize = 5;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    #[serde(default)]
    pub query: String,
}

/// Group records by archive key; keys and names sorted.
fn group_by_course(records: Vec<ThreadRecord>) -> Vec<CourseGroup> {
    let mut groups: BTreeMap<String, Vec<ThreadSummary>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.archive_key.clone())
            .or_default()
            .push(ThreadSummary::from(record));
    }
    groups
        .into_iter()
        .map(|(course_code, mut threads)| {
            threads.sort_by(|a, b| a.display_name.cmp(&b.display_name));
            CourseGroup {
                course_code,
                threads,
            }
        })
        .collect()
}

fn store_error(e: impl std::fmt::Display) -> Response {
    tracing::error!("Thread store error: {}", e);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
}

pub async fn list_courses(State(state): State<AppState>) -> Response {
    match state.store.list_all().await {
        Ok(records) => ApiResponse::ok(CoursesData {
            courses: group_by_course(records),
        })
        .into_response(),
        Err(e) => store_error(e),
    }
}

async fn run_search(state: &AppState, query: String) -> Response {
    let query = query.trim().to_string();
    if query.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Search query is required");
    }
    match state.store.search(&query).await {
        Ok(records) => {
            let total = records.len();
            ApiResponse::ok(SearchData {
                query,
                total,
                results: group_by_course(records),
            })
            .into_response()
        }
        Err(e) => store_error(e),
    }
}

pub async fn search_get(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Response {
    run_search(&state, params.q).await
}

pub async fn search_post(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> Response {
    run_search(&state, body.query).await
}

/// Up to five distinct course codes and names from the first matches.
pub async fn search_suggestions(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Response {
    let query = params.q.trim();
    if query.is_empty() {
        return ApiResponse::ok(SuggestionsData {
            suggestions: Vec::new(),
        })
        .into_response();
    }
    match state.store.search(query).await {
        Ok(records) => {
            let mut unique = BTreeSet::new();
            for record in records.into_iter().take(SUGGESTION_SOURCE_LIMIT) {
                unique.insert(record.archive_key);
                unique.insert(record.display_name);
            }
            ApiResponse::ok(SuggestionsData {
                suggestions: unique.into_iter().take(SUGGESTION_LIMIT).collect(),
            })
            .into_response()
        }
        Err(e) => store_error(e),
    }
}

/// Image URLs of one thread, in numeric order.
pub async fn thread_images(
    State(state): State<AppState>,
    Path((course_code, display_name)): Path<(String, String)>,
) -> Response {
    if !is_plain_segment(&course_code) || !is_plain_segment(&display_name) {
        return error_response(StatusCode::NOT_FOUND, "Thread not found");
    }
    let folder = state.layout.images_folder(&course_code, &display_name);
    let images = match list_thread_images(&folder) {
        Ok(images) => images,
        Err(_) => return error_response(StatusCode::NOT_FOUND, "Thread not found"),
    };

    let images = images
        .iter()
        .filter_map(|path| path.file_name()?.to_str().map(str::to_string))
        .map(|filename| ThreadImage {
            url: format!("/api/image/{}/{}/{}", course_code, display_name, filename),
            filename,
        })
        .collect();

    ApiResponse::ok(ThreadImagesData {
        course_code,
        display_name,
        images,
    })
    .into_response()
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    ApiResponse::ok(HealthData {
        status: "ok",
        active_tasks: state.jobs.registry().active_count(),
    })
}

/// A single path component that cannot climb out of its parent.
pub(super) fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && !segment.contains("..")
        && !segment.contains('/')
        && !segment.contains('\\')
}
