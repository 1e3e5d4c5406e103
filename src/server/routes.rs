//! Router configuration for the web server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Capture jobs
        .route("/api/scrape", post(handlers::submit_scrape))
        .route("/api/scrape/status/:task_id", get(handlers::scrape_status))
        .route("/api/scrape/tasks", get(handlers::list_tasks))
        // Archive browsing
        .route("/api/courses", get(handlers::list_courses))
        .route(
            "/api/search",
            get(handlers::search_get).post(handlers::search_post),
        )
        .route("/api/search/suggestions", get(handlers::search_suggestions))
        .route(
            "/api/thread/:course_code/:display_name/images",
            get(handlers::thread_images),
        )
        // get() also answers HEAD
        .route(
            "/api/thread/:course_code/:display_name/pdf",
            get(handlers::serve_pdf),
        )
        .route(
            "/api/image/:course_code/:display_name/:filename",
            get(handlers::serve_image),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
