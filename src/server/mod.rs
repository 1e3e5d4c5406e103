//! Web server: capture job API and archive browsing.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::browser::{default_factory, DriverFactory};
use crate::config::Settings;
use crate::jobs::JobManager;
use crate::repository::ThreadStore;
use crate::storage::{sync_from_archive, ArchiveLayout};

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<JobManager>,
    pub store: Arc<dyn ThreadStore>,
    pub layout: ArchiveLayout,
}

impl AppState {
    pub fn new(
        settings: Settings,
        store: Arc<dyn ThreadStore>,
        drivers: Arc<dyn DriverFactory>,
    ) -> Self {
        let layout = settings.layout();
        let jobs = JobManager::new(settings, store.clone(), drivers);
        Self {
            jobs: Arc::new(jobs),
            store,
            layout,
        }
    }
}

/// Start the web server.
///
/// Prepares the archive and database, backfills records for threads already
/// on disk, then serves until Ctrl-C.
pub async fn serve(settings: Settings, host: &str, port: u16) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    let ctx = settings.create_db_context();
    ctx.init_schema().await?;

    let store: Arc<dyn ThreadStore> = Arc::new(ctx.threads());
    let layout = settings.layout();
    match sync_from_archive(&layout, store.as_ref()).await {
        Ok(n) => tracing::info!("Archive sync added {} thread(s)", n),
        Err(e) => tracing::warn!("Archive sync failed: {}", e),
    }

    if settings.credentials.is_none() {
        tracing::warn!("FORUM_USERNAME/FORUM_PASSWORD not set; capture requests will be refused");
    }

    let drivers = default_factory(&settings.browser);
    let state = AppState::new(settings, store, drivers);
    let jobs = state.jobs.clone();
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
            jobs.shutdown();
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use chrono::Utc;
    use std::path::Path;
    use tempfile::tempdir;
    use tower::ServiceExt;

    use crate::browser::{BrowserDriver, DriverError, LaunchOptions};
    use crate::config::Credentials;
    use crate::models::ThreadRecord;
    use crate::repository::DbContext;

    /// Never finishes launching, so submitted jobs stay active.
    struct HangingDriver;

    #[async_trait::async_trait]
    impl BrowserDriver for HangingDriver {
        async fn launch(&mut self, _options: &LaunchOptions) -> Result<(), DriverError> {
            std::future::pending().await
        }
        async fn navigate(&mut self, _: &str, _: std::time::Duration) -> Result<(), DriverError> {
            Err(DriverError::NotLaunched)
        }
        async fn wait_for(&mut self, _: &str, _: std::time::Duration) -> Result<(), DriverError> {
            Err(DriverError::NotLaunched)
        }
        async fn click(&mut self, _: &str) -> Result<(), DriverError> {
            Err(DriverError::NotLaunched)
        }
        async fn type_into(&mut self, _: &str, _: &str) -> Result<(), DriverError> {
            Err(DriverError::NotLaunched)
        }
        async fn content(&mut self) -> Result<String, DriverError> {
            Err(DriverError::NotLaunched)
        }
        async fn open_context(&mut self, _: &str) -> Result<(), DriverError> {
            Err(DriverError::NotLaunched)
        }
        async fn capture_visible(&mut self, _: &Path) -> Result<(), DriverError> {
            Err(DriverError::NotLaunched)
        }
        async fn close_context(&mut self) -> Result<(), DriverError> {
            Ok(())
        }
        async fn quit(&mut self) -> Result<(), DriverError> {
            Ok(())
        }
    }

    struct HangingBrowser;

    impl DriverFactory for HangingBrowser {
        fn create(&self) -> Box<dyn BrowserDriver> {
            Box::new(HangingDriver)
        }
    }

    async fn setup_test_app(with_credentials: bool) -> (axum::Router, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let mut settings = Settings::with_archive_dir(dir.path().join("archive"));
        if with_credentials {
            settings.credentials = Credentials::new("alice", "pw");
        }
        settings.ensure_directories().unwrap();

        let ctx = DbContext::from_sqlite_path(&settings.database_path);
        ctx.init_schema().await.unwrap();

        let state = AppState::new(settings, Arc::new(ctx.threads()), Arc::new(HangingBrowser));
        (create_router(state), dir)
    }

    async fn seed_thread(dir: &Path, key: &str, name: &str, pdf: bool) {
        let layout = ArchiveLayout::new(dir.join("archive"));
        let folder = layout.images_folder(key, name);
        std::fs::create_dir_all(&folder).unwrap();
        for n in [1, 2, 10] {
            std::fs::write(folder.join(format!("{}.jpg", n)), b"jpeg").unwrap();
        }
        let document = layout.document_path(key, name);
        if pdf {
            std::fs::create_dir_all(document.parent().unwrap()).unwrap();
            std::fs::write(&document, b"%PDF-1.4").unwrap();
        }

        let ctx = DbContext::from_sqlite_path(&dir.join("archive/threadvault.db"));
        ctx.threads()
            .upsert(&ThreadRecord {
                archive_key: key.into(),
                display_name: name.into(),
                source_url: None,
                document_path: Some(document),
                images_folder: folder,
                image_count: 3,
                captured_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _dir) = setup_test_app(false).await;
        let (status, json) = send(app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_submit_invalid_url_is_bad_request() {
        let (app, _dir) = setup_test_app(true).await;
        let (status, json) = send(
            app,
            post_json("/api/scrape", serde_json::json!({"url": "https://fuoverflow.com/forums/x/"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_submit_without_credentials_is_unavailable() {
        let (app, _dir) = setup_test_app(false).await;
        let (status, _) = send(
            app,
            post_json(
                "/api/scrape",
                serde_json::json!({"url": "https://fuoverflow.com/threads/jpd113-su25.1/"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_submit_returns_task_id_then_duplicate_conflicts() {
        let (app, _dir) = setup_test_app(true).await;
        let body = serde_json::json!({
            "url": "https://fuoverflow.com/threads/jpd113-su25.1/",
            "item_delay": 0
        });

        let (status, json) = send(app.clone(), post_json("/api/scrape", body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["task_id"], "JPD113:JPD113_SU25");

        let (status, json) = send(app, post_json("/api/scrape", body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["task_id"], "JPD113:JPD113_SU25");
    }

    #[tokio::test]
    async fn test_status_unknown_task() {
        let (app, _dir) = setup_test_app(true).await;
        let (status, json) = send(app, get("/api/scrape/status/NOPE:NOPE")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Task not found");
    }

    #[tokio::test]
    async fn test_status_reports_task() {
        let (app, _dir) = setup_test_app(true).await;
        send(
            app.clone(),
            post_json(
                "/api/scrape",
                serde_json::json!({"url": "https://fuoverflow.com/threads/mas291-fa23.9/"}),
            ),
        )
        .await;

        let (status, json) = send(app, get("/api/scrape/status/MAS291:MAS291_FA23")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["task"]["url"], "https://fuoverflow.com/threads/mas291-fa23.9/");
        assert!(json["task"]["status"].is_string());
    }

    #[tokio::test]
    async fn test_courses_grouped_with_pdf_flag() {
        let (app, dir) = setup_test_app(false).await;
        seed_thread(dir.path(), "JPD113", "JPD113_SU25", true).await;
        seed_thread(dir.path(), "JPD113", "JPD113_FA24", false).await;

        let (status, json) = send(app, get("/api/courses")).await;
        assert_eq!(status, StatusCode::OK);
        let courses = json["courses"].as_array().unwrap();
        assert_eq!(courses.len(), 1);
        let threads = courses[0]["threads"].as_array().unwrap();
        assert_eq!(threads[0]["display_name"], "JPD113_FA24");
        assert_eq!(threads[0]["has_pdf"], false);
        assert_eq!(threads[1]["has_pdf"], true);
    }

    #[tokio::test]
    async fn test_search_get_and_post() {
        let (app, dir) = setup_test_app(false).await;
        seed_thread(dir.path(), "JPD113", "JPD113_SU25", false).await;
        seed_thread(dir.path(), "MAS291", "MAS291_FA23", false).await;

        let (_, json) = send(app.clone(), get("/api/search?q=mas")).await;
        assert_eq!(json["total"], 1);
        assert_eq!(json["results"][0]["course_code"], "MAS291");

        let (_, json) = send(
            app.clone(),
            post_json("/api/search", serde_json::json!({"query": "su25"})),
        )
        .await;
        assert_eq!(json["results"][0]["threads"][0]["display_name"], "JPD113_SU25");

        let (status, _) = send(app, get("/api/search?q=")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_suggestions() {
        let (app, dir) = setup_test_app(false).await;
        seed_thread(dir.path(), "JPD113", "JPD113_SU25", false).await;
        seed_thread(dir.path(), "JPD113", "JPD113_FA24", false).await;

        let (_, json) = send(app, get("/api/search/suggestions?q=jpd")).await;
        let suggestions: Vec<_> = json["suggestions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        assert_eq!(suggestions, vec!["JPD113", "JPD113_FA24", "JPD113_SU25"]);
    }

    #[tokio::test]
    async fn test_thread_images_numeric_order() {
        let (app, dir) = setup_test_app(false).await;
        seed_thread(dir.path(), "JPD113", "JPD113_SU25", false).await;

        let (status, json) = send(app, get("/api/thread/JPD113/JPD113_SU25/images")).await;
        assert_eq!(status, StatusCode::OK);
        let files: Vec<_> = json["images"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["filename"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(files, vec!["1.jpg", "2.jpg", "10.jpg"]);
        assert_eq!(json["images"][0]["url"], "/api/image/JPD113/JPD113_SU25/1.jpg");
    }

    #[tokio::test]
    async fn test_serve_image_and_traversal() {
        let (app, dir) = setup_test_app(false).await;
        seed_thread(dir.path(), "JPD113", "JPD113_SU25", false).await;

        let response = app
            .clone()
            .oneshot(get("/api/image/JPD113/JPD113_SU25/2.jpg"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "image/jpeg");

        let response = app
            .oneshot(get("/api/image/JPD113/..%2F..%2F/threadvault.db"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_pdf_get_and_head() {
        let (app, dir) = setup_test_app(false).await;
        seed_thread(dir.path(), "JPD113", "JPD113_SU25", true).await;

        let response = app
            .clone()
            .oneshot(get("/api/thread/JPD113/JPD113_SU25/pdf"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/pdf");

        let head = Request::builder()
            .method(Method::HEAD)
            .uri("/api/thread/JPD113/JPD113_SU25/pdf")
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.clone().oneshot(head).await.unwrap().status(), StatusCode::OK);

        let missing = app
            .oneshot(get("/api/thread/JPD113/JPD113_NOPE/pdf"))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
