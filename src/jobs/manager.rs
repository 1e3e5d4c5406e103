//! Job submission and the single capture worker.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use super::{Job, JobError, JobRegistry, JobResult, SubmitError};
use crate::browser::{DriverFactory, LaunchOptions, SessionController};
use crate::capture::{capture_references, discover_references, CapturePacing};
use crate::config::{CaptureOptions, CaptureOverrides, Credentials, Settings};
use crate::document::assemble_document;
use crate::identity::ThreadIdentity;
use crate::models::ThreadRecord;
use crate::repository::ThreadStore;
use crate::storage::clear_captures;

/// Owns the job registry and runs captures one at a time.
///
/// Holds a single-permit semaphore: only one browser session exists in the
/// whole process. Jobs for different threads queue behind it in order.
#[derive(Clone)]
pub struct JobManager {
    registry: Arc<JobRegistry>,
    permit: Arc<Semaphore>,
    store: Arc<dyn ThreadStore>,
    drivers: Arc<dyn DriverFactory>,
    settings: Arc<Settings>,
}

/// Everything one run needs, moved into its task.
struct RunRequest {
    id: String,
    url: String,
    identity: ThreadIdentity,
    credentials: Credentials,
    options: CaptureOptions,
}

impl JobManager {
    pub fn new(
        settings: Settings,
        store: Arc<dyn ThreadStore>,
        drivers: Arc<dyn DriverFactory>,
    ) -> Self {
        Self {
            registry: Arc::new(JobRegistry::new()),
            permit: Arc::new(Semaphore::new(1)),
            store,
            drivers,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Validate and enqueue a capture of `url`. Returns the job id at once.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, url: &str, overrides: CaptureOverrides) -> Result<String, SubmitError> {
        let url = url.trim();
        let site = &self.settings.site;
        if !site.owns_url(url) {
            return Err(SubmitError::ForeignSite {
                url: url.to_string(),
                origin: site.origin().to_string(),
            });
        }
        let identity = ThreadIdentity::parse(url)?;

        let credentials = self.settings.credentials.clone().ok_or_else(|| {
            SubmitError::Configuration(
                "forum credentials missing (set FORUM_USERNAME and FORUM_PASSWORD)".to_string(),
            )
        })?;

        if self.permit.is_closed() {
            return Err(SubmitError::ShuttingDown);
        }

        let id = identity.job_id();
        self.registry
            .insert_if_idle(Job::queued(&id, url))
            .map_err(|existing| SubmitError::AlreadyRunning(existing.id))?;
        info!("Queued capture {} for {}", id, url);

        let request = RunRequest {
            id: id.clone(),
            url: url.to_string(),
            identity,
            credentials,
            options: overrides.resolve(&self.settings.capture),
        };

        let manager = self.clone();
        tokio::spawn(async move {
            let job_id = request.id.clone();
            let registry = manager.registry.clone();
            if let Err(e) = tokio::spawn(manager.run(request)).await {
                error!("Capture task for {} aborted: {}", job_id, e);
                registry.fail(&job_id, format!("capture task aborted: {}", e));
            }
        });

        Ok(id)
    }

    /// Current snapshot of a job.
    pub fn status(&self, id: &str) -> Option<Job> {
        self.registry.get(id)
    }

    pub fn list(&self) -> Vec<Job> {
        self.registry.list()
    }

    /// Stop admitting work. Jobs still waiting for the permit end in `error`;
    /// a running capture finishes normally.
    pub fn shutdown(&self) {
        self.permit.close();
    }

    async fn run(self, request: RunRequest) {
        let id = request.id.clone();
        let _permit = match self.permit.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Dropping queued capture {}: shutting down", id);
                self.registry.fail(&id, "shutting down");
                return;
            }
        };

        self.registry.mark_running(&id);
        info!("Starting capture {}", request.identity);

        let mut session = SessionController::new(self.drivers.create(), self.settings.site.clone());
        let outcome = AssertUnwindSafe(self.run_stages(&request, &mut session))
            .catch_unwind()
            .await;
        session.shutdown().await;

        match outcome {
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!("Capture {} panicked: {}", id, reason);
                self.registry
                    .fail(&id, format!("capture stage panicked: {}", reason));
            }
            Ok(Ok(result)) => {
                info!(
                    "Capture {} completed: {} images",
                    id, result.image_count
                );
                self.registry.complete(&id, result);
            }
            Ok(Err(e)) => {
                error!("Capture {} failed: {}", id, e);
                self.registry.fail(&id, e.to_string());
            }
        }
    }

    async fn run_stages(
        &self,
        request: &RunRequest,
        session: &mut SessionController,
    ) -> Result<JobResult, JobError> {
        let options = &request.options;
        let launch = LaunchOptions::new(options.headless, &self.settings.browser);
        session.initialize(&launch).await?;
        session
            .login(
                &request.url,
                &request.credentials,
                options.page_load_timeout(),
                options.element_timeout(),
            )
            .await?;

        let html = session.page_content().await?;
        let references = discover_references(&html, session.site());
        if references.is_empty() {
            return Err(JobError::NoImagesFound);
        }
        let total = references.len();
        self.registry.set_total(&request.id, total);

        let (images_folder, document_path) = self.settings.layout().prepare(&request.identity)?;
        let stale = clear_captures(&images_folder)?;
        if stale > 0 {
            debug!("Removed {} captures from the previous run", stale);
        }

        let pacing = CapturePacing {
            item_delay: options.item_delay(),
            between_items: self.settings.site.item_pacing(),
        };
        let registry = &self.registry;
        let id = &request.id;
        let captured = capture_references(
            session,
            &references,
            &images_folder,
            pacing,
            |current, total| registry.set_progress(id, current, total),
        )
        .await;

        if captured.image_count() == 0 {
            return Err(JobError::NothingCaptured(total));
        }
        if !captured.skipped.is_empty() {
            warn!(
                "{}: skipped images {:?}",
                request.identity, captured.skipped
            );
        }

        let document = assemble_document(&images_folder, &document_path).await?;

        let record = ThreadRecord::captured(
            &request.identity,
            &request.url,
            images_folder.clone(),
            document.clone(),
            captured.image_count(),
        );
        self.store.upsert(&record).await?;

        Ok(JobResult {
            archive_key: request.identity.archive_key.clone(),
            display_name: request.identity.display_name.clone(),
            images_folder,
            document_path: document,
            image_count: captured.image_count(),
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
