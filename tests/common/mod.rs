//! Shared fixtures: a scripted browser and settings rooted in a temp dir.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use threadvault::browser::{BrowserDriver, DriverError, DriverFactory, LaunchOptions};
use threadvault::config::{Credentials, Settings};
use threadvault::jobs::{Job, JobManager};
use threadvault::repository::{DieselThreadRepository, ThreadStore};

pub const THREAD_URL: &str = "https://fuoverflow.com/threads/jpd113-su25-b5-mc.4934/";

/// What the fake browser saw, shared across every driver a factory creates.
#[derive(Debug, Default)]
pub struct DriverLog {
    pub calls: Vec<String>,
    pub launches: usize,
    pub quits: usize,
    pub captures: usize,
}

/// Behavior of the scripted browser.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Lightbox links rendered on the thread page.
    pub images: usize,
    /// 1-based attachment indices whose screenshot fails.
    pub failing: HashSet<usize>,
    /// Login controls never appear.
    pub login_broken: bool,
    /// Launching the browser fails.
    pub launch_broken: bool,
}

impl Script {
    pub fn with_images(images: usize) -> Self {
        Self {
            images,
            ..Default::default()
        }
    }

    pub fn failing(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.failing.extend(indices);
        self
    }
}

pub struct FakeDriver {
    script: Script,
    log: Arc<Mutex<DriverLog>>,
    context_url: Option<String>,
}

impl FakeDriver {
    fn record(&self, call: impl Into<String>) {
        self.log.lock().unwrap().calls.push(call.into());
    }
}

fn thread_page(images: usize) -> String {
    let mut html = String::from("<html><body><ul class=\"attachmentList\">");
    for i in 1..=images {
        html.push_str(&format!(
            "<li><a class=\"file-preview js-lbImage\" href=\"/attachments/{i}/\">{i}</a></li>"
        ));
    }
    html.push_str("</ul></body></html>");
    html
}

fn attachment_index(url: &str) -> Option<usize> {
    url.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn launch(&mut self, _options: &LaunchOptions) -> Result<(), DriverError> {
        self.record("launch");
        if self.script.launch_broken {
            return Err(DriverError::Launch("no chrome in test".to_string()));
        }
        self.log.lock().unwrap().launches += 1;
        Ok(())
    }

    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<(), DriverError> {
        self.record(format!("navigate {url}"));
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        self.record(format!("wait {selector}"));
        if self.script.login_broken {
            return Err(DriverError::Timeout {
                what: selector.to_string(),
                timeout,
            });
        }
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), DriverError> {
        self.record(format!("click {selector}"));
        Ok(())
    }

    async fn type_into(&mut self, selector: &str, _text: &str) -> Result<(), DriverError> {
        self.record(format!("type {selector}"));
        Ok(())
    }

    async fn content(&mut self) -> Result<String, DriverError> {
        self.record("content");
        Ok(thread_page(self.script.images))
    }

    async fn open_context(&mut self, url: &str) -> Result<(), DriverError> {
        self.record(format!("open {url}"));
        self.context_url = Some(url.to_string());
        Ok(())
    }

    async fn capture_visible(&mut self, path: &Path) -> Result<(), DriverError> {
        let url = self.context_url.clone().ok_or(DriverError::NoContext)?;
        let index = attachment_index(&url).unwrap_or(0);
        if self.script.failing.contains(&index) {
            return Err(DriverError::Capture(format!("attachment {index} did not render")));
        }
        // Width encodes the attachment index so page order can be checked.
        let img = image::RgbImage::from_pixel(10 + index as u32, 12, image::Rgb([200, 80, 40]));
        img.save_with_format(path, image::ImageFormat::Jpeg)
            .map_err(|e| DriverError::Capture(e.to_string()))?;
        self.log.lock().unwrap().captures += 1;
        Ok(())
    }

    async fn close_context(&mut self) -> Result<(), DriverError> {
        self.record("close context");
        self.context_url = None;
        Ok(())
    }

    async fn quit(&mut self) -> Result<(), DriverError> {
        self.record("quit");
        self.log.lock().unwrap().quits += 1;
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FakeFactory {
    pub script: Script,
    pub log: Arc<Mutex<DriverLog>>,
}

impl FakeFactory {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            log: Arc::default(),
        }
    }

    pub fn driver(&self) -> Box<dyn BrowserDriver> {
        Box::new(FakeDriver {
            script: self.script.clone(),
            log: self.log.clone(),
            context_url: None,
        })
    }
}

impl DriverFactory for FakeFactory {
    fn create(&self) -> Box<dyn BrowserDriver> {
        self.driver()
    }
}

/// Settings with credentials and every wait zeroed.
pub fn test_settings(dir: &TempDir) -> Settings {
    let mut settings = Settings::with_archive_dir(dir.path().to_path_buf());
    settings.credentials = Credentials::new("student", "hunter2");
    settings.site.login_settle_ms = 0;
    settings.site.item_pacing_ms = 0;
    settings.capture.item_delay = 0;
    settings.capture.page_load_timeout = 1;
    settings.capture.element_timeout = 1;
    settings
}

pub async fn open_store(settings: &Settings) -> DieselThreadRepository {
    settings.ensure_directories().unwrap();
    let ctx = settings.create_db_context();
    ctx.init_schema().await.unwrap();
    ctx.threads()
}

pub async fn manager_with(
    settings: Settings,
    factory: FakeFactory,
) -> (JobManager, Arc<dyn ThreadStore>) {
    let store: Arc<dyn ThreadStore> = Arc::new(open_store(&settings).await);
    let manager = JobManager::new(settings, store.clone(), Arc::new(factory));
    (manager, store)
}

/// Poll until the job leaves `queued`/`running`.
pub async fn wait_for_job(manager: &JobManager, id: &str) -> Job {
    for _ in 0..1000 {
        if let Some(job) = manager.status(id) {
            if job.status.is_terminal() {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} did not finish");
}
