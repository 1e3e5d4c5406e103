//! Chrome driver over the DevTools protocol (chromiumoxide).

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, NavigateParams};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{BrowserDriver, DriverError, DriverFactory, LaunchOptions};
use crate::config::BrowserEngineConfig;

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/google/chrome/google-chrome",
];

const CHROME_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// JPEG quality for captures.
const CAPTURE_QUALITY: i64 = 90;

/// JavaScript to wait for page ready state.
const WAIT_FOR_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
            setTimeout(() => resolve('timeout'), 10000);
        }
    })
"#;

fn protocol(e: impl std::fmt::Display) -> DriverError {
    DriverError::Protocol(e.to_string())
}

/// Find Chrome executable.
fn find_chrome() -> Result<PathBuf, DriverError> {
    for path in CHROME_PATHS {
        let p = Path::new(path);
        if p.exists() {
            info!("Found Chrome at: {}", path);
            return Ok(p.to_path_buf());
        }
    }

    for cmd in CHROME_COMMANDS {
        if let Ok(path) = which::which(cmd) {
            info!("Found Chrome in PATH: {}", path.display());
            return Ok(path);
        }
    }

    Err(DriverError::Launch(
        "Chrome/Chromium not found. Please install it:\n\
         - Arch/Manjaro: sudo pacman -S chromium\n\
         - Ubuntu/Debian: sudo apt install chromium-browser\n\
         - Fedora: sudo dnf install chromium\n\
         - Or set BROWSER_URL to an existing DevTools endpoint"
            .to_string(),
    ))
}

/// Drive the browser's event handler until the connection drops.
fn spawn_handler(mut handler: chromiumoxide::Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    })
}

/// Wait for the page to reach a ready state.
async fn wait_for_page_ready(page: &Page, timeout: Duration) {
    match tokio::time::timeout(timeout, page.evaluate(WAIT_FOR_READY_SCRIPT.to_string())).await {
        Ok(Ok(result)) => {
            let state: String = result
                .into_value()
                .unwrap_or_else(|_| "unknown".to_string());
            debug!("Page ready state: {}", state);
        }
        Ok(Err(e)) => debug!("Could not check ready state: {}", e),
        Err(_) => warn!("Timeout waiting for page ready state"),
    }
}

/// Chrome session: one primary page plus an optional secondary tab.
pub struct ChromiumDriver {
    config: BrowserEngineConfig,
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    primary: Option<Page>,
    context: Option<Page>,
    remote: bool,
}

impl ChromiumDriver {
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self {
            config,
            browser: None,
            handler: None,
            primary: None,
            context: None,
            remote: false,
        }
    }

    fn primary(&self) -> Result<&Page, DriverError> {
        self.primary.as_ref().ok_or(DriverError::NotLaunched)
    }

    async fn launch_local(&mut self, options: &LaunchOptions) -> Result<Browser, DriverError> {
        info!("Launching browser (headless={})", options.headless);

        let chrome_path = find_chrome()?;
        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .request_timeout(Duration::from_secs(self.config.timeout))
            .window_size(options.viewport_width, options.viewport_height)
            .viewport(Viewport {
                width: options.viewport_width,
                height: options.viewport_height,
                ..Default::default()
            });

        // with_head means NOT headless
        if !options.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = self.config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        for arg in &self.config.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| DriverError::Launch(format!("invalid browser config: {}", e)))?;

        let (browser, handler) = Browser::launch(config)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;
        self.handler = Some(spawn_handler(handler));
        Ok(browser)
    }

    /// Connect to a remote Chrome instance.
    async fn connect_remote(&mut self, url: &str) -> Result<Browser, DriverError> {
        info!(
            "Connecting to remote browser at {} (timeout: {}s)",
            url, self.config.timeout
        );

        // Get WebSocket URL from the /json/version endpoint
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let client = reqwest::Client::new();
        let resp: serde_json::Value = client
            .get(&version_url)
            .send()
            .await
            .map_err(|e| DriverError::Launch(format!("remote browser unreachable: {}", e)))?
            .json()
            .await
            .map_err(|e| DriverError::Launch(format!("bad version info: {}", e)))?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DriverError::Launch("no webSocketDebuggerUrl in response".into()))?;

        debug!("Connecting to WebSocket: {}", ws_url);

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout: Duration::from_secs(self.config.timeout),
            ..Default::default()
        };

        let (browser, handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;
        self.handler = Some(spawn_handler(handler));
        self.remote = true;
        Ok(browser)
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn launch(&mut self, options: &LaunchOptions) -> Result<(), DriverError> {
        if self.browser.is_some() {
            return Ok(());
        }

        let browser = match self.config.remote_url.clone() {
            Some(remote_url) => self.connect_remote(&remote_url).await?,
            None => self.launch_local(options).await?,
        };
        let primary = browser.new_page("about:blank").await.map_err(protocol)?;

        self.primary = Some(primary);
        self.browser = Some(browser);
        Ok(())
    }

    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        info!("Navigating to {}", url);
        let page = self.primary()?;
        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| DriverError::Navigation {
                url: url.to_string(),
                reason: e,
            })?;

        tokio::time::timeout(timeout, page.execute(nav_params))
            .await
            .map_err(|_| DriverError::Timeout {
                what: format!("navigation to {}", url),
                timeout,
            })?
            .map_err(|e| DriverError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        wait_for_page_ready(page, timeout).await;
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        debug!("Waiting for selector: {}", selector);
        let page = self.primary()?;
        // No deadline when the timeout does not fit in an Instant.
        let deadline = tokio::time::Instant::now().checked_add(timeout);
        loop {
            if page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if deadline.is_some_and(|d| tokio::time::Instant::now() >= d) {
                return Err(DriverError::Timeout {
                    what: selector.to_string(),
                    timeout,
                });
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn click(&mut self, selector: &str) -> Result<(), DriverError> {
        let element = self
            .primary()?
            .find_element(selector)
            .await
            .map_err(|_| DriverError::ElementNotFound(selector.to_string()))?;
        element.click().await.map_err(protocol)?;
        Ok(())
    }

    async fn type_into(&mut self, selector: &str, text: &str) -> Result<(), DriverError> {
        let element = self
            .primary()?
            .find_element(selector)
            .await
            .map_err(|_| DriverError::ElementNotFound(selector.to_string()))?;
        element
            .click()
            .await
            .map_err(protocol)?
            .type_str(text)
            .await
            .map_err(protocol)?;
        Ok(())
    }

    async fn content(&mut self) -> Result<String, DriverError> {
        self.primary()?.content().await.map_err(protocol)
    }

    async fn open_context(&mut self, url: &str) -> Result<(), DriverError> {
        let browser = self.browser.as_ref().ok_or(DriverError::NotLaunched)?;
        if let Some(stale) = self.context.take() {
            let _ = stale.close().await;
        }
        let page = browser
            .new_page(url)
            .await
            .map_err(|e| DriverError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        self.context = Some(page);
        Ok(())
    }

    async fn capture_visible(&mut self, path: &Path) -> Result<(), DriverError> {
        let page = self.context.as_ref().ok_or(DriverError::NoContext)?;
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Jpeg)
            .quality(CAPTURE_QUALITY)
            .build();
        page.save_screenshot(params, path)
            .await
            .map_err(|e| DriverError::Capture(e.to_string()))?;
        debug!("Captured {}", path.display());
        Ok(())
    }

    async fn close_context(&mut self) -> Result<(), DriverError> {
        let closed = match self.context.take() {
            Some(page) => page.close().await.map_err(protocol),
            None => Ok(()),
        };
        if let Some(primary) = self.primary.as_ref() {
            primary.bring_to_front().await.map_err(protocol)?;
        }
        closed
    }

    async fn quit(&mut self) -> Result<(), DriverError> {
        if let Some(page) = self.context.take() {
            let _ = page.close().await;
        }
        if let Some(page) = self.primary.take() {
            if self.remote {
                let _ = page.close().await;
            }
        }

        let mut result = Ok(());
        if let Some(mut browser) = self.browser.take() {
            // A remote browser outlives us; only our tabs are closed.
            if !self.remote {
                if let Err(e) = browser.close().await {
                    result = Err(protocol(e));
                }
                let _ = browser.wait().await;
            }
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        result
    }
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

/// Creates [`ChromiumDriver`]s sharing one engine configuration.
#[derive(Debug, Clone)]
pub struct ChromiumDriverFactory {
    config: BrowserEngineConfig,
}

impl ChromiumDriverFactory {
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self { config }
    }
}

impl DriverFactory for ChromiumDriverFactory {
    fn create(&self) -> Box<dyn BrowserDriver> {
        Box::new(ChromiumDriver::new(self.config.clone()))
    }
}
