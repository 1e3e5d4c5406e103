//! Browser driver abstraction.
//!
//! Everything that talks to a real browser goes through [`BrowserDriver`].
//! The session controller and capture pipeline only see this trait, so they
//! run unchanged against Chrome (via chromiumoxide) or a scripted fake.

#[cfg(feature = "browser")]
mod chromium;
mod session;

#[cfg(feature = "browser")]
pub use chromium::{ChromiumDriver, ChromiumDriverFactory};
pub use session::{SessionController, SessionError, SessionState};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::BrowserEngineConfig;

/// Errors raised by a browser driver.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to start browser: {0}")]
    Launch(String),

    #[error("browser is not running")]
    NotLaunched,

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("timed out after {}s waiting for {what}", .timeout.as_secs_f32())]
    Timeout { what: String, timeout: Duration },

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("no secondary context is open")]
    NoContext,

    #[error("screenshot failed: {0}")]
    Capture(String),

    #[error("browser protocol error: {0}")]
    Protocol(String),

    #[error("browser support not compiled. Rebuild with: cargo build --features browser")]
    Unsupported,
}

/// How to start a browser session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchOptions {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl LaunchOptions {
    pub fn new(headless: bool, config: &BrowserEngineConfig) -> Self {
        Self {
            headless,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
        }
    }
}

/// Remote-controlled browser with one primary page and at most one
/// secondary context open at a time.
#[async_trait]
pub trait BrowserDriver: Send {
    /// Start the browser and open the primary page.
    async fn launch(&mut self, options: &LaunchOptions) -> Result<(), DriverError>;

    /// Navigate the primary page.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Wait until `selector` matches an element on the primary page.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), DriverError>;

    async fn click(&mut self, selector: &str) -> Result<(), DriverError>;

    /// Focus the element and type `text` into it.
    async fn type_into(&mut self, selector: &str, text: &str) -> Result<(), DriverError>;

    /// Rendered markup of the primary page.
    async fn content(&mut self) -> Result<String, DriverError>;

    /// Open `url` in a fresh context (new tab) sharing the session cookies.
    async fn open_context(&mut self, url: &str) -> Result<(), DriverError>;

    /// Write the visible region of the open context as a JPEG.
    async fn capture_visible(&mut self, path: &Path) -> Result<(), DriverError>;

    /// Close the secondary context and bring the primary page back to front.
    async fn close_context(&mut self) -> Result<(), DriverError>;

    /// Release the browser. Safe to call when nothing was launched.
    async fn quit(&mut self) -> Result<(), DriverError>;
}

/// Creates one fresh driver per capture run.
pub trait DriverFactory: Send + Sync {
    fn create(&self) -> Box<dyn BrowserDriver>;
}

/// Driver used when the crate is built without the `browser` feature.
#[derive(Debug, Default)]
pub struct UnsupportedDriver;

#[async_trait]
impl BrowserDriver for UnsupportedDriver {
    async fn launch(&mut self, _options: &LaunchOptions) -> Result<(), DriverError> {
        Err(DriverError::Unsupported)
    }

    async fn navigate(&mut self, _url: &str, _timeout: Duration) -> Result<(), DriverError> {
        Err(DriverError::Unsupported)
    }

    async fn wait_for(&mut self, _selector: &str, _timeout: Duration) -> Result<(), DriverError> {
        Err(DriverError::Unsupported)
    }

    async fn click(&mut self, _selector: &str) -> Result<(), DriverError> {
        Err(DriverError::Unsupported)
    }

    async fn type_into(&mut self, _selector: &str, _text: &str) -> Result<(), DriverError> {
        Err(DriverError::Unsupported)
    }

    async fn content(&mut self) -> Result<String, DriverError> {
        Err(DriverError::Unsupported)
    }

    async fn open_context(&mut self, _url: &str) -> Result<(), DriverError> {
        Err(DriverError::Unsupported)
    }

    async fn capture_visible(&mut self, _path: &Path) -> Result<(), DriverError> {
        Err(DriverError::Unsupported)
    }

    async fn close_context(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn quit(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}

#[cfg(not(feature = "browser"))]
struct UnsupportedDriverFactory;

#[cfg(not(feature = "browser"))]
impl DriverFactory for UnsupportedDriverFactory {
    fn create(&self) -> Box<dyn BrowserDriver> {
        Box::new(UnsupportedDriver)
    }
}

/// Factory for the real browser, or one whose drivers refuse to launch when
/// browser support is compiled out.
pub fn default_factory(config: &BrowserEngineConfig) -> Arc<dyn DriverFactory> {
    #[cfg(feature = "browser")]
    {
        Arc::new(ChromiumDriverFactory::new(config.clone()))
    }
    #[cfg(not(feature = "browser"))]
    {
        let _ = config;
        Arc::new(UnsupportedDriverFactory)
    }
}
