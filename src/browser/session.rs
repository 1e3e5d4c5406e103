//! Authenticated browser session.
//!
//! ```text
//! Uninitialized -> Ready -> Authenticating -> Authenticated -> Closed
//!                                   \-> AuthFailed -> Closed
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::{BrowserDriver, DriverError, LaunchOptions};
use crate::config::{Credentials, SiteProfile};

/// Lifecycle of a [`SessionController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    /// Browser launched, not logged in.
    Ready,
    Authenticating,
    Authenticated,
    AuthFailed,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
            Self::AuthFailed => "auth_failed",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("login failed: {reason}")]
    LoginFailed { reason: String },

    #[error("session is {actual}, expected {expected}")]
    InvalidState {
        expected: SessionState,
        actual: SessionState,
    },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// One browser session owned by a single capture run.
pub struct SessionController {
    driver: Box<dyn BrowserDriver>,
    site: SiteProfile,
    state: SessionState,
}

impl SessionController {
    pub fn new(driver: Box<dyn BrowserDriver>, site: SiteProfile) -> Self {
        Self {
            driver,
            site,
            state: SessionState::Uninitialized,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn site(&self) -> &SiteProfile {
        &self.site
    }

    fn expect_state(&self, expected: SessionState) -> Result<(), SessionError> {
        if self.state != expected {
            return Err(SessionError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    /// Launch the browser. No-op once launched.
    pub async fn initialize(&mut self, options: &LaunchOptions) -> Result<(), SessionError> {
        match self.state {
            SessionState::Uninitialized => {
                self.driver.launch(options).await?;
                self.state = SessionState::Ready;
                Ok(())
            }
            SessionState::Closed => Err(SessionError::InvalidState {
                expected: SessionState::Uninitialized,
                actual: SessionState::Closed,
            }),
            _ => Ok(()),
        }
    }

    /// Run the login handshake from `entry_url`.
    ///
    /// Success only means the form was found and submitted; a wrong password
    /// shows up later as a page without attachments.
    pub async fn login(
        &mut self,
        entry_url: &str,
        credentials: &Credentials,
        page_load_timeout: Duration,
        element_timeout: Duration,
    ) -> Result<(), SessionError> {
        self.expect_state(SessionState::Ready)?;
        self.state = SessionState::Authenticating;

        match self
            .login_steps(entry_url, credentials, page_load_timeout, element_timeout)
            .await
        {
            Ok(()) => {
                self.state = SessionState::Authenticated;
                info!("Logged in as {}", credentials.username);
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::AuthFailed;
                Err(SessionError::LoginFailed {
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn login_steps(
        &mut self,
        entry_url: &str,
        credentials: &Credentials,
        page_load_timeout: Duration,
        element_timeout: Duration,
    ) -> Result<(), DriverError> {
        let site = &self.site;
        let driver = &mut self.driver;

        driver.navigate(entry_url, page_load_timeout).await?;

        driver
            .wait_for(&site.login_entry_selector, element_timeout)
            .await?;
        driver.click(&site.login_entry_selector).await?;

        driver
            .wait_for(&site.username_selector, element_timeout)
            .await?;
        driver
            .type_into(&site.username_selector, &credentials.username)
            .await?;
        driver
            .wait_for(&site.password_selector, element_timeout)
            .await?;
        driver
            .type_into(&site.password_selector, &credentials.password)
            .await?;
        driver
            .wait_for(&site.submit_selector, element_timeout)
            .await?;
        driver.click(&site.submit_selector).await?;

        debug!("Login submitted, settling for {:?}", site.login_settle());
        tokio::time::sleep(site.login_settle()).await;
        Ok(())
    }

    /// Markup of the primary page.
    pub async fn page_content(&mut self) -> Result<String, SessionError> {
        self.expect_state(SessionState::Authenticated)?;
        Ok(self.driver.content().await?)
    }

    /// Open `url` in its own context, wait `settle`, capture it to `path`.
    ///
    /// The context is closed and the primary page restored whether or not the
    /// capture succeeded.
    pub async fn capture_in_new_context(
        &mut self,
        url: &str,
        settle: Duration,
        path: &Path,
    ) -> Result<(), SessionError> {
        self.expect_state(SessionState::Authenticated)?;

        let captured = match self.driver.open_context(url).await {
            Ok(()) => {
                tokio::time::sleep(settle).await;
                self.driver.capture_visible(path).await
            }
            Err(e) => Err(e),
        };
        let restored = self.driver.close_context().await;

        captured?;
        restored?;
        Ok(())
    }

    /// Release the browser. Later calls do nothing.
    pub async fn shutdown(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if let Err(e) = self.driver.quit().await {
            warn!("Error while closing browser: {}", e);
        }
        self.state = SessionState::Closed;
        debug!("Browser session closed");
    }
}
