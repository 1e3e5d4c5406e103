//! Forum site profile and login credentials.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default forum origin. Relative attachment links are resolved against it.
pub const DEFAULT_ORIGIN: &str = "https://fuoverflow.com";

/// Markup conventions of the forum being archived.
///
/// The defaults match a XenForo board: a textual "Log in" link in the
/// navigation group, `login`/`password` inputs in the overlay, and
/// attachments rendered as lightbox preview anchors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SiteProfile {
    /// Site origin, e.g. `https://fuoverflow.com`.
    pub origin: String,
    /// Control that opens the login form.
    pub login_entry_selector: String,
    pub username_selector: String,
    pub password_selector: String,
    pub submit_selector: String,
    /// Anchors whose `href` points at a full-size attachment.
    pub image_link_selector: String,
    /// Wait after submitting the login form, in milliseconds.
    pub login_settle_ms: u64,
    /// Pause between two captures, in milliseconds.
    pub item_pacing_ms: u64,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            login_entry_selector:
                "a.p-navgroup-link.p-navgroup-link--textual.p-navgroup-link--logIn".to_string(),
            username_selector: "input[name=\"login\"]".to_string(),
            password_selector: "input[name=\"password\"]".to_string(),
            submit_selector: "button.button--primary.button.button--icon.button--icon--login"
                .to_string(),
            image_link_selector: "a.file-preview.js-lbImage".to_string(),
            login_settle_ms: 3_000,
            item_pacing_ms: 1_000,
        }
    }
}

impl SiteProfile {
    pub fn login_settle(&self) -> Duration {
        Duration::from_millis(self.login_settle_ms)
    }

    pub fn item_pacing(&self) -> Duration {
        Duration::from_millis(self.item_pacing_ms)
    }

    /// Origin with any trailing slash removed.
    pub fn origin(&self) -> &str {
        self.origin.trim_end_matches('/')
    }

    /// Whether `url` belongs to this site (`{origin}/...`).
    pub fn owns_url(&self, url: &str) -> bool {
        url.strip_prefix(self.origin())
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Forum account used for the login handshake.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Read `FORUM_USERNAME` / `FORUM_PASSWORD`. Both must be non-empty.
    pub fn from_env() -> Option<Self> {
        let username = std::env::var("FORUM_USERNAME").ok()?;
        let password = std::env::var("FORUM_PASSWORD").ok()?;
        Self::new(username, password)
    }

    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Option<Self> {
        let username = username.into();
        let password = password.into();
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self { username, password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
