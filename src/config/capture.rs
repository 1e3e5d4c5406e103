//! Per-job capture options.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing knobs for one capture run, in seconds.
///
/// These arrive with each submission; anything left unset falls back to
/// the configured defaults via [`CaptureOverrides::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOptions {
    pub headless: bool,
    /// Settle time after opening each attachment.
    pub item_delay: u64,
    pub page_load_timeout: u64,
    pub element_timeout: u64,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            headless: true,
            item_delay: 2,
            page_load_timeout: 10,
            element_timeout: 10,
        }
    }
}

impl CaptureOptions {
    pub fn item_delay(&self) -> Duration {
        Duration::from_secs(self.item_delay)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout)
    }
}

/// Upper bound, in seconds, for any wait taken from a request.
pub const MAX_WAIT_SECS: u64 = 600;

/// Optional per-request overrides (HTTP body, CLI flags).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOverrides {
    #[serde(default)]
    pub headless: Option<bool>,
    #[serde(default)]
    pub item_delay: Option<u64>,
    #[serde(default)]
    pub page_load_timeout: Option<u64>,
    #[serde(default)]
    pub element_timeout: Option<u64>,
}

impl CaptureOverrides {
    /// Fill unset fields from `defaults`. Waits are capped at [`MAX_WAIT_SECS`].
    pub fn resolve(&self, defaults: &CaptureOptions) -> CaptureOptions {
        let wait = |value: Option<u64>, default: u64| value.unwrap_or(default).min(MAX_WAIT_SECS);
        CaptureOptions {
            headless: self.headless.unwrap_or(defaults.headless),
            item_delay: wait(self.item_delay, defaults.item_delay),
            page_load_timeout: wait(self.page_load_timeout, defaults.page_load_timeout),
            element_timeout: wait(self.element_timeout, defaults.element_timeout),
        }
    }
}
