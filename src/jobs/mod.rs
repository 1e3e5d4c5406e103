//! Capture jobs: submission, serialized execution and status tracking.

mod manager;
mod registry;

pub use manager::JobManager;
pub use registry::JobRegistry;

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::browser::SessionError;
use crate::document::AssemblyError;
use crate::identity::IdentityError;
use crate::repository::DieselError;

/// Lifecycle of a job: `queued -> running -> completed | error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for the capture permit.
    Queued,
    Running,
    Completed,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Queued or running. At most one active job exists per id.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub archive_key: String,
    pub display_name: String,
    pub images_folder: PathBuf,
    /// `None` when no page could be assembled.
    pub document_path: Option<PathBuf>,
    pub image_count: usize,
}

/// Snapshot of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    /// Index of the last captured image.
    pub progress: usize,
    /// Number of discovered images; 0 until discovery finishes.
    pub total: usize,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn queued(id: impl Into<String>, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status: JobStatus::Queued,
            progress: 0,
            total: 0,
            url: url.into(),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Why a submission was refused. No job is created in any of these cases.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("URL does not belong to {origin}: {url}")]
    ForeignSite { url: String, origin: String },

    #[error(transparent)]
    InvalidIdentity(#[from] IdentityError),

    #[error("a capture for {0} is already queued or running")]
    AlreadyRunning(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("job manager is shutting down")]
    ShuttingDown,
}

/// Stage failure that ends a job in `error`.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("no images found on the thread page (is the account logged in?)")]
    NoImagesFound,

    #[error("none of the {0} images could be captured")]
    NothingCaptured(usize),

    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document assembly failed: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("failed to record thread: {0}")]
    Store(#[from] DieselError),
}
