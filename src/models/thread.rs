//! Archived thread model.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::ThreadIdentity;

/// One archived thread: where its images and document live on disk.
///
/// Unique per `(archive_key, display_name)`; recapturing a thread replaces
/// the previous record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub archive_key: String,
    pub display_name: String,
    /// Thread URL. `None` for records recovered from the archive folders.
    pub source_url: Option<String>,
    /// Assembled PDF. `None` when the capture produced no pages.
    pub document_path: Option<PathBuf>,
    pub images_folder: PathBuf,
    pub image_count: usize,
    pub captured_at: DateTime<Utc>,
}

impl ThreadRecord {
    /// Record for a fresh capture of `identity`.
    pub fn captured(
        identity: &ThreadIdentity,
        source_url: impl Into<String>,
        images_folder: PathBuf,
        document_path: Option<PathBuf>,
        image_count: usize,
    ) -> Self {
        Self {
            archive_key: identity.archive_key.clone(),
            display_name: identity.display_name.clone(),
            source_url: Some(source_url.into()),
            document_path,
            images_folder,
            image_count,
            captured_at: Utc::now(),
        }
    }

    /// Whether the assembled PDF still exists on disk.
    ///
    /// A record can outlive its document file.
    pub fn has_document(&self) -> bool {
        self.document_path.as_deref().is_some_and(|p| p.is_file())
    }
}
