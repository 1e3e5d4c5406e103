//! Application settings.

use std::fs;
use std::path::PathBuf;

use crate::repository::DbContext;
use crate::storage::ArchiveLayout;

use super::{BrowserEngineConfig, CaptureOptions, Credentials, SiteProfile};

/// Default archive root, relative to the working directory.
pub const DEFAULT_ARCHIVE_DIR: &str = "archive";

/// Default database filename inside the archive root.
pub const DEFAULT_DATABASE_FILENAME: &str = "threadvault.db";

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Archive root holding `images/` and `documents/`.
    pub archive_dir: PathBuf,
    /// SQLite database holding thread records.
    pub database_path: PathBuf,
    pub site: SiteProfile,
    pub browser: BrowserEngineConfig,
    /// Defaults for submissions that leave timing unset.
    pub capture: CaptureOptions,
    /// Forum account. `None` makes every submission fail fast.
    pub credentials: Option<Credentials>,
}

impl Default for Settings {
    fn default() -> Self {
        let archive_dir = PathBuf::from(DEFAULT_ARCHIVE_DIR);
        Self {
            database_path: archive_dir.join(DEFAULT_DATABASE_FILENAME),
            archive_dir,
            site: SiteProfile::default(),
            browser: BrowserEngineConfig::default(),
            capture: CaptureOptions::default(),
            credentials: None,
        }
    }
}

impl Settings {
    /// Create settings rooted at a custom archive directory.
    pub fn with_archive_dir(archive_dir: PathBuf) -> Self {
        Self {
            database_path: archive_dir.join(DEFAULT_DATABASE_FILENAME),
            archive_dir,
            ..Default::default()
        }
    }

    /// On-disk layout for captured images and documents.
    pub fn layout(&self) -> ArchiveLayout {
        ArchiveLayout::new(&self.archive_dir)
    }

    /// Open a database context for the configured SQLite file.
    pub fn create_db_context(&self) -> DbContext {
        DbContext::from_sqlite_path(&self.database_path)
    }

    /// Ensure the archive and database directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        let layout = self.layout();
        for dir in [layout.images_root(), layout.documents_root()] {
            fs::create_dir_all(&dir).map_err(|e| {
                std::io::Error::new(
                    e.kind(),
                    format!("Failed to create directory '{}': {}", dir.display(), e),
                )
            })?;
        }
        if let Some(parent) = self.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}
