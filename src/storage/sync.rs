//! Rebuild thread records from what is already on disk.

use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::Utc;

use super::{count_images, ArchiveLayout};
use crate::models::ThreadRecord;
use crate::repository::{DieselError, ThreadStore};

/// A thread folder found under `{archive}/images`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedThread {
    pub archive_key: String,
    pub display_name: String,
    pub images_folder: PathBuf,
    pub image_count: usize,
    /// Set when the matching PDF exists.
    pub document_path: Option<PathBuf>,
}

impl ArchivedThread {
    fn into_record(self) -> ThreadRecord {
        ThreadRecord {
            archive_key: self.archive_key,
            display_name: self.display_name,
            source_url: None,
            document_path: self.document_path,
            images_folder: self.images_folder,
            image_count: self.image_count,
            captured_at: Utc::now(),
        }
    }
}

fn subdirectories(dir: &std::path::Path) -> io::Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            dirs.push((name.to_string(), entry.path()));
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Walk `{archive}/images/{key}/{name}` and report every thread folder.
///
/// A missing images root yields an empty list.
pub fn scan_archive(layout: &ArchiveLayout) -> io::Result<Vec<ArchivedThread>> {
    let images_root = layout.images_root();
    if !images_root.is_dir() {
        return Ok(Vec::new());
    }

    let mut threads = Vec::new();
    for (archive_key, key_dir) in subdirectories(&images_root)? {
        for (display_name, folder) in subdirectories(&key_dir)? {
            let image_count = count_images(&folder)?;
            let document = layout.document_path(&archive_key, &display_name);
            threads.push(ArchivedThread {
                document_path: document.is_file().then_some(document),
                archive_key: archive_key.clone(),
                display_name,
                images_folder: folder,
                image_count,
            });
        }
    }
    Ok(threads)
}

/// Errors from [`sync_from_archive`].
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to scan archive: {0}")]
    Scan(#[from] io::Error),
    #[error("database error: {0}")]
    Database(#[from] DieselError),
}

/// Insert a record for every archived thread the store does not know yet.
///
/// Existing records are left untouched. Returns the number inserted.
pub async fn sync_from_archive(
    layout: &ArchiveLayout,
    store: &dyn ThreadStore,
) -> Result<usize, SyncError> {
    let found = scan_archive(layout)?;
    let mut inserted = 0;
    for thread in found {
        if store
            .get(&thread.archive_key, &thread.display_name)
            .await?
            .is_some()
        {
            continue;
        }
        tracing::debug!(
            "Recovered {}/{} from archive ({} images)",
            thread.archive_key,
            thread.display_name,
            thread.image_count
        );
        store.upsert(&thread.into_record()).await?;
        inserted += 1;
    }
    if inserted > 0 {
        tracing::info!("Synced {} thread(s) from {}", inserted, layout.root().display());
    }
    Ok(inserted)
}
