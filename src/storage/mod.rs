//! On-disk archive layout.
//!
//! ```text
//! {archive}/images/{archive_key}/{display_name}/{n}.jpg
//! {archive}/documents/{archive_key}/{display_name}.pdf
//! ```
//!
//! Paths are a pure function of the thread identity, so repeated captures of
//! the same thread land in the same folder and overwrite the same document.

mod sync;

pub use sync::{scan_archive, sync_from_archive, ArchivedThread, SyncError};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::identity::ThreadIdentity;

const IMAGES_SUBDIR: &str = "images";
const DOCUMENTS_SUBDIR: &str = "documents";

/// Extension written by the capture pipeline.
pub const CAPTURE_EXTENSION: &str = "jpg";

/// Extensions counted as thread images when browsing an archive folder.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

/// Archive root and the paths derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLayout {
    root: PathBuf,
}

impl ArchiveLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn images_root(&self) -> PathBuf {
        self.root.join(IMAGES_SUBDIR)
    }

    pub fn documents_root(&self) -> PathBuf {
        self.root.join(DOCUMENTS_SUBDIR)
    }

    /// `{archive}/images/{archive_key}/{display_name}`
    pub fn images_folder(&self, archive_key: &str, display_name: &str) -> PathBuf {
        self.images_root().join(archive_key).join(display_name)
    }

    /// `{archive}/documents/{archive_key}/{display_name}.pdf`
    pub fn document_path(&self, archive_key: &str, display_name: &str) -> PathBuf {
        self.documents_root()
            .join(archive_key)
            .join(format!("{}.pdf", display_name))
    }

    pub fn thread_images(&self, identity: &ThreadIdentity) -> PathBuf {
        self.images_folder(&identity.archive_key, &identity.display_name)
    }

    pub fn thread_document(&self, identity: &ThreadIdentity) -> PathBuf {
        self.document_path(&identity.archive_key, &identity.display_name)
    }

    /// Create the image folder and document folder for a thread.
    pub fn prepare(&self, identity: &ThreadIdentity) -> io::Result<(PathBuf, PathBuf)> {
        let images = self.thread_images(identity);
        let document = self.thread_document(identity);
        fs::create_dir_all(&images)?;
        if let Some(parent) = document.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok((images, document))
    }
}

/// File name for the capture at `index`.
pub fn capture_filename(index: usize) -> String {
    format!("{}.{}", index, CAPTURE_EXTENSION)
}

/// Numeric stem of a numbered image name (`"12.jpg"` → `Some(12)`).
fn numbered_stem(name: &str, extensions: &[&str]) -> Option<u64> {
    let (stem, ext) = name.rsplit_once('.')?;
    if !extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)) {
        return None;
    }
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

fn list_numbered(folder: &Path, extensions: &[&str]) -> io::Result<Vec<(u64, PathBuf)>> {
    let mut images = Vec::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(n) = numbered_stem(name, extensions) {
            images.push((n, entry.path()));
        }
    }
    // Numeric order: 2.jpg before 10.jpg.
    images.sort_by_key(|(n, _)| *n);
    Ok(images)
}

/// Captured images (`{n}.jpg`) in a folder, ordered by the number in the name.
///
/// Gaps are expected: an index whose capture failed simply has no file.
pub fn list_captures(folder: &Path) -> io::Result<Vec<(u64, PathBuf)>> {
    list_numbered(folder, &[CAPTURE_EXTENSION])
}

/// Delete the numbered captures left in a folder by an earlier run.
pub fn clear_captures(folder: &Path) -> io::Result<usize> {
    let stale = list_captures(folder)?;
    for (_, path) in &stale {
        fs::remove_file(path)?;
    }
    Ok(stale.len())
}

/// Every numbered image in a folder (jpg, jpeg, png, gif), numerically ordered.
pub fn list_thread_images(folder: &Path) -> io::Result<Vec<PathBuf>> {
    Ok(list_numbered(folder, IMAGE_EXTENSIONS)?
        .into_iter()
        .map(|(_, path)| path)
        .collect())
}

/// Count image files in a folder regardless of naming.
pub fn count_images(folder: &Path) -> io::Result<usize> {
    let mut count = 0;
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        let is_image = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)));
        if is_image && entry.file_type()?.is_file() {
            count += 1;
        }
    }
    Ok(count)
}
