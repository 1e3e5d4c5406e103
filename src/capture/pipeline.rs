//! Sequential capture of discovered attachments.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{CapturedImage, ImageReference};
use crate::browser::SessionController;
use crate::storage::capture_filename;

/// Waits applied around each capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturePacing {
    /// Settle time after opening an attachment, before the screenshot.
    pub item_delay: Duration,
    /// Pause after each item, before the next one opens.
    pub between_items: Duration,
}

/// What a capture run produced.
#[derive(Debug, Default, Clone)]
pub struct CaptureOutcome {
    pub captured: Vec<CapturedImage>,
    /// Indexes that could not be captured.
    pub skipped: Vec<usize>,
}

impl CaptureOutcome {
    pub fn image_count(&self) -> usize {
        self.captured.len()
    }
}

/// Capture every reference into `images_folder/{index}.jpg`, one at a time.
///
/// `progress(index, total)` fires after each successful capture, in order.
/// A failed item is logged and skipped; it never stops the run.
pub async fn capture_references<F>(
    session: &mut SessionController,
    references: &[ImageReference],
    images_folder: &Path,
    pacing: CapturePacing,
    mut progress: F,
) -> CaptureOutcome
where
    F: FnMut(usize, usize) + Send,
{
    let total = references.len();
    let mut outcome = CaptureOutcome::default();

    for reference in references {
        let path = images_folder.join(capture_filename(reference.index));
        debug!(
            "Capturing {}/{} from {}",
            reference.index, total, reference.source_url
        );

        match session
            .capture_in_new_context(&reference.source_url, pacing.item_delay, &path)
            .await
        {
            Ok(()) => {
                outcome.captured.push(CapturedImage {
                    index: reference.index,
                    file_path: path,
                });
                progress(reference.index, total);
            }
            Err(e) => {
                warn!(
                    "Skipping image {}/{} ({}): {}",
                    reference.index, total, reference.source_url, e
                );
                outcome.skipped.push(reference.index);
            }
        }

        tokio::time::sleep(pacing.between_items).await;
    }

    info!(
        "Captured {}/{} images into {}",
        outcome.captured.len(),
        total,
        images_folder.display()
    );
    outcome
}
