//! Attachment discovery and sequential capture.

mod discovery;
mod pipeline;

pub use discovery::discover_references;
pub use pipeline::{capture_references, CaptureOutcome, CapturePacing};

use std::path::PathBuf;

use serde::Serialize;

/// One attachment link, in page order. `index` starts at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageReference {
    pub index: usize,
    pub source_url: String,
}

/// A capture written to disk as `{index}.jpg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub index: usize,
    pub file_path: PathBuf,
}
