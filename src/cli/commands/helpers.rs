//! Shared helper functions for CLI commands.

use std::sync::Arc;

use console::style;

use crate::config::Settings;
use crate::models::ThreadRecord;
use crate::repository::{DieselThreadRepository, ThreadStore};

/// Create the archive folders and schema, then open the thread store.
pub async fn open_store(settings: &Settings) -> anyhow::Result<DieselThreadRepository> {
    settings.ensure_directories()?;
    let ctx = settings.create_db_context();
    ctx.init_schema()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize database: {}", e))?;
    Ok(ctx.threads())
}

pub async fn open_shared_store(settings: &Settings) -> anyhow::Result<Arc<dyn ThreadStore>> {
    Ok(Arc::new(open_store(settings).await?))
}

/// One line per thread: name, image count, PDF marker.
pub fn print_records(records: &[ThreadRecord]) {
    let mut current_key: Option<&str> = None;
    for record in records {
        if current_key != Some(record.archive_key.as_str()) {
            println!("{}", style(&record.archive_key).bold().cyan());
            current_key = Some(record.archive_key.as_str());
        }
        let pdf = if record.has_document() {
            style("pdf").green()
        } else {
            style("no pdf").dim()
        };
        println!(
            "  {:<40} {:>4} images  {}  {}",
            record.display_name,
            record.image_count,
            pdf,
            style(record.captured_at.format("%Y-%m-%d %H:%M")).dim()
        );
    }
}
