//! One-shot capture command.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use super::helpers::open_shared_store;
use crate::browser::default_factory;
use crate::config::{CaptureOverrides, Settings};
use crate::jobs::{JobManager, JobStatus};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Capture a single thread in the foreground, showing progress until it ends.
pub async fn cmd_scrape(
    settings: Settings,
    url: &str,
    overrides: CaptureOverrides,
) -> anyhow::Result<()> {
    let store = open_shared_store(&settings).await?;
    let drivers = default_factory(&settings.browser);
    let manager = JobManager::new(settings, store, drivers);

    let id = manager.submit(url, overrides)?;
    println!("{} Capturing {}", style("→").cyan(), style(&id).bold());

    let pb = ProgressBar::new_spinner();
    pb.set_message("logging in");
    pb.enable_steady_tick(Duration::from_millis(120));
    let mut bar_styled = false;

    let job = loop {
        let Some(job) = manager.status(&id) else {
            pb.finish_and_clear();
            anyhow::bail!("job {} disappeared from the registry", id);
        };

        if job.total > 0 {
            if !bar_styled {
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("█▓░"),
                );
                pb.set_length(job.total as u64);
                pb.set_message("capturing");
                bar_styled = true;
            }
            pb.set_position(job.progress as u64);
        }

        if job.status.is_terminal() {
            break job;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    };
    pb.finish_and_clear();
    manager.shutdown();

    match (job.status, job.result) {
        (JobStatus::Completed, Some(result)) => {
            println!(
                "{} Captured {} image(s) into {}",
                style("✓").green(),
                result.image_count,
                result.images_folder.display()
            );
            match result.document_path {
                Some(path) => println!("  PDF: {}", path.display()),
                None => println!("  {} no PDF was assembled", style("!").yellow()),
            }
            Ok(())
        }
        _ => {
            let reason = job.error.unwrap_or_else(|| "unknown error".to_string());
            println!("{} Capture failed: {}", style("✗").red(), reason);
            anyhow::bail!(reason)
        }
    }
}
