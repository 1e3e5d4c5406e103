//! Archive commands: sync, ls, search.

use console::style;

use super::helpers::{open_store, print_records};
use crate::config::Settings;
use crate::storage::sync_from_archive;

/// Backfill records for thread folders the database does not know.
pub async fn cmd_sync(settings: &Settings) -> anyhow::Result<()> {
    let store = open_store(settings).await?;
    let added = sync_from_archive(&settings.layout(), &store).await?;
    println!(
        "{} Synced {} new thread(s) from {}",
        style("✓").green(),
        added,
        settings.archive_dir.display()
    );
    Ok(())
}

pub async fn cmd_ls(settings: &Settings, course: Option<&str>) -> anyhow::Result<()> {
    let store = open_store(settings).await?;

    let mut records = match course {
        Some(key) => store.list_by_key(&key.to_uppercase()).await?,
        None => store.list_all().await?,
    };
    if records.is_empty() {
        println!("{} No archived threads", style("!").yellow());
        return Ok(());
    }

    records.sort_by(|a, b| {
        a.archive_key
            .cmp(&b.archive_key)
            .then_with(|| a.display_name.cmp(&b.display_name))
    });
    print_records(&records);

    if course.is_none() {
        let keys = store.distinct_keys().await?;
        println!(
            "\n{} threads in {} course(s)",
            records.len(),
            keys.len()
        );
    }
    Ok(())
}

pub async fn cmd_search(settings: &Settings, query: &str) -> anyhow::Result<()> {
    let store = open_store(settings).await?;
    let records = store.search(query).await?;
    if records.is_empty() {
        println!("{} Nothing matches '{}'", style("!").yellow(), query);
        return Ok(());
    }
    print_records(&records);
    Ok(())
}
