//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod archive;
mod helpers;
mod scrape;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings, LoadOptions};

#[derive(Parser)]
#[command(name = "threadvault")]
#[command(about = "Capture forum thread attachments into archived PDFs")]
#[command(version)]
pub struct Cli {
    /// Archive directory (overrides config file and ARCHIVE_DIR)
    #[arg(long, global = true)]
    archive_dir: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server (capture API and archive browsing)
    Serve {
        /// Address to bind to: PORT, HOST, or HOST:PORT (default: 127.0.0.1:8211)
        #[arg(default_value = "127.0.0.1:8211")]
        bind: String,
    },

    /// Capture one thread and wait for it to finish
    Scrape {
        /// Thread URL
        url: String,
        /// Show the browser window
        #[arg(long)]
        headed: bool,
        /// Seconds to let each attachment render before capturing
        #[arg(long)]
        item_delay: Option<u64>,
        /// Seconds to wait for the thread page to load
        #[arg(long)]
        page_load_timeout: Option<u64>,
        /// Seconds to wait for login controls to appear
        #[arg(long)]
        element_timeout: Option<u64>,
    },

    /// Add database records for threads already in the archive folders
    Sync,

    /// List archived threads, optionally for one course code
    Ls {
        /// Course code (archive key)
        course: Option<String>,
    },

    /// Search archived threads by course code or name
    Search {
        /// Text to look for
        query: String,
    },
}

/// Parse arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        archive_dir: cli.archive_dir,
    };
    let settings = load_settings(&options).await;

    match cli.command {
        Commands::Serve { bind } => serve::cmd_serve(settings, &bind).await,
        Commands::Scrape {
            url,
            headed,
            item_delay,
            page_load_timeout,
            element_timeout,
        } => {
            let overrides = crate::config::CaptureOverrides {
                headless: headed.then_some(false),
                item_delay,
                page_load_timeout,
                element_timeout,
            };
            scrape::cmd_scrape(settings, &url, overrides).await
        }
        Commands::Sync => archive::cmd_sync(&settings).await,
        Commands::Ls { course } => archive::cmd_ls(&settings, course.as_deref()).await,
        Commands::Search { query } => archive::cmd_search(&settings, &query).await,
    }
}
