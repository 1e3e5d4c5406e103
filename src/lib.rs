//! threadvault - capture forum thread attachments into an archive.
//!
//! Logs into a forum with a real browser, screenshots every lightbox image of
//! a thread, assembles the screenshots into one PDF and records the thread in
//! a searchable SQLite index. Served over HTTP or driven from the CLI.

pub mod browser;
pub mod capture;
pub mod cli;
pub mod config;
pub mod document;
pub mod identity;
pub mod jobs;
pub mod models;
pub mod repository;
pub mod schema;
pub mod server;
pub mod storage;
