//! Diesel row types.

use std::path::PathBuf;

use diesel::prelude::*;

use super::parse_datetime;
use crate::models::ThreadRecord;
use crate::schema::threads;

/// Row of the `threads` table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = threads)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ThreadRow {
    pub id: i32,
    pub archive_key: String,
    pub display_name: String,
    pub source_url: Option<String>,
    pub document_path: Option<String>,
    pub images_folder: String,
    pub image_count: i32,
    pub captured_at: String,
}

impl From<ThreadRow> for ThreadRecord {
    fn from(row: ThreadRow) -> Self {
        ThreadRecord {
            archive_key: row.archive_key,
            display_name: row.display_name,
            source_url: row.source_url,
            document_path: row.document_path.map(PathBuf::from),
            images_folder: PathBuf::from(row.images_folder),
            image_count: usize::try_from(row.image_count).unwrap_or(0),
            captured_at: parse_datetime(&row.captured_at),
        }
    }
}
