//! Thread repository.
//!
//! One row per `(archive_key, display_name)`. Recapturing a thread updates
//! the existing row in place.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Nullable, Text};
use diesel_async::RunQueryDsl;

use super::models::ThreadRow;
use super::pool::{DbPool, DieselError};
use super::util::escape_like;
use crate::models::ThreadRecord;
use crate::schema::threads;
use crate::with_conn;

const UPSERT_SQL: &str = r#"
INSERT INTO threads
    (archive_key, display_name, source_url, document_path, images_folder, image_count, captured_at)
VALUES (?, ?, ?, ?, ?, ?, ?)
ON CONFLICT(archive_key, display_name) DO UPDATE SET
    source_url = COALESCE(excluded.source_url, threads.source_url),
    document_path = excluded.document_path,
    images_folder = excluded.images_folder,
    image_count = excluded.image_count,
    captured_at = excluded.captured_at
"#;

/// Persistence seam for archived threads.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Insert or replace the record for its `(archive_key, display_name)`.
    async fn upsert(&self, record: &ThreadRecord) -> Result<(), DieselError>;

    async fn get(
        &self,
        archive_key: &str,
        display_name: &str,
    ) -> Result<Option<ThreadRecord>, DieselError>;

    /// Case-insensitive substring match on key or name, newest first.
    /// A blank query returns everything.
    async fn search(&self, query: &str) -> Result<Vec<ThreadRecord>, DieselError>;

    /// All records, newest first.
    async fn list_all(&self) -> Result<Vec<ThreadRecord>, DieselError>;

    /// Records under one archive key, ordered by name.
    async fn list_by_key(&self, archive_key: &str) -> Result<Vec<ThreadRecord>, DieselError>;

    /// Distinct archive keys, sorted.
    async fn distinct_keys(&self) -> Result<Vec<String>, DieselError>;

    /// Remove a record. Returns whether a row was deleted.
    async fn delete(&self, archive_key: &str, display_name: &str) -> Result<bool, DieselError>;
}

/// Diesel-backed thread repository.
#[derive(Debug, Clone)]
pub struct DieselThreadRepository {
    pool: DbPool,
}

impl DieselThreadRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, record: &ThreadRecord) -> Result<(), DieselError> {
        let document_path = record
            .document_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());
        let images_folder = record.images_folder.to_string_lossy().into_owned();
        let image_count = i32::try_from(record.image_count).unwrap_or(i32::MAX);
        let captured_at = record.captured_at.to_rfc3339();

        with_conn!(self.pool, conn => {
            diesel::sql_query(UPSERT_SQL)
                .bind::<Text, _>(&record.archive_key)
                .bind::<Text, _>(&record.display_name)
                .bind::<Nullable<Text>, _>(record.source_url.as_deref())
                .bind::<Nullable<Text>, _>(document_path.as_deref())
                .bind::<Text, _>(&images_folder)
                .bind::<Integer, _>(image_count)
                .bind::<Text, _>(&captured_at)
                .execute(&mut conn)
                .await?;
            Ok(())
        })
    }

    pub async fn get(
        &self,
        archive_key: &str,
        display_name: &str,
    ) -> Result<Option<ThreadRecord>, DieselError> {
        with_conn!(self.pool, conn => {
            threads::table
                .filter(threads::archive_key.eq(archive_key))
                .filter(threads::display_name.eq(display_name))
                .select(ThreadRow::as_select())
                .first(&mut conn)
                .await
                .optional()
                .map(|row| row.map(ThreadRecord::from))
        })
    }

    pub async fn search(&self, query: &str) -> Result<Vec<ThreadRecord>, DieselError> {
        let query = query.trim();
        if query.is_empty() {
            return self.list_all().await;
        }
        let pattern = format!("%{}%", escape_like(query));

        with_conn!(self.pool, conn => {
            threads::table
                .filter(
                    threads::archive_key
                        .like(&pattern)
                        .escape('\\')
                        .or(threads::display_name.like(&pattern).escape('\\')),
                )
                .order((threads::captured_at.desc(), threads::id.desc()))
                .select(ThreadRow::as_select())
                .load(&mut conn)
                .await
                .map(|rows| rows.into_iter().map(ThreadRecord::from).collect())
        })
    }

    pub async fn list_all(&self) -> Result<Vec<ThreadRecord>, DieselError> {
        with_conn!(self.pool, conn => {
            threads::table
                .order((threads::captured_at.desc(), threads::id.desc()))
                .select(ThreadRow::as_select())
                .load(&mut conn)
                .await
                .map(|rows| rows.into_iter().map(ThreadRecord::from).collect())
        })
    }

    pub async fn list_by_key(&self, archive_key: &str) -> Result<Vec<ThreadRecord>, DieselError> {
        with_conn!(self.pool, conn => {
            threads::table
                .filter(threads::archive_key.eq(archive_key))
                .order(threads::display_name.asc())
                .select(ThreadRow::as_select())
                .load(&mut conn)
                .await
                .map(|rows| rows.into_iter().map(ThreadRecord::from).collect())
        })
    }

    pub async fn distinct_keys(&self) -> Result<Vec<String>, DieselError> {
        with_conn!(self.pool, conn => {
            threads::table
                .select(threads::archive_key)
                .distinct()
                .order(threads::archive_key.asc())
                .load::<String>(&mut conn)
                .await
        })
    }

    pub async fn delete(&self, archive_key: &str, display_name: &str) -> Result<bool, DieselError> {
        with_conn!(self.pool, conn => {
            let rows = diesel::delete(
                threads::table
                    .filter(threads::archive_key.eq(archive_key))
                    .filter(threads::display_name.eq(display_name)),
            )
            .execute(&mut conn)
            .await?;
            Ok(rows > 0)
        })
    }
}

#[async_trait]
impl ThreadStore for DieselThreadRepository {
    async fn upsert(&self, record: &ThreadRecord) -> Result<(), DieselError> {
        DieselThreadRepository::upsert(self, record).await
    }

    async fn get(
        &self,
        archive_key: &str,
        display_name: &str,
    ) -> Result<Option<ThreadRecord>, DieselError> {
        DieselThreadRepository::get(self, archive_key, display_name).await
    }

    async fn search(&self, query: &str) -> Result<Vec<ThreadRecord>, DieselError> {
        DieselThreadRepository::search(self, query).await
    }

    async fn list_all(&self) -> Result<Vec<ThreadRecord>, DieselError> {
        DieselThreadRepository::list_all(self).await
    }

    async fn list_by_key(&self, archive_key: &str) -> Result<Vec<ThreadRecord>, DieselError> {
        DieselThreadRepository::list_by_key(self, archive_key).await
    }

    async fn distinct_keys(&self) -> Result<Vec<String>, DieselError> {
        DieselThreadRepository::distinct_keys(self).await
    }

    async fn delete(&self, archive_key: &str, display_name: &str) -> Result<bool, DieselError> {
        DieselThreadRepository::delete(self, archive_key, display_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::path::PathBuf;
    use tempfile::TempDir;

    use crate::repository::DbContext;

    async fn setup_test_db() -> (DieselThreadRepository, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DbContext::from_sqlite_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        (ctx.threads(), dir)
    }

    fn record(key: &str, name: &str, count: usize) -> ThreadRecord {
        ThreadRecord {
            archive_key: key.to_string(),
            display_name: name.to_string(),
            source_url: Some(format!("https://fuoverflow.com/threads/{}.1/", name)),
            document_path: Some(PathBuf::from(format!("archive/documents/{key}/{name}.pdf"))),
            images_folder: PathBuf::from(format!("archive/images/{key}/{name}")),
            image_count: count,
            captured_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let (repo, _dir) = setup_test_db().await;

        repo.upsert(&record("JPD113", "JPD113_SU25", 3)).await.unwrap();
        repo.upsert(&record("JPD113", "JPD113_SU25", 7)).await.unwrap();

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].image_count, 7);
    }

    #[tokio::test]
    async fn test_upsert_keeps_known_source_url() {
        let (repo, _dir) = setup_test_db().await;

        repo.upsert(&record("MAS291", "MAS291_FA23", 2)).await.unwrap();
        let mut recovered = record("MAS291", "MAS291_FA23", 2);
        recovered.source_url = None;
        recovered.document_path = None;
        repo.upsert(&recovered).await.unwrap();

        let fetched = repo.get("MAS291", "MAS291_FA23").await.unwrap().unwrap();
        assert_eq!(
            fetched.source_url.as_deref(),
            Some("https://fuoverflow.com/threads/MAS291_FA23.1/")
        );
        assert!(fetched.document_path.is_none());
    }

    #[tokio::test]
    async fn test_get_missing() {
        let (repo, _dir) = setup_test_db().await;
        assert!(repo.get("NOPE", "NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_matches_key_or_name_newest_first() {
        let (repo, _dir) = setup_test_db().await;

        let mut old = record("JPD113", "JPD113_SU25", 1);
        old.captured_at = Utc::now() - Duration::hours(2);
        repo.upsert(&old).await.unwrap();
        repo.upsert(&record("JPD113", "JPD113_FA24", 1)).await.unwrap();
        repo.upsert(&record("MAS291", "MAS291_FA23", 1)).await.unwrap();

        let hits = repo.search("jpd").await.unwrap();
        let names: Vec<_> = hits.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(names, vec!["JPD113_FA24", "JPD113_SU25"]);

        assert_eq!(repo.search("fa2").await.unwrap().len(), 2);
        assert_eq!(repo.search("  ").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_search_wildcards_are_literal() {
        let (repo, _dir) = setup_test_db().await;
        repo.upsert(&record("JPD113", "JPD113_SU25", 1)).await.unwrap();
        repo.upsert(&record("JPD113", "JPD113XSU25", 1)).await.unwrap();

        let hits = repo.search("3_S").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].display_name, "JPD113_SU25");
    }

    #[tokio::test]
    async fn test_list_by_key_and_distinct_keys() {
        let (repo, _dir) = setup_test_db().await;
        repo.upsert(&record("MAS291", "MAS291_SU24", 1)).await.unwrap();
        repo.upsert(&record("JPD113", "JPD113_SU25", 1)).await.unwrap();
        repo.upsert(&record("MAS291", "MAS291_FA23", 1)).await.unwrap();

        assert_eq!(repo.distinct_keys().await.unwrap(), vec!["JPD113", "MAS291"]);
        let names: Vec<_> = repo
            .list_by_key("MAS291")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.display_name)
            .collect();
        assert_eq!(names, vec!["MAS291_FA23", "MAS291_SU24"]);
    }

    #[tokio::test]
    async fn test_delete() {
        let (repo, _dir) = setup_test_db().await;
        repo.upsert(&record("JPD113", "JPD113_SU25", 1)).await.unwrap();

        assert!(repo.delete("JPD113", "JPD113_SU25").await.unwrap());
        assert!(!repo.delete("JPD113", "JPD113_SU25").await.unwrap());
        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_trait_object_dispatch() {
        let (repo, _dir) = setup_test_db().await;
        let store: std::sync::Arc<dyn ThreadStore> = std::sync::Arc::new(repo);
        store.upsert(&record("JPD113", "JPD113_SU25", 4)).await.unwrap();
        let fetched = store.get("JPD113", "JPD113_SU25").await.unwrap().unwrap();
        assert_eq!(fetched.image_count, 4);
    }
}
