// src/storage/state.rs

//! Durable crawl state on SQLite.
//!
//! Two tables: `checkpoints` holds resume markers such as the current list
//! page, `processed` holds one row per notice with its status and the hash
//! of the last successfully extracted page. Every call opens its own
//! connection and commits before returning, so a new run sees everything a
//! crashed run wrote.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::Result;
use crate::models::NoticeStatus;

/// Checkpoint key for the list page being processed.
pub const PAGE_CHECKPOINT: &str = "bid_list.page";

/// SQLite-backed state store.
#[derive(Debug, Clone)]
pub struct StateStore {
    db_path: PathBuf,
}

impl StateStore {
    /// Open (or create) the store at `db_path`.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = Self { db_path };
        store.init_schema()?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(conn)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS processed (
                notice_id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                content_hash TEXT,
                last_seen_utc TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS checkpoints (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
        "#,
        )?;
        Ok(())
    }

    pub fn get_checkpoint(&self, key: &str) -> Result<Option<String>> {
        let conn = self.connect()?;
        let value = conn
            .query_row(
                "SELECT value FROM checkpoints WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_checkpoint(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO checkpoints (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// True only for notices whose detail was extracted successfully.
    pub fn is_processed(&self, notice_id: &str) -> Result<bool> {
        let conn = self.connect()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM processed WHERE notice_id = ?1 AND status = 'ok'",
                params![notice_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Record a listed notice. An existing row keeps its status and hash;
    /// only `last_seen_utc` is refreshed.
    pub fn mark_seen(&self, notice_id: &str, last_seen_utc: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO processed (notice_id, status, content_hash, last_seen_utc)
            VALUES (?1, 'seen', NULL, ?2)
            ON CONFLICT(notice_id) DO UPDATE SET last_seen_utc = excluded.last_seen_utc
            "#,
            params![notice_id, last_seen_utc],
        )?;
        Ok(())
    }

    /// Set the status of a notice. A `None` hash keeps the stored one.
    pub fn upsert_processed(
        &self,
        notice_id: &str,
        status: NoticeStatus,
        last_seen_utc: &str,
        content_hash: Option<&str>,
    ) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO processed (notice_id, status, content_hash, last_seen_utc)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(notice_id) DO UPDATE SET
                status = excluded.status,
                content_hash = COALESCE(excluded.content_hash, processed.content_hash),
                last_seen_utc = excluded.last_seen_utc
            "#,
            params![notice_id, status.as_str(), content_hash, last_seen_utc],
        )?;
        Ok(())
    }

    pub fn get_content_hash(&self, notice_id: &str) -> Result<Option<String>> {
        let conn = self.connect()?;
        let hash = conn
            .query_row(
                "SELECT content_hash FROM processed WHERE notice_id = ?1",
                params![notice_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(hash.flatten())
    }

    pub fn get_status(&self, notice_id: &str) -> Result<Option<NoticeStatus>> {
        let conn = self.connect()?;
        let status: Option<String> = conn
            .query_row(
                "SELECT status FROM processed WHERE notice_id = ?1",
                params![notice_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(status.as_deref().and_then(NoticeStatus::parse))
    }

    /// Number of notices per status, ordered by status name.
    pub fn status_counts(&self) -> Result<IndexMap<String, i64>> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM processed GROUP BY status ORDER BY status")?;
        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<std::result::Result<IndexMap<_, _>, _>>()?;
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TS: &str = "2026-02-08T10:00:00+00:00";

    fn store(tmp: &TempDir) -> StateStore {
        StateStore::open(tmp.path().join("state").join("state.sqlite")).unwrap()
    }

    #[test]
    fn test_checkpoint_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let first = store(&tmp);
        assert_eq!(first.get_checkpoint(PAGE_CHECKPOINT).unwrap(), None);
        first.set_checkpoint(PAGE_CHECKPOINT, "3").unwrap();
        drop(first);

        let second = store(&tmp);
        assert_eq!(
            second.get_checkpoint(PAGE_CHECKPOINT).unwrap().as_deref(),
            Some("3")
        );
        second.set_checkpoint(PAGE_CHECKPOINT, "4").unwrap();
        assert_eq!(
            second.get_checkpoint(PAGE_CHECKPOINT).unwrap().as_deref(),
            Some("4")
        );
    }

    #[test]
    fn test_mark_seen_does_not_downgrade_ok() {
        let tmp = TempDir::new().unwrap();
        let state = store(&tmp);
        state
            .upsert_processed("n1", NoticeStatus::Ok, TS, Some("h1"))
            .unwrap();
        state.mark_seen("n1", "2026-02-09T00:00:00+00:00").unwrap();

        assert!(state.is_processed("n1").unwrap());
        assert_eq!(state.get_status("n1").unwrap(), Some(NoticeStatus::Ok));
        assert_eq!(state.get_content_hash("n1").unwrap().as_deref(), Some("h1"));
    }

    #[test]
    fn test_seen_and_error_are_not_processed() {
        let tmp = TempDir::new().unwrap();
        let state = store(&tmp);
        state.mark_seen("n1", TS).unwrap();
        assert!(!state.is_processed("n1").unwrap());
        assert_eq!(state.get_status("n1").unwrap(), Some(NoticeStatus::Seen));

        state
            .upsert_processed("n1", NoticeStatus::Error, TS, None)
            .unwrap();
        assert!(!state.is_processed("n1").unwrap());
        assert!(!state.is_processed("unknown").unwrap());
    }

    #[test]
    fn test_error_keeps_previous_hash() {
        let tmp = TempDir::new().unwrap();
        let state = store(&tmp);
        state
            .upsert_processed("n1", NoticeStatus::Ok, TS, Some("h1"))
            .unwrap();
        state
            .upsert_processed("n1", NoticeStatus::Error, TS, None)
            .unwrap();
        assert_eq!(state.get_content_hash("n1").unwrap().as_deref(), Some("h1"));

        state
            .upsert_processed("n1", NoticeStatus::Ok, TS, Some("h2"))
            .unwrap();
        assert_eq!(state.get_content_hash("n1").unwrap().as_deref(), Some("h2"));
    }

    #[test]
    fn test_content_hash_absent() {
        let tmp = TempDir::new().unwrap();
        let state = store(&tmp);
        assert_eq!(state.get_content_hash("n1").unwrap(), None);
        state.mark_seen("n1", TS).unwrap();
        assert_eq!(state.get_content_hash("n1").unwrap(), None);
    }

    #[test]
    fn test_status_counts() {
        let tmp = TempDir::new().unwrap();
        let state = store(&tmp);
        state.mark_seen("a", TS).unwrap();
        state.mark_seen("b", TS).unwrap();
        state
            .upsert_processed("c", NoticeStatus::Ok, TS, Some("h"))
            .unwrap();

        let counts = state.status_counts().unwrap();
        assert_eq!(counts.get("seen"), Some(&2));
        assert_eq!(counts.get("ok"), Some(&1));
        assert_eq!(counts.get("error"), None);
    }
}
