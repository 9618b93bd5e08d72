//! Durable `folder_key -> FolderRecord` / `mission_key -> MissionMetacloudRecord`
//! mapping, backed by `rusqlite` with WAL journaling.
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod error;
mod row;

pub use error::CatalogError;

use lidar_core::{FolderRecord, MissionMetacloudRecord, ProcessingStatus};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;

const BUSY_TIMEOUT_MS: u32 = 10_000;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS folder_state (
    folder_key TEXT PRIMARY KEY,
    mission_key TEXT NOT NULL,
    fp TEXT NOT NULL,
    size_kb INTEGER NOT NULL,
    file_count INTEGER NOT NULL,
    last_checked INTEGER NOT NULL,
    last_processed INTEGER,
    processing_time INTEGER,
    processing_status TEXT NOT NULL,
    error_message TEXT,
    output_path TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_folder_state_mission ON folder_state(mission_key);

CREATE TABLE IF NOT EXISTS potree_metacloud_state (
    mission_key TEXT PRIMARY KEY,
    fp TEXT NOT NULL,
    output_path TEXT NOT NULL,
    last_checked INTEGER NOT NULL,
    last_processed INTEGER,
    processing_time INTEGER,
    processing_status TEXT NOT NULL,
    error_message TEXT
);
"#;

/// New field values an `upsert_on_change` applies to a `folder_state` row.
#[derive(Debug, Clone)]
pub struct FolderUpdate {
    pub mission_key: String,
    pub fingerprint: String,
    pub size_kb: u64,
    pub file_count: u64,
    pub output_path: String,
}

#[derive(Debug, Clone)]
pub struct MetacloudUpdate {
    pub fingerprint: String,
    pub output_path: String,
}

/// Single-connection, mutex-guarded handle onto the SQLite catalog.
///
/// A `parking_lot::Mutex` serializes every operation in-process; SQLite's own
/// `busy_timeout` covers cross-process contention on the same file, so writers
/// are retried with a bounded busy timeout rather than failing outright.
pub struct Catalog {
    conn: Mutex<Connection>,
}

impl Catalog {
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open(path).map_err(CatalogError::fatal)?;
        conn.pragma_update(None, "journal_mode", "WAL").map_err(CatalogError::fatal)?;
        conn.busy_timeout(std::time::Duration::from_millis(BUSY_TIMEOUT_MS as u64))
            .map_err(CatalogError::fatal)?;
        conn.execute_batch(SCHEMA).map_err(CatalogError::fatal)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory().map_err(CatalogError::fatal)?;
        conn.execute_batch(SCHEMA).map_err(CatalogError::fatal)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn get_folder(&self, folder_key: &str) -> Result<Option<FolderRecord>, CatalogError> {
        let conn = self.conn.lock();
        row::get_folder(&conn, folder_key)
    }

    pub fn get_mission(&self, mission_key: &str) -> Result<Option<MissionMetacloudRecord>, CatalogError> {
        let conn = self.conn.lock();
        row::get_mission(&conn, mission_key)
    }

    /// Insert-or-update a folder record. If the fingerprint changed, or the
    /// prior status warrants reprocessing, resets `last_processed` to `None`
    /// and `processing_status` to `pending`.
    pub fn upsert_folder_on_change(
        &self,
        folder_key: &str,
        update: &FolderUpdate,
        now: i64,
    ) -> Result<(), CatalogError> {
        let conn = self.conn.lock();
        let existing = row::get_folder(&conn, folder_key)?;

        let (status, last_processed, processing_time, error_message) = match &existing {
            Some(prev) if prev.fingerprint == update.fingerprint && !prev.processing_status.needs_reprocessing() => {
                (prev.processing_status.as_str(), prev.last_processed_epoch, prev.processing_time_s, prev.error_message.clone())
            }
            _ => (ProcessingStatus::Pending.as_str(), None::<i64>, None::<i64>, None::<String>),
        };

        conn.execute(
            "INSERT INTO folder_state
                (folder_key, mission_key, fp, size_kb, file_count, last_checked,
                 last_processed, processing_time, processing_status, error_message, output_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(folder_key) DO UPDATE SET
                mission_key = excluded.mission_key,
                fp = excluded.fp,
                size_kb = excluded.size_kb,
                file_count = excluded.file_count,
                last_checked = excluded.last_checked,
                last_processed = excluded.last_processed,
                processing_time = excluded.processing_time,
                processing_status = excluded.processing_status,
                error_message = excluded.error_message,
                output_path = excluded.output_path",
            params![
                folder_key,
                update.mission_key,
                update.fingerprint,
                update.size_kb,
                update.file_count,
                now,
                last_processed,
                processing_time,
                status,
                error_message,
                update.output_path,
            ],
        )
        .map_err(CatalogError::from_rusqlite)?;
        Ok(())
    }

    pub fn upsert_mission_on_change(
        &self,
        mission_key: &str,
        update: &MetacloudUpdate,
        now: i64,
    ) -> Result<(), CatalogError> {
        let conn = self.conn.lock();
        let existing = row::get_mission(&conn, mission_key)?;

        let (status, last_processed, processing_time, error_message) = match &existing {
            Some(prev) if prev.fingerprint == update.fingerprint && !prev.processing_status.needs_reprocessing() => {
                (prev.processing_status.as_str(), prev.last_processed_epoch, prev.processing_time_s, prev.error_message.clone())
            }
            _ => (ProcessingStatus::Pending.as_str(), None::<i64>, None::<i64>, None::<String>),
        };

        conn.execute(
            "INSERT INTO potree_metacloud_state
                (mission_key, fp, output_path, last_checked, last_processed,
                 processing_time, processing_status, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(mission_key) DO UPDATE SET
                fp = excluded.fp,
                output_path = excluded.output_path,
                last_checked = excluded.last_checked,
                last_processed = excluded.last_processed,
                processing_time = excluded.processing_time,
                processing_status = excluded.processing_status,
                error_message = excluded.error_message",
            params![
                mission_key,
                update.fingerprint,
                update.output_path,
                now,
                last_processed,
                processing_time,
                status,
                error_message,
            ],
        )
        .map_err(CatalogError::from_rusqlite)?;
        Ok(())
    }

    pub fn mark_folder_running(&self, folder_key: &str) -> Result<(), CatalogError> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE folder_state SET processing_status = ?1 WHERE folder_key = ?2",
            params![ProcessingStatus::Running.as_str(), folder_key],
        )
        .map_err(CatalogError::from_rusqlite)?;
        Ok(())
    }

    pub fn mark_folder_terminal(
        &self,
        folder_key: &str,
        status: ProcessingStatus,
        elapsed_s: i64,
        error: Option<&str>,
        now: i64,
    ) -> Result<(), CatalogError> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE folder_state
             SET processing_status = ?1, last_processed = ?2, processing_time = ?3, error_message = ?4
             WHERE folder_key = ?5",
            params![status.as_str(), now, elapsed_s, error, folder_key],
        )
        .map_err(CatalogError::from_rusqlite)?;
        Ok(())
    }

    pub fn mark_mission_running(&self, mission_key: &str) -> Result<(), CatalogError> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE potree_metacloud_state SET processing_status = ?1 WHERE mission_key = ?2",
            params![ProcessingStatus::Running.as_str(), mission_key],
        )
        .map_err(CatalogError::from_rusqlite)?;
        Ok(())
    }

    pub fn mark_mission_terminal(
        &self,
        mission_key: &str,
        status: ProcessingStatus,
        elapsed_s: i64,
        error: Option<&str>,
        now: i64,
    ) -> Result<(), CatalogError> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE potree_metacloud_state
             SET processing_status = ?1, last_processed = ?2, processing_time = ?3, error_message = ?4
             WHERE mission_key = ?5",
            params![status.as_str(), now, elapsed_s, error, mission_key],
        )
        .map_err(CatalogError::from_rusqlite)?;
        Ok(())
    }

    pub fn list_folders_by_status(&self, status: ProcessingStatus) -> Result<Vec<FolderRecord>, CatalogError> {
        let conn = self.conn.lock();
        row::list_folders(&conn, "WHERE processing_status = ?1", params![status.as_str()])
    }

    pub fn list_folders_by_mission(&self, mission_key: &str) -> Result<Vec<FolderRecord>, CatalogError> {
        let conn = self.conn.lock();
        row::list_folders(&conn, "WHERE mission_key = ?1", params![mission_key])
    }

    pub fn list_folders_by_prefix(&self, prefix: &str) -> Result<Vec<FolderRecord>, CatalogError> {
        let conn = self.conn.lock();
        let like = format!("{}%", prefix.replace('%', "\\%"));
        row::list_folders(&conn, "WHERE folder_key LIKE ?1 ESCAPE '\\'", params![like])
    }

    pub fn list_all_folders(&self, limit: i64, offset: i64) -> Result<Vec<FolderRecord>, CatalogError> {
        let conn = self.conn.lock();
        row::list_folders(&conn, "ORDER BY folder_key LIMIT ?1 OFFSET ?2", params![limit, offset])
    }

    pub fn list_all_missions(&self) -> Result<Vec<MissionMetacloudRecord>, CatalogError> {
        let conn = self.conn.lock();
        row::list_missions(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(fingerprint: &str) -> FolderUpdate {
        FolderUpdate {
            mission_key: "mission-a".to_string(),
            fingerprint: fingerprint.to_string(),
            size_kb: 10,
            file_count: 2,
            output_path: "mission-a/folder-a.tar.gz".to_string(),
        }
    }

    #[test]
    fn first_upsert_creates_pending_record() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.upsert_folder_on_change("mission-a/folder-a", &update("fp1"), 100).unwrap();

        let record = catalog.get_folder("mission-a/folder-a").unwrap().unwrap();
        assert_eq!(record.processing_status, ProcessingStatus::Pending);
        assert_eq!(record.fingerprint, "fp1");
        assert!(record.last_processed_epoch.is_none());
    }

    #[test]
    fn unchanged_fingerprint_and_terminal_status_preserves_history() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.upsert_folder_on_change("mission-a/folder-a", &update("fp1"), 100).unwrap();
        catalog
            .mark_folder_terminal("mission-a/folder-a", ProcessingStatus::Complete, 42, None, 150)
            .unwrap();

        catalog.upsert_folder_on_change("mission-a/folder-a", &update("fp1"), 200).unwrap();

        let record = catalog.get_folder("mission-a/folder-a").unwrap().unwrap();
        assert_eq!(record.processing_status, ProcessingStatus::Complete);
        assert_eq!(record.last_processed_epoch, Some(150));
        assert_eq!(record.processing_time_s, Some(42));
    }

    #[test]
    fn changed_fingerprint_resets_to_pending() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.upsert_folder_on_change("mission-a/folder-a", &update("fp1"), 100).unwrap();
        catalog
            .mark_folder_terminal("mission-a/folder-a", ProcessingStatus::Complete, 42, None, 150)
            .unwrap();

        catalog.upsert_folder_on_change("mission-a/folder-a", &update("fp2"), 200).unwrap();

        let record = catalog.get_folder("mission-a/folder-a").unwrap().unwrap();
        assert_eq!(record.processing_status, ProcessingStatus::Pending);
        assert!(record.last_processed_epoch.is_none());
    }

    #[test]
    fn failed_status_is_retried_even_without_fingerprint_change() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.upsert_folder_on_change("mission-a/folder-a", &update("fp1"), 100).unwrap();
        catalog
            .mark_folder_terminal("mission-a/folder-a", ProcessingStatus::Failed, 5, Some("boom"), 150)
            .unwrap();

        catalog.upsert_folder_on_change("mission-a/folder-a", &update("fp1"), 200).unwrap();

        let record = catalog.get_folder("mission-a/folder-a").unwrap().unwrap();
        assert_eq!(record.processing_status, ProcessingStatus::Pending);
    }

    #[test]
    fn list_by_mission_and_prefix() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.upsert_folder_on_change("mission-a/folder-a", &update("fp1"), 100).unwrap();
        catalog.upsert_folder_on_change("mission-a/folder-b", &update("fp1"), 100).unwrap();
        catalog
            .upsert_folder_on_change(
                "mission-b/folder-a",
                &FolderUpdate { mission_key: "mission-b".to_string(), ..update("fp1") },
                100,
            )
            .unwrap();

        assert_eq!(catalog.list_folders_by_mission("mission-a").unwrap().len(), 2);
        assert_eq!(catalog.list_folders_by_prefix("mission-a/").unwrap().len(), 2);
        assert_eq!(catalog.list_all_folders(10, 0).unwrap().len(), 3);
    }

    #[test]
    fn mark_running_transitions_status_only() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.upsert_folder_on_change("mission-a/folder-a", &update("fp1"), 100).unwrap();
        catalog.mark_folder_running("mission-a/folder-a").unwrap();

        let record = catalog.get_folder("mission-a/folder-a").unwrap().unwrap();
        assert_eq!(record.processing_status, ProcessingStatus::Running);
    }

    #[test]
    fn missing_record_returns_none() {
        let catalog = Catalog::open_in_memory().unwrap();
        assert!(catalog.get_folder("nope").unwrap().is_none());
    }

    #[test]
    fn mission_upsert_round_trips() {
        let catalog = Catalog::open_in_memory().unwrap();
        let update = MetacloudUpdate { fingerprint: "fp1".to_string(), output_path: "mission-a.bin".to_string() };
        catalog.upsert_mission_on_change("mission-a", &update, 100).unwrap();

        let record = catalog.get_mission("mission-a").unwrap().unwrap();
        assert_eq!(record.processing_status, ProcessingStatus::Pending);
        assert_eq!(catalog.list_all_missions().unwrap().len(), 1);
    }

    #[test]
    fn mark_mission_running_transitions_status_only() {
        let catalog = Catalog::open_in_memory().unwrap();
        let update = MetacloudUpdate { fingerprint: "fp1".to_string(), output_path: "mission-a.bin".to_string() };
        catalog.upsert_mission_on_change("mission-a", &update, 100).unwrap();

        catalog.mark_mission_running("mission-a").unwrap();

        let record = catalog.get_mission("mission-a").unwrap().unwrap();
        assert_eq!(record.processing_status, ProcessingStatus::Running);
    }

    #[test]
    fn mark_mission_terminal_records_failure() {
        let catalog = Catalog::open_in_memory().unwrap();
        let update = MetacloudUpdate { fingerprint: "fp1".to_string(), output_path: "mission-a.bin".to_string() };
        catalog.upsert_mission_on_change("mission-a", &update, 100).unwrap();

        catalog.mark_mission_terminal("mission-a", ProcessingStatus::Failed, 9, Some("boom"), 150).unwrap();

        let record = catalog.get_mission("mission-a").unwrap().unwrap();
        assert_eq!(record.processing_status, ProcessingStatus::Failed);
        assert_eq!(record.error_message.as_deref(), Some("boom"));
        assert_eq!(record.last_processed_epoch, Some(150));
    }
}
