use crate::error::CatalogError;
use lidar_core::{FolderRecord, MissionMetacloudRecord, ProcessingStatus};
use rusqlite::{Connection, Params, Row};

fn parse_status(raw: &str) -> ProcessingStatus {
    ProcessingStatus::parse(raw).unwrap_or(ProcessingStatus::Pending)
}

fn folder_from_row(row: &Row) -> rusqlite::Result<FolderRecord> {
    Ok(FolderRecord {
        folder_key: row.get("folder_key")?,
        mission_key: row.get("mission_key")?,
        fingerprint: row.get("fp")?,
        size_kb: row.get("size_kb")?,
        file_count: row.get("file_count")?,
        last_checked_epoch: row.get("last_checked")?,
        last_processed_epoch: row.get("last_processed")?,
        processing_status: parse_status(&row.get::<_, String>("processing_status")?),
        processing_time_s: row.get("processing_time")?,
        output_path: row.get("output_path")?,
        error_message: row.get("error_message")?,
    })
}

fn mission_from_row(row: &Row) -> rusqlite::Result<MissionMetacloudRecord> {
    Ok(MissionMetacloudRecord {
        mission_key: row.get("mission_key")?,
        fingerprint: row.get("fp")?,
        output_path: row.get("output_path")?,
        last_checked_epoch: row.get("last_checked")?,
        last_processed_epoch: row.get("last_processed")?,
        processing_time_s: row.get("processing_time")?,
        processing_status: parse_status(&row.get::<_, String>("processing_status")?),
        error_message: row.get("error_message")?,
    })
}

pub(crate) fn get_folder(conn: &Connection, folder_key: &str) -> Result<Option<FolderRecord>, CatalogError> {
    conn.query_row("SELECT * FROM folder_state WHERE folder_key = ?1", [folder_key], folder_from_row)
        .map(Some)
        .or_else(|err| match err {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(CatalogError::from_rusqlite(other)),
        })
}

pub(crate) fn get_mission(conn: &Connection, mission_key: &str) -> Result<Option<MissionMetacloudRecord>, CatalogError> {
    conn.query_row("SELECT * FROM potree_metacloud_state WHERE mission_key = ?1", [mission_key], mission_from_row)
        .map(Some)
        .or_else(|err| match err {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(CatalogError::from_rusqlite(other)),
        })
}

pub(crate) fn list_folders<P: Params>(
    conn: &Connection,
    clause: &str,
    params: P,
) -> Result<Vec<FolderRecord>, CatalogError> {
    let sql = format!("SELECT * FROM folder_state {}", clause);
    let mut stmt = conn.prepare(&sql).map_err(CatalogError::from_rusqlite)?;
    let rows = stmt
        .query_map(params, folder_from_row)
        .map_err(CatalogError::from_rusqlite)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(CatalogError::from_rusqlite)?;
    Ok(rows)
}

pub(crate) fn list_missions(conn: &Connection) -> Result<Vec<MissionMetacloudRecord>, CatalogError> {
    let mut stmt = conn
        .prepare("SELECT * FROM potree_metacloud_state ORDER BY mission_key")
        .map_err(CatalogError::from_rusqlite)?;
    let rows = stmt
        .query_map([], mission_from_row)
        .map_err(CatalogError::from_rusqlite)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(CatalogError::from_rusqlite)?;
    Ok(rows)
}
