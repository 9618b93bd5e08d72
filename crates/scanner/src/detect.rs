//! Change Detector: walk `original_root`, fingerprint every
//! `mission/subfolder`, diff against the Catalog, and emit worklists. Never
//! submits jobs itself.

use lidar_catalog::{Catalog, CatalogError, FolderUpdate, MetacloudUpdate};
use lidar_core::folder_key;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("io error walking {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
}

#[derive(Debug, Clone, Default)]
pub struct DetectOptions {
    /// Skip the catalog upsert; still emit the same worklist.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FolderWorkItem {
    pub folder_key: String,
    pub mission_key: String,
    pub fingerprint: String,
    pub size_kb: u64,
    pub file_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManifestWorkItem {
    pub mission_key: String,
    pub fingerprint: String,
    pub metacloud_relpath: String,
}

#[derive(Debug, Clone, Default)]
pub struct Worklists {
    pub folders: Vec<FolderWorkItem>,
    pub manifests: Vec<ManifestWorkItem>,
}

/// Run one scan pass over `original_root`.
pub fn detect(
    catalog: &Catalog,
    original_root: &Path,
    opts: &DetectOptions,
    now: i64,
) -> Result<Worklists, DetectError> {
    let mut worklists = Worklists::default();

    for mission_entry in list_subdirs(original_root)? {
        let mission_key = file_name(&mission_entry);
        let mut mission_has_folder = false;

        for folder_entry in list_subdirs(&mission_entry)? {
            let subfolder = file_name(&folder_entry);
            let key = folder_key(&mission_key, &subfolder);

            let fingerprint = match lidar_fingerprint::fingerprint_dir(&folder_entry) {
                Ok(fp) => fp,
                Err(err) => {
                    warn!(folder = %key, %err, "failed to fingerprint folder, skipping");
                    continue;
                }
            };
            let (size_kb, file_count) = dir_stats(&folder_entry);

            let existing = catalog.get_folder(&key)?;
            let needs_processing = match &existing {
                None => true,
                Some(prev) => prev.fingerprint != fingerprint || prev.processing_status.needs_reprocessing(),
            };

            if needs_processing {
                mission_has_folder = true;
                worklists.folders.push(FolderWorkItem {
                    folder_key: key.clone(),
                    mission_key: mission_key.clone(),
                    fingerprint: fingerprint.clone(),
                    size_kb,
                    file_count,
                });

                if !opts.dry_run {
                    catalog.upsert_folder_on_change(
                        &key,
                        &FolderUpdate {
                            mission_key: mission_key.clone(),
                            fingerprint,
                            size_kb,
                            file_count,
                            output_path: lidar_core::archive_output_path(&key),
                        },
                        now,
                    )?;
                }
            } else {
                mission_has_folder = true;
            }
        }

        if !mission_has_folder {
            continue;
        }

        if let Some(metacloud_path) = find_metacloud(&mission_entry)? {
            let fingerprint = match lidar_fingerprint::fingerprint_file(&metacloud_path) {
                Ok(fp) => fp,
                Err(err) => {
                    warn!(mission = %mission_key, %err, "failed to fingerprint metacloud file, skipping");
                    continue;
                }
            };

            let existing = catalog.get_mission(&mission_key)?;
            let needs_processing = match &existing {
                None => true,
                Some(prev) => prev.fingerprint != fingerprint || prev.processing_status.needs_reprocessing(),
            };

            if needs_processing {
                let relpath = metacloud_path
                    .strip_prefix(original_root)
                    .unwrap_or(&metacloud_path)
                    .to_string_lossy()
                    .replace(std::path::MAIN_SEPARATOR, "/");

                worklists.manifests.push(ManifestWorkItem {
                    mission_key: mission_key.clone(),
                    fingerprint: fingerprint.clone(),
                    metacloud_relpath: relpath,
                });

                if !opts.dry_run {
                    catalog.upsert_mission_on_change(
                        &mission_key,
                        &MetacloudUpdate { fingerprint, output_path: format!("viewer/{}", mission_key) },
                        now,
                    )?;
                }
            }
        }
    }

    Ok(worklists)
}

fn list_subdirs(dir: &Path) -> Result<Vec<PathBuf>, DetectError> {
    let read_dir = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(DetectError::Io { path: dir.display().to_string(), source: err }),
    };

    let mut dirs = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| DetectError::Io { path: dir.display().to_string(), source: e })?;
        match entry.file_type() {
            Ok(ft) if ft.is_dir() => dirs.push(entry.path()),
            Ok(_) => {}
            Err(err) => warn!(path = %entry.path().display(), %err, "failed to stat directory entry, skipping"),
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
}

fn dir_stats(dir: &Path) -> (u64, u64) {
    let mut size_bytes = 0u64;
    let mut file_count = 0u64;
    walk_stats(dir, &mut size_bytes, &mut file_count);
    (size_bytes / 1024, file_count)
}

fn walk_stats(dir: &Path, size_bytes: &mut u64, file_count: &mut u64) {
    let Ok(read_dir) = fs::read_dir(dir) else { return };
    for entry in read_dir.flatten() {
        let path = entry.path();
        let Ok(metadata) = entry.metadata() else { continue };
        if metadata.is_dir() {
            walk_stats(&path, size_bytes, file_count);
        } else if metadata.is_file() {
            *size_bytes += metadata.len();
            *file_count += 1;
        }
    }
}

/// Locate at most one `*.metacloud` file directly under `mission_dir`; first
/// hit in directory-listing order wins, with a warning if more than one
/// exists.
fn find_metacloud(mission_dir: &Path) -> Result<Option<PathBuf>, DetectError> {
    let read_dir = match fs::read_dir(mission_dir) {
        Ok(rd) => rd,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(DetectError::Io { path: mission_dir.display().to_string(), source: err }),
    };

    let mut found: Option<PathBuf> = None;
    let mut extra = 0;
    for entry in read_dir {
        let entry = entry.map_err(|e| DetectError::Io { path: mission_dir.display().to_string(), source: e })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("metacloud") {
            if found.is_none() {
                found = Some(path);
            } else {
                extra += 1;
            }
        }
    }
    if extra > 0 {
        warn!(mission = %mission_dir.display(), extra, "multiple .metacloud files found, using first encountered");
    }
    Ok(found)
}
