//! Archive-batch recipe: compress each changed folder to `<folder_key>.tar.gz`
//! under the zip tree, then have the job itself write the terminal status
//! back to the catalog.

use lidar_cluster::{JobManifest, ResourceRequirements, VolumeBinding};
use lidar_core::batch_job_name;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ArchiveWorkItem {
    /// `mission_key/subfolder`, relative to `original_root` and `zip_root`.
    pub folder_key: String,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub image: String,
    pub namespace: String,
    pub original_root: PathBuf,
    pub zip_root: PathBuf,
    pub db_path: PathBuf,
    pub parallelism: Option<u32>,
}

fn archive_item_script(item: &ArchiveWorkItem, opts: &BatchOptions) -> String {
    let folder_key = &item.folder_key;
    let source = opts.original_root.join(folder_key);
    let dest = opts.zip_root.join(format!("{}.tar.gz", folder_key));
    let parent = source.parent().map(|p| p.display().to_string()).unwrap_or_default();
    let base = source.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();

    let dest_q = crate::shell_quote(&dest.display().to_string());
    let parent_q = crate::shell_quote(&parent);
    let base_q = crate::shell_quote(&base);
    let db_q = crate::shell_quote(&opts.db_path.display().to_string());
    let key_q = crate::shell_quote(folder_key);

    format!(
        "start=$(date +%s)\n\
         mkdir -p \"$(dirname {dest_q})\" && \\\n\
         tar -C {parent_q} --use-compress-program=pigz -cf {dest_q} {base_q} && \\\n\
         lidar-mark-terminal --db-path {db_q} folder {key_q} complete --elapsed-s \"$(($(date +%s) - start))\" || \\\n\
         lidar-mark-terminal --db-path {db_q} folder {key_q} failed --elapsed-s \"$(($(date +%s) - start))\" --error 'archive step failed'"
    )
}

/// Render the archive-batch job: one shell command per item, run with the
/// caller's parallelism cap via `xargs -P`.
pub fn render_archive_batch(items: &[ArchiveWorkItem], opts: &BatchOptions, now: chrono::DateTime<chrono::Utc>) -> JobManifest {
    let parallelism = crate::effective_parallelism(opts.parallelism, items.len());
    let scripts: Vec<String> = items.iter().map(|item| archive_item_script(item, opts)).collect();
    let script = crate::render_batch_script(&scripts, parallelism);

    JobManifest {
        name: batch_job_name("archive", now),
        namespace: opts.namespace.clone(),
        image: opts.image.clone(),
        command: vec!["/bin/sh".to_string(), "-c".to_string()],
        args: vec![script],
        env: vec![],
        parallelism,
        backoff_limit: crate::BATCH_BACKOFF_LIMIT,
        ttl_seconds_after_finished: crate::TTL_AFTER_FINISHED_S,
        volumes: vec![
            VolumeBinding {
                name: "orig".to_string(),
                host_path: opts.original_root.clone(),
                mount_path: opts.original_root.display().to_string(),
                read_only: false,
            },
            VolumeBinding {
                name: "zip".to_string(),
                host_path: opts.zip_root.clone(),
                mount_path: opts.zip_root.display().to_string(),
                read_only: false,
            },
        ],
        resources: ResourceRequirements::single_processor(),
    }
}
