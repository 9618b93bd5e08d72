//! Converter-batch recipe: turn each mission's `*.metacloud` manifest into a
//! viewer-ready output directory tree.

use lidar_cluster::{JobManifest, ResourceRequirements, VolumeBinding};
use lidar_core::batch_job_name;

#[derive(Debug, Clone)]
pub struct ConverterWorkItem {
    pub mission_key: String,
    /// Path to the mission's `*.metacloud` file, relative to `original_root`.
    pub metacloud_relpath: String,
}

fn converter_item_script(item: &ConverterWorkItem, opts: &crate::BatchOptions) -> String {
    let source = opts.original_root.join(&item.metacloud_relpath);
    let dest_dir = opts.zip_root.join("viewer").join(&item.mission_key);

    let dest_dir_q = crate::shell_quote(&dest_dir.display().to_string());
    let source_q = crate::shell_quote(&source.display().to_string());
    let db_q = crate::shell_quote(&opts.db_path.display().to_string());
    let key_q = crate::shell_quote(&item.mission_key);

    format!(
        "start=$(date +%s)\n\
         mkdir -p {dest_dir_q} && \\\n\
         convert-to-potree --input {source_q} --output {dest_dir_q} && \\\n\
         lidar-mark-terminal --db-path {db_q} mission {key_q} complete --elapsed-s \"$(($(date +%s) - start))\" || \\\n\
         lidar-mark-terminal --db-path {db_q} mission {key_q} failed --elapsed-s \"$(($(date +%s) - start))\" --error 'conversion step failed'"
    )
}

pub fn render_converter_batch(
    items: &[ConverterWorkItem],
    opts: &crate::BatchOptions,
    now: chrono::DateTime<chrono::Utc>,
) -> JobManifest {
    let parallelism = crate::effective_parallelism(opts.parallelism, items.len());
    let scripts: Vec<String> = items.iter().map(|item| converter_item_script(item, opts)).collect();
    let script = crate::render_batch_script(&scripts, parallelism);

    JobManifest {
        name: batch_job_name("convert", now),
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
