//! Single-processor recipe: one job per `/start-job` request.

use lidar_cluster::{JobManifest, ResourceRequirements, VolumeBinding};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SingleOptions {
    pub image: String,
    pub namespace: String,
    pub data_root: PathBuf,
    pub output_root: PathBuf,
}

/// Render the single-processor job. Returns the manifest plus the
/// `unique_filename` it injected, so the caller can record `output_path` in
/// the `JobStatus` it writes to the Registry.
///
/// `job_name` and `unique_filename` are injected rather than generated here
/// so the recipe stays pure and testable without id-generation side effects.
pub fn render_single_processor(
    cli_args: &[String],
    job_name: String,
    unique_filename: String,
    opts: &SingleOptions,
) -> JobManifest {
    let output_arg = format!("-o={}/{}", opts.output_root.display(), unique_filename);
    let mut args = cli_args.to_vec();
    args.push(output_arg);

    JobManifest {
        name: job_name,
        namespace: opts.namespace.clone(),
        image: opts.image.clone(),
        command: vec![],
        args,
        env: vec![],
        parallelism: 1,
        backoff_limit: crate::SINGLE_BACKOFF_LIMIT,
        ttl_seconds_after_finished: crate::TTL_AFTER_FINISHED_S,
        volumes: vec![
            VolumeBinding {
                name: "data".to_string(),
                host_path: opts.data_root.clone(),
                mount_path: opts.data_root.display().to_string(),
                read_only: true,
            },
            VolumeBinding {
                name: "output".to_string(),
                host_path: opts.output_root.clone(),
                mount_path: opts.output_root.display().to_string(),
                read_only: false,
            },
        ],
        resources: ResourceRequirements::single_processor(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> SingleOptions {
        SingleOptions {
            image: "lidar-processor:latest".to_string(),
            namespace: "default".to_string(),
            data_root: PathBuf::from("/data"),
            output_root: PathBuf::from("/output"),
        }
    }

    #[test]
    fn output_flag_is_appended_last() {
        let cli_args = vec!["/data/a.las".to_string(), "-f=lasv14".to_string()];
        let manifest =
            render_single_processor(&cli_args, "job-abcd1234".to_string(), "output_deadbeef.bin".to_string(), &opts());

        assert_eq!(manifest.args, vec!["/data/a.las", "-f=lasv14", "-o=/output/output_deadbeef.bin"]);
        assert_eq!(manifest.name, "job-abcd1234");
    }

    #[test]
    fn data_volume_is_read_only() {
        let manifest = render_single_processor(&[], "job-1".to_string(), "output_1.bin".to_string(), &opts());
        let data_volume = manifest.volumes.iter().find(|v| v.name == "data").unwrap();
        assert!(data_volume.read_only);
    }

    #[test]
    fn backoff_limit_is_zero_for_single_requests() {
        let manifest = render_single_processor(&[], "job-1".to_string(), "output_1.bin".to_string(), &opts());
        assert_eq!(manifest.backoff_limit, 0);
    }
}
