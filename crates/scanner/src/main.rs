//! `lidar-scand` — periodic scanner/enqueuer binary.
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod detect;

use clap::Parser;
use detect::{detect, DetectOptions};
use lidar_catalog::Catalog;
use lidar_cluster::{ClusterAdapter, KubernetesAdapter};
use lidar_core::{Clock, SystemClock};
use lidar_jobs::{render_archive_batch, render_converter_batch, ArchiveWorkItem, BatchOptions, ConverterWorkItem};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "lidar-scand", about = "LiDAR archive scanner and job enqueuer")]
struct Cli {
    #[arg(long, env = "LIDAR_ORIGINAL_ROOT", default_value = "./original_root")]
    original_root: PathBuf,

    #[arg(long, env = "LIDAR_ZIP_ROOT", default_value = "./zip_root")]
    zip_root: PathBuf,

    #[arg(long, env = "LIDAR_DB_PATH", default_value = "./state/catalog.sqlite3")]
    db_path: PathBuf,

    #[arg(long, env = "LIDAR_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[arg(long, env = "LIDAR_NAMESPACE", default_value = "default")]
    namespace: String,

    #[arg(long, env = "LIDAR_ARCHIVE_IMAGE", default_value = "lidar-archiver:latest")]
    archive_image: String,

    #[arg(long, env = "LIDAR_CONVERTER_IMAGE", default_value = "lidar-converter:latest")]
    converter_image: String,

    /// Check for changes without modifying the catalog or queueing jobs.
    #[arg(long)]
    dry_run: bool,

    /// Emit the worklist and perform the catalog upsert, but submit no cluster jobs.
    #[arg(long)]
    export_only: bool,

    /// Stop after this many items have been queued across both worklists (0 = unlimited).
    #[arg(long, default_value_t = 0)]
    max_jobs: usize,

    /// Parallelism cap passed to the batch job recipes.
    #[arg(long)]
    parallelism: Option<u32>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_new(&cli.log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    if let Err(err) = run(cli).await {
        tracing::error!(%err, "scan failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if !cli.original_root.is_dir() {
        warn!(path = %cli.original_root.display(), "original root does not exist, creating it");
        std::fs::create_dir_all(&cli.original_root)?;
    }
    if let Some(parent) = cli.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::create_dir_all(&cli.zip_root)?;

    let catalog = Catalog::open(&cli.db_path)?;
    let clock = SystemClock;
    let now = clock.epoch_s();

    let opts = DetectOptions { dry_run: cli.dry_run };
    let mut worklists = detect(&catalog, &cli.original_root, &opts, now)?;

    if cli.max_jobs > 0 {
        worklists.folders.truncate(cli.max_jobs);
        let remaining = cli.max_jobs.saturating_sub(worklists.folders.len());
        worklists.manifests.truncate(remaining);
    }

    info!(
        folders = worklists.folders.len(),
        manifests = worklists.manifests.len(),
        "scan complete"
    );

    if cli.export_only || cli.dry_run {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({
            "folders": worklists.folders.iter().map(|f| &f.folder_key).collect::<Vec<_>>(),
            "manifests": worklists.manifests.iter().map(|m| &m.mission_key).collect::<Vec<_>>(),
        }))?);
        return Ok(());
    }

    if worklists.folders.is_empty() && worklists.manifests.is_empty() {
        return Ok(());
    }

    let adapter = KubernetesAdapter::connect().await?;
    let batch_opts = BatchOptions {
        image: cli.archive_image.clone(),
        namespace: cli.namespace.clone(),
        original_root: cli.original_root.clone(),
        zip_root: cli.zip_root.clone(),
        db_path: cli.db_path.clone(),
        parallelism: cli.parallelism,
    };

    if !worklists.folders.is_empty() {
        let items: Vec<ArchiveWorkItem> =
            worklists.folders.iter().map(|f| ArchiveWorkItem { folder_key: f.folder_key.clone() }).collect();
        let manifest = render_archive_batch(&items, &batch_opts, chrono::Utc::now());
        let job_name = adapter.create_job(manifest).await?;
        for item in &items {
            catalog.mark_folder_running(&item.folder_key)?;
        }
        info!(job_name, items = items.len(), "archive batch submitted");
    }

    if !worklists.manifests.is_empty() {
        let items: Vec<ConverterWorkItem> = worklists
            .manifests
            .iter()
            .map(|m| ConverterWorkItem {
                mission_key: m.mission_key.clone(),
                metacloud_relpath: m.metacloud_relpath.clone(),
            })
            .collect();
        let converter_opts = BatchOptions { image: cli.converter_image.clone(), ..batch_opts };
        let manifest = render_converter_batch(&items, &converter_opts, chrono::Utc::now());
        let job_name = adapter.create_job(manifest).await?;
        for item in &items {
            catalog.mark_mission_running(&item.mission_key)?;
        }
        info!(job_name, items = items.len(), "converter batch submitted");
    }

    Ok(())
}
