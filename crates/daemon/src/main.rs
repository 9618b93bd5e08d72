//! `lidar-orchestratord` — Job Orchestrator API binary.

use clap::Parser;
use lidar_catalog::Catalog;
use lidar_cluster::KubernetesAdapter;
use lidar_core::SystemClock;
use lidar_daemon::http;
use lidar_daemon::orchestrator::Orchestrator;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Debug, Parser)]
#[command(name = "lidar-orchestratord", about = "LiDAR job orchestrator API")]
struct Cli {
    #[arg(long, env = "LIDAR_BIND_ADDR", default_value = "0.0.0.0:8080")]
    bind_addr: SocketAddr,

    #[arg(long, env = "LIDAR_DB_PATH", default_value = "./state/catalog.sqlite3")]
    db_path: PathBuf,

    #[arg(long, env = "LIDAR_DATA_ROOT", default_value = "/data")]
    data_root: PathBuf,

    #[arg(long, env = "LIDAR_OUTPUT_ROOT", default_value = "./output")]
    output_root: PathBuf,

    #[arg(long, env = "LIDAR_NAMESPACE", default_value = "default")]
    namespace: String,

    #[arg(long, env = "LIDAR_PROCESSOR_IMAGE", default_value = "lidar-processor:latest")]
    processor_image: String,

    #[arg(long, env = "LIDAR_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_new(&cli.log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    if let Err(err) = run(cli).await {
        tracing::error!(%err, "orchestrator failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(parent) = cli.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::create_dir_all(&cli.output_root)?;

    let catalog = Catalog::open(&cli.db_path)?;
    let cluster = Arc::new(KubernetesAdapter::connect().await?);

    let orchestrator = Orchestrator::new(
        catalog,
        cluster,
        cli.output_root,
        cli.data_root,
        cli.namespace,
        cli.processor_image,
        Arc::new(SystemClock),
    );

    let app = http::router(orchestrator).layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive());

    tracing::info!(addr = %cli.bind_addr, "orchestrator listening");
    let listener = tokio::net::TcpListener::bind(cli.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
