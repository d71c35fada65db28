//! Worker binary.

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use recut_queue::JobQueue;
use recut_worker::{JobExecutor, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS).
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("recut=info".parse().unwrap()))
        .init();

    info!("starting recut-worker");

    if let Err(e) = metrics_exporter_prometheus::PrometheusBuilder::new().install() {
        warn!("metrics exporter not installed: {e}");
    }

    let config = WorkerConfig::from_env();
    info!("worker config: {config:?}");

    let queue = match JobQueue::from_env() {
        Ok(queue) => queue,
        Err(e) => {
            error!("failed to create job queue: {e}");
            std::process::exit(1);
        }
    };

    let executor = match JobExecutor::new(config, queue) {
        Ok(executor) => executor,
        Err(e) => {
            error!("failed to create job executor: {e}");
            std::process::exit(1);
        }
    };

    let shutdown = executor.shutdown_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
        shutdown.send(true).ok();
    });

    if let Err(e) = executor.run().await {
        error!("executor error: {e}");
        std::process::exit(1);
    }

    info!("worker shutdown complete");
}
