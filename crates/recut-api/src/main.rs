//! API server binary.

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use recut_api::{ApiConfig, AppState};

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

    info!("starting recut-api");

    if let Err(e) = metrics_exporter_prometheus::PrometheusBuilder::new().install() {
        warn!("metrics exporter not installed: {e}");
    }

    let config = ApiConfig::from_env();
    let bind_addr = config.bind_addr();

    let state = match AppState::from_env(config) {
        Ok(state) => state,
        Err(e) => {
            error!("failed to build application state: {e}");
            std::process::exit(1);
        }
    };

    let router = recut_api::routes::build_router(state);

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to bind {bind_addr}: {e}");
            std::process::exit(1);
        }
    };

    info!("listening on {bind_addr}");
    if let Err(e) = axum::serve(listener, router).await {
        error!("server error: {e}");
        std::process::exit(1);
    }
}
