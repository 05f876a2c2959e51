mod handlers;
mod metrics;
mod routes;

use axum::Router;
use edgecase_common::boundary::BoundaryClient;
use edgecase_common::config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

pub struct AppState {
    pub config: Config,
    pub boundary: BoundaryClient,
}

#[tokio::main]
async fn main() {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        )
        .with_target(false)
        .init();

    info!("Edgecase API booting...");

    let config = match Config::load_default() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    info!(
        runner = %config.runner_path,
        interpreter = %config.interpreter,
        case_timeout_ms = config.case_timeout_ms,
        fault_policy = %config.fault_policy,
        "Configuration loaded"
    );

    let state = Arc::new(AppState {
        boundary: BoundaryClient::new(&config),
        config,
    });

    // Build router
    let app = Router::new()
        .merge(routes::routes())
        .with_state(state.clone());

    // Start server
    let listener = TcpListener::bind(&state.config.bind_addr).await
        .expect("Failed to bind to address");

    info!("HTTP server listening on {}", state.config.bind_addr);
    info!("Ready to accept test runs");

    axum::serve(listener, app).await
        .expect("Server error");
}
