use std::sync::Arc;
use std::time::Duration;

use delivery_workflows::api;
use delivery_workflows::config::{Config, LogFormat};
use delivery_workflows::engine::dashboard::{refresh, run_dashboard_refresher};
use delivery_workflows::engine::notifier::{run_notifier, LogNotificationSink};
use delivery_workflows::error::AppError;
use delivery_workflows::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;
    init_tracing(&config);

    let http_port = config.http_port;
    let refresh_period = Duration::from_secs(config.dashboard_refresh_secs);

    let (app_state, notification_rx) = AppState::in_memory(config);
    let shared_state = Arc::new(app_state);

    tokio::spawn(run_notifier(
        shared_state.clone(),
        notification_rx,
        Arc::new(LogNotificationSink),
    ));

    refresh(&shared_state);
    tokio::spawn(run_dashboard_refresher(shared_state.clone(), refresh_period));

    let app = api::rest::router(shared_state);

    let bind_addr = format!("0.0.0.0:{http_port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
