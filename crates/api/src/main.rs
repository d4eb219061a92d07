use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use maaslin_api::background::scratch_retention;
use maaslin_api::config::ServerConfig;
use maaslin_api::router::build_app_router;
use maaslin_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "maaslin_api=debug,maaslin_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");
    tracing::info!(
        script = %config.runner.script_path.display(),
        interpreter = ?config.runner.interpreter,
        scratch_root = %config.runner.scratch_root.display(),
        max_concurrent_jobs = config.runner.max_concurrent_jobs,
        "Loaded runner configuration"
    );

    if !config.runner.script_path.is_file() {
        tracing::warn!(
            script = %config.runner.script_path.display(),
            "Analysis script does not exist yet; jobs will fail until it does"
        );
    }

    // --- App state ---
    let state = AppState::from_config(config.clone()).expect("Invalid runner configuration");

    // --- Scratch retention ---
    let retention_cancel = tokio_util::sync::CancellationToken::new();
    let retention_handle = tokio::spawn(scratch_retention::run(
        Arc::clone(&state.scratch),
        Duration::from_secs(config.runner.sweep_interval_secs),
        retention_cancel.clone(),
    ));

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    retention_cancel.cancel();
    match tokio::time::timeout(
        Duration::from_secs(config.shutdown_timeout_secs),
        retention_handle,
    )
    .await
    {
        Ok(Ok(())) => tracing::info!("Scratch retention stopped"),
        Ok(Err(e)) => tracing::error!(error = %e, "Scratch retention task failed"),
        Err(_) => tracing::warn!("Scratch retention did not stop in time"),
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
