//! Exam Shuffler Server
//!
//! Accepts a quiz document upload and answers with a zip of shuffled exam
//! variants plus a consolidated answer key.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exam_shuffler::config::Config;
use exam_shuffler::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "exam_shuffler=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting Exam Shuffler v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Upload dir: {}", config.storage.upload_dir.display());
    tracing::info!("Output dir: {}", config.storage.output_dir.display());

    // Make sure the scratch directories exist before the first upload
    tokio::fs::create_dir_all(&config.storage.upload_dir)
        .await
        .context("Failed to create upload directory")?;
    tokio::fs::create_dir_all(&config.storage.output_dir)
        .await
        .context("Failed to create output directory")?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid SERVER_HOST/SERVER_PORT")?;

    let app_state = AppState::new(config).context("Failed to build application state")?;
    let app = exam_shuffler::app(app_state);

    tracing::info!("Exam Shuffler listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
