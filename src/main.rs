//! PDFToolkit Server
//!
//! Upload PDFs, get page previews, and build new PDFs from pages of any
//! uploaded document.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdftoolkit_server::{lifecycle::CleanupPolicy, router, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "pdftoolkit_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Invalid configuration")?;

    tracing::info!(
        "Starting {} v{} ({})",
        config.app_name,
        env!("CARGO_PKG_VERSION"),
        config.environment
    );
    tracing::info!("Uploads directory: {}", config.storage.uploads_dir.display());
    tracing::info!("Output directory: {}", config.storage.output_dir.display());

    if config.security.api_key.is_none() {
        tracing::warn!("API_KEY not set, upload and create-pdf will refuse every request");
    }
    if config.security.admin_api_key.is_none() {
        tracing::warn!("ADMIN_API_KEY not set, admin endpoints will refuse every request");
    }

    let app_state = AppState::new(config.clone());
    app_state
        .store()
        .ensure_dirs()
        .await
        .context("Failed to create storage directories")?;

    if config.cleanup.enabled {
        app_state
            .cleanup()
            .start(CleanupPolicy::from(&config.cleanup))
            .await;
    }

    let app = router(app_state.clone());

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid SERVER_HOST/SERVER_PORT")?;
    tracing::info!("PDFToolkit Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    app_state.cleanup().stop().await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
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
