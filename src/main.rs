use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use horcrux::{
    api,
    backend::{Backend, BackendRegistry, DropboxBackend, FlickrBackend, GoogleDriveBackend},
    config::{Config, ConfigStore},
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    // Log lines go to stdout and the local log file. Failing to open the
    // log file is the one fatal file-system error at startup.
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .map_err(|e| anyhow::anyhow!("failed to open log file {}: {e}", config.log_file.display()))?;

    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(log_file)),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "horcrux starting");

    let client_config = ConfigStore::load(&config.client_config_path);

    // Backends for already-linked providers come up with the process; the
    // rest appear at runtime through POST /link.
    let registry = BackendRegistry::new();
    if client_config.get().using_gdrive {
        match GoogleDriveBackend::from_config(&config) {
            Ok(backend) => registry.register(Arc::new(backend)).await,
            Err(e) => tracing::error!(error = %e, "Failed to initialize gdrive backend"),
        }
    }
    if client_config.get().using_dropbox {
        let backend: Arc<dyn Backend> = Arc::new(DropboxBackend::new());
        registry.register(backend).await;
    }
    if client_config.get().using_flickr {
        let backend: Arc<dyn Backend> = Arc::new(FlickrBackend::new());
        registry.register(backend).await;
    }

    let state = Arc::new(AppState {
        config: config.clone(),
        client_config: tokio::sync::Mutex::new(client_config),
        registry,
    });

    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Listening on: {}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
