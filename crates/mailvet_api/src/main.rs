//! Email Address Validation API Server
//!
//! Single and batch address validation over HTTP, built with axum and tokio.

use anyhow::Context;
use mailvet_core::{MemoryResultCache, ValidationPipeline};
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api_handler;
mod config;
mod middleware;
mod routes;

use config::AppConfig;

/// Shared application state
pub struct AppState {
    pub pipeline: Arc<ValidationPipeline>,
    /// Outcomes stored per owner after each request
    pub result_cache: Arc<MemoryResultCache>,
    pub config: Arc<AppConfig>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config);

    info!("Starting Email Validation API v{}", env!("CARGO_PKG_VERSION"));

    let result_cache: Arc<MemoryResultCache> = Arc::new(config.result_cache.build());
    let pipeline = ValidationPipeline::new(config.core_config())
        .context("Failed to initialize validation pipeline")?
        .with_result_cache(result_cache.clone());

    let stats = pipeline.get_stats();
    info!(
        "Pipeline initialized - {} disposable domains, {} free providers, {} known typos",
        stats.disposable_domains_count, stats.free_providers_count, stats.typo_entries_count
    );

    let state = Arc::new(AppState {
        pipeline: Arc::new(pipeline),
        result_cache,
        config: Arc::new(config.clone()),
    });

    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.server.host, config.server.port))?;
    let addr = listener.local_addr()?;

    info!("Server listening on {}", addr);
    info!("Validation API: http://{}/v1/validate", addr);
    info!("Metrics available at http://{}/metrics", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Initialize tracing and logging
fn init_tracing(config: &AppConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.observability.log_level.clone().into());

    if config.observability.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
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
            Ok(mut stream) => {
                stream.recv().await;
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
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
