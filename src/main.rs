//! pmtiles-tiler - HTTP tile server for PMTiles archives.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pmtiles_tiler::{
    config::Config,
    server::{create_router, RouterConfig, HEALTH_PATH},
    PmtilesSource,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let store_options = match config.parse_store_options() {
        Ok(options) => options,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Starting {} v{}", config.name, env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    match config.mount_prefix() {
        Some(prefix) => info!("  Mount prefix: {}", prefix),
        None => info!("  Mount prefix: /"),
    }
    if !config.root_path.is_empty() {
        info!("  Root path: {}", config.root_path);
    }
    info!("  Cache-Control: {}", config.cache_control);
    match config.cors_origins() {
        None => info!("  CORS: any origin"),
        Some(origins) if origins.is_empty() => warn!("  CORS: no cross-origin requests allowed"),
        Some(origins) => info!("  CORS: {}", origins.join(", ")),
    }
    if !store_options.is_empty() {
        info!("  Object store options: {}", store_options.len());
    }

    let source = PmtilesSource::with_options(store_options);

    let router = match create_router(source, build_router_config(&config)) {
        Ok(router) => router,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let addr = config.bind_address();

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    let prefix = config.mount_prefix().unwrap_or_default();
    info!("Server listening on: http://{}", addr);
    info!("  curl http://{}{}", addr, HEALTH_PATH);
    info!(
        "  open http://{}{}{}/map?url=<archive>",
        addr, config.root_path, prefix
    );

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "pmtiles_tiler=debug,tower_http=debug"
    } else {
        "pmtiles_tiler=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_control(config.cache_control.clone())
        .with_root_path(config.root_path.clone())
        .with_tracing(!config.no_tracing);

    if let Some(origins) = config.cors_origins() {
        router_config = router_config.with_cors_origins(origins);
    }

    if let Some(prefix) = config.mount_prefix() {
        router_config = router_config.with_mount_prefix(prefix);
    }

    router_config
}

/// Resolve when Ctrl-C is received.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
