//! Router configuration for the tiler.
//!
//! The route table is the single source of truth for endpoint paths: the
//! axum router is built from it, and the [`UrlComposer`] that handlers use
//! to link between endpoints resolves names against the same table.
//!
//! # Route Structure
//!
//! ```text
//! /healthz                                   - Health check (never prefixed)
//! {prefix}/metadata                          - Archive metadata
//! {prefix}/tiles/{z}/{x}/{y}                 - Tile bytes
//! {prefix}/tilejson.json                     - TileJSON
//! {prefix}/style.json                        - StyleJSON
//! {prefix}/map                               - Viewer page
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pmtiles_tiler::archive::PmtilesSource;
//! use pmtiles_tiler::server::{create_router, RouterConfig};
//!
//! let config = RouterConfig::new().with_mount_prefix("/collections/{id}");
//! let router = create_router(PmtilesSource::default(), config)?;
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    routing::{get, MethodRouter},
    Router,
};
use http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    health_handler, map_handler, metadata_handler, stylejson_handler, tile_handler,
    tilejson_handler, AppState,
};
use super::urls::{PathTemplate, RouteTable, UrlComposer};
use crate::archive::ArchiveSource;
use crate::error::{ConfigError, UrlError};

/// Endpoint names registered in the route table.
pub mod endpoint {
    pub const METADATA: &str = "metadata";
    pub const TILES: &str = "tiles";
    pub const TILEJSON: &str = "tilejson";
    pub const STYLEJSON: &str = "stylejson";
    pub const MAP: &str = "map";
}

/// Health check path, served outside the mount prefix.
pub const HEALTH_PATH: &str = "/healthz";

/// The tiler's endpoints, relative to the mount prefix.
pub fn route_table() -> Result<RouteTable, UrlError> {
    RouteTable::builder()
        .route(endpoint::METADATA, "/metadata")
        .route(endpoint::TILES, "/tiles/{z}/{x}/{y}")
        .route(endpoint::TILEJSON, "/tilejson.json")
        .route(endpoint::STYLEJSON, "/style.json")
        .route(endpoint::MAP, "/map")
        .build()
}

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control value applied to tiler responses
    pub cache_control: String,

    /// Path a reverse proxy exposes the service under, prepended to generated links
    pub root_path: String,

    /// Prefix every tiler endpoint is mounted under, may contain `{param}` captures
    pub mount_prefix: Option<String>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a new router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Cache-Control is `public, max-age=3600`
    /// - Endpoints are mounted at the root
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_control: "public, max-age=3600".to_string(),
            root_path: String::new(),
            mount_prefix: None,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    pub fn with_cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = value.into();
        self
    }

    pub fn with_root_path(mut self, root_path: impl Into<String>) -> Self {
        self.root_path = root_path.into();
        self
    }

    /// Mount the tiler endpoints under `prefix`, e.g. `/collections/{id}`.
    pub fn with_mount_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.mount_prefix = Some(prefix.into());
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Parsed mount prefix; `None` when unset or `/`.
    fn parsed_mount_prefix(&self) -> Result<Option<PathTemplate>, ConfigError> {
        match self.mount_prefix.as_deref().map(|p| p.trim_end_matches('/')) {
            None | Some("") => Ok(None),
            Some(prefix) if !prefix.starts_with('/') => Err(ConfigError::InvalidValue {
                field: "mount_prefix",
                reason: format!("'{prefix}' must start with '/'"),
            }),
            Some(prefix) => Ok(Some(PathTemplate::parse(prefix)?)),
        }
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// This function builds the complete Axum router with:
/// - One route per route table entry, nested under the mount prefix
/// - The health check at the root
/// - CORS configuration
/// - Request tracing (optional)
///
/// # Errors
///
/// Returns [`ConfigError`] if the mount prefix or cache-control value is
/// malformed.
pub fn create_router<S>(source: S, config: RouterConfig) -> Result<Router, ConfigError>
where
    S: ArchiveSource + 'static,
{
    let routes = route_table()?;
    let mount_prefix = config.parsed_mount_prefix()?;

    let cache_control =
        HeaderValue::from_str(&config.cache_control).map_err(|e| ConfigError::InvalidValue {
            field: "cache_control",
            reason: e.to_string(),
        })?;

    let mut tiler = Router::new();
    for route in routes.iter() {
        tiler = tiler.route(route.template.as_str(), handler_for::<S>(&route.name)?);
    }

    let nest_path = mount_prefix.as_ref().map(|p| p.as_str().to_string());

    let app_state = AppState::new(source, UrlComposer::new(routes, mount_prefix))
        .with_cache_control(cache_control)
        .with_root_path(config.root_path.trim_end_matches('/'));

    let tiler = tiler.with_state(app_state);

    let router = match nest_path {
        Some(path) => Router::new().nest(&path, tiler),
        None => tiler,
    }
    .route(HEALTH_PATH, get(health_handler))
    .layer(build_cors_layer(&config));

    if config.enable_tracing {
        Ok(router.layer(TraceLayer::new_for_http()))
    } else {
        Ok(router)
    }
}

/// Handler serving the endpoint registered as `name`.
fn handler_for<S>(name: &str) -> Result<MethodRouter<AppState<S>>, UrlError>
where
    S: ArchiveSource + 'static,
{
    match name {
        endpoint::METADATA => Ok(get(metadata_handler::<S>)),
        endpoint::TILES => Ok(get(tile_handler::<S>)),
        endpoint::TILEJSON => Ok(get(tilejson_handler::<S>)),
        endpoint::STYLEJSON => Ok(get(stylejson_handler::<S>)),
        endpoint::MAP => Ok(get(map_handler::<S>)),
        other => Err(UrlError::UnknownEndpoint(other.to_string())),
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<HeaderValue> =
                origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
