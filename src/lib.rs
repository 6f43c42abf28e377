//! # pmtiles-tiler
//!
//! An HTTP tile server for PMTiles archives on local disk or in object storage.
//!
//! Every request names its archive with the `url` query parameter. The
//! server returns raw tiles and derives map-consumption documents from the
//! archive's header and metadata:
//!
//! - **Tiles**: stored bytes served as-is, with `Content-Type` and `Content-Encoding` from the header
//! - **TileJSON 3.0.0**: tile URL template, zoom range, bounds, center and vector layers
//! - **StyleJSON**: a MapLibre style over an OpenStreetMap basemap, synthesized per vector layer
//! - **Viewer**: a MapLibre page rendering the generated style
//!
//! Generated links are absolute, honour the configured root path and mount
//! prefix, and carry the request's query string so every linked resource
//! reads the same archive.
//!
//! ## Architecture
//!
//! - [`archive`] - Archive access traits and the pmtiles/object_store implementation
//! - [`document`] - TileJSON and StyleJSON synthesis
//! - [`server`] - Axum handlers, route table, URL composition and viewer
//! - [`config`] - CLI and environment configuration
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```rust,no_run
//! use pmtiles_tiler::{create_router, PmtilesSource, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RouterConfig::new().with_mount_prefix("/collections/{id}");
//!     let router = create_router(PmtilesSource::default(), config)?;
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod config;
pub mod document;
pub mod error;
pub mod server;

// Re-export commonly used types
pub use archive::{
    ArchiveInfo, ArchiveSource, Bounds, Center, PmtilesArchive, PmtilesSource, TileArchive,
    TileCompression, TileCoord, TileFormat, DEFAULT_BOUNDS, MAX_ZOOM,
};
pub use config::Config;
pub use document::{
    build_style_json, build_tilejson, vector_layers, StyleJson, StyleLayer, TileJson, VectorLayer,
};
pub use error::{ArchiveError, ConfigError, TilerError, UrlError};
pub use server::{
    create_router, route_table, AppState, ErrorResponse, RequestContext, RouteTable,
    RouterConfig, UrlComposer,
};
