//! Test utilities for integration tests.
//!
//! Provides an in-memory archive source so the full router can be driven
//! without PMTiles files on disk.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceExt;

use pmtiles_tiler::archive::{
    ArchiveInfo, ArchiveSource, Bounds, TileArchive, TileCompression, TileCoord, TileFormat,
};
use pmtiles_tiler::error::ArchiveError;

// =============================================================================
// Mock Archive
// =============================================================================

/// An archive held entirely in memory.
#[derive(Debug, Clone)]
pub struct MockArchive {
    info: ArchiveInfo,
    metadata: serde_json::Value,
    tiles: HashMap<TileCoord, Bytes>,
}

impl MockArchive {
    pub fn new(info: ArchiveInfo, metadata: serde_json::Value) -> Self {
        Self {
            info,
            metadata,
            tiles: HashMap::new(),
        }
    }

    /// Gzip-compressed vector archive over `[-10, -5, 10, 5]`, zoom 2-12.
    pub fn vector(metadata: serde_json::Value) -> Self {
        Self::new(
            ArchiveInfo {
                tile_format: TileFormat::Mvt,
                tile_compression: TileCompression::Gzip,
                minzoom: 2,
                maxzoom: 12,
                bounds: Some(Bounds([-10.0, -5.0, 10.0, 5.0])),
                center: None,
            },
            metadata,
        )
    }

    /// Uncompressed PNG archive with no recorded extent, zoom 0-5.
    pub fn raster() -> Self {
        Self::new(
            ArchiveInfo {
                tile_format: TileFormat::Png,
                tile_compression: TileCompression::None,
                minzoom: 0,
                maxzoom: 5,
                bounds: None,
                center: None,
            },
            serde_json::json!({}),
        )
    }

    pub fn with_tile(mut self, z: u8, x: u32, y: u32, data: impl Into<Bytes>) -> Self {
        self.tiles.insert(TileCoord::new(z, x, y), data.into());
        self
    }
}

#[async_trait]
impl TileArchive for MockArchive {
    fn info(&self) -> &ArchiveInfo {
        &self.info
    }

    async fn metadata(&self) -> Result<serde_json::Value, ArchiveError> {
        Ok(self.metadata.clone())
    }

    async fn get_tile(&self, coord: TileCoord) -> Result<Option<Bytes>, ArchiveError> {
        Ok(self.tiles.get(&coord).cloned())
    }
}

// =============================================================================
// Mock Archive Source
// =============================================================================

/// An archive source serving [`MockArchive`]s by locator.
///
/// Clones share open counters, so a test can keep a handle after moving the
/// source into the router.
#[derive(Clone, Default)]
pub struct MockArchiveSource {
    archives: HashMap<String, MockArchive>,
    open_counts: Arc<RwLock<HashMap<String, usize>>>,
}

impl MockArchiveSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_archive(mut self, locator: impl Into<String>, archive: MockArchive) -> Self {
        self.archives.insert(locator.into(), archive);
        self
    }

    pub async fn open_count(&self, locator: &str) -> usize {
        self.open_counts
            .read()
            .await
            .get(locator)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ArchiveSource for MockArchiveSource {
    type Archive = MockArchive;

    async fn open(&self, locator: &str) -> Result<Self::Archive, ArchiveError> {
        {
            let mut counts = self.open_counts.write().await;
            *counts.entry(locator.to_string()).or_insert(0) += 1;
        }

        if locator.is_empty() {
            return Err(ArchiveError::InvalidLocator {
                locator: String::new(),
                reason: "locator is empty".to_string(),
            });
        }

        self.archives
            .get(locator)
            .cloned()
            .ok_or_else(|| ArchiveError::NotFound(locator.to_string()))
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Vector tile bytes used by the fixtures (not a real MVT, served verbatim).
pub const VECTOR_TILE: &[u8] = b"\x1f\x8b\x08\x00vector-tile";

/// PNG signature followed by filler, served verbatim.
pub const PNG_TILE: &[u8] = b"\x89PNG\r\n\x1a\nraster-tile";

/// Metadata of a vector archive with a regular `roads` layer and the reserved `mask` layer.
pub fn roads_and_mask_metadata() -> serde_json::Value {
    serde_json::json!({
        "name": "firenze",
        "attribution": "© OpenStreetMap contributors",
        "vector_layers": [
            {"id": "roads", "fields": {"highway": "String"}, "minzoom": 4, "maxzoom": 12},
            {"id": "mask", "fields": {}}
        ],
        "generator": "tippecanoe",
        "zeta": 1,
        "alpha": "first"
    })
}

/// A source holding `vector.pmtiles` (roads + mask) and `raster.pmtiles`.
pub fn fixture_source() -> MockArchiveSource {
    MockArchiveSource::new()
        .with_archive(
            "vector.pmtiles",
            MockArchive::vector(roads_and_mask_metadata()).with_tile(4, 8, 5, VECTOR_TILE),
        )
        .with_archive(
            "raster.pmtiles",
            MockArchive::raster().with_tile(0, 0, 0, PNG_TILE),
        )
}

// =============================================================================
// Request Helpers
// =============================================================================

/// Send a GET request with `Host: tiles.example.com` through the router.
pub async fn get(router: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header("host", "tiles.example.com")
        .body(Body::empty())
        .unwrap();

    router.clone().oneshot(request).await.unwrap()
}

/// Collect a response body.
pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Path and query of an absolute URL, e.g. `http://host/a?b=1` -> `/a?b=1`.
pub fn path_and_query(url: &str) -> String {
    let parsed = url::Url::parse(url).unwrap();
    match parsed.query() {
        Some(query) => format!("{}?{}", parsed.path(), query),
        None => parsed.path().to_string(),
    }
}
