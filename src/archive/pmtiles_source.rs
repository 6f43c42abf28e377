//! PMTiles-backed archive source.
//!
//! Locators are resolved into `object_store` locations, so the same code path
//! serves local files, cloud buckets and plain HTTP servers.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use pmtiles::{AsyncPmTilesReader, Compression, Header, ObjectStoreBackend, TileType};
use tracing::{debug, trace};
use url::Url;

use crate::error::ArchiveError;

use super::{
    ArchiveInfo, ArchiveSource, Bounds, Center, TileArchive, TileCompression, TileCoord,
    TileFormat, MAX_ZOOM,
};

/// Opens PMTiles archives from file paths or `object_store` URLs.
///
/// # Example
///
/// ```ignore
/// use pmtiles_tiler::archive::{ArchiveSource, PmtilesSource};
///
/// let source = PmtilesSource::new();
/// let archive = source.open("s3://bucket/tiles/firenze.pmtiles").await?;
/// println!("vector: {}", archive.info().is_vector());
/// ```
#[derive(Debug, Clone, Default)]
pub struct PmtilesSource {
    options: Vec<(String, String)>,
}

impl PmtilesSource {
    /// Create a source with no backend options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source that forwards `key=value` options to every backend it builds.
    ///
    /// Keys follow `object_store` naming (e.g. `aws_region`, `skip_signature`).
    /// Unrecognized keys are ignored by the backends.
    pub fn with_options(options: Vec<(String, String)>) -> Self {
        Self { options }
    }

    /// Backend options forwarded to `object_store`.
    pub fn options(&self) -> &[(String, String)] {
        &self.options
    }
}

/// Turn a locator into a URL `object_store` understands.
///
/// Strings carrying a scheme are taken as URLs; everything else is a local path.
/// Single-letter schemes are Windows drive letters, not URLs.
pub(crate) fn resolve_locator(locator: &str) -> Result<Url, ArchiveError> {
    if locator.is_empty() {
        return Err(ArchiveError::InvalidLocator {
            locator: locator.to_string(),
            reason: "locator is empty".to_string(),
        });
    }

    match Url::parse(locator) {
        Ok(url) if url.scheme().len() > 1 => Ok(url),
        _ => {
            let path =
                std::path::absolute(locator).map_err(|e| ArchiveError::InvalidLocator {
                    locator: locator.to_string(),
                    reason: e.to_string(),
                })?;
            Url::from_file_path(&path).map_err(|()| ArchiveError::InvalidLocator {
                locator: locator.to_string(),
                reason: format!("cannot express {} as a file URL", path.display()),
            })
        }
    }
}

/// Local file behind a `file://` URL, if any.
fn local_path(url: &Url) -> Option<PathBuf> {
    if url.scheme() == "file" {
        url.to_file_path().ok()
    } else {
        None
    }
}

#[async_trait]
impl ArchiveSource for PmtilesSource {
    type Archive = PmtilesArchive;

    async fn open(&self, locator: &str) -> Result<Self::Archive, ArchiveError> {
        let url = resolve_locator(locator)?;

        // object_store reports a missing local file as a generic read failure
        if let Some(path) = local_path(&url) {
            if tokio::fs::metadata(&path).await.is_err() {
                return Err(ArchiveError::NotFound(locator.to_string()));
            }
        }

        let options = self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        let (store, path) =
            object_store::parse_url_opts(&url, options).map_err(|e| {
                ArchiveError::InvalidLocator {
                    locator: locator.to_string(),
                    reason: e.to_string(),
                }
            })?;

        debug!(locator = locator, store = %store, "Opening PMTiles archive");

        let backend = ObjectStoreBackend::new(store, path);
        let reader = AsyncPmTilesReader::try_from_source(backend)
            .await
            .map_err(|e| ArchiveError::Open {
                locator: locator.to_string(),
                reason: e.to_string(),
            })?;

        let info = archive_info(reader.get_header());

        Ok(PmtilesArchive {
            locator: locator.to_string(),
            reader,
            info,
        })
    }
}

/// Translate a PMTiles header into [`ArchiveInfo`].
fn archive_info(header: &Header) -> ArchiveInfo {
    let tile_format = match header.tile_type {
        TileType::Mvt => TileFormat::Mvt,
        TileType::Png => TileFormat::Png,
        TileType::Jpeg => TileFormat::Jpeg,
        TileType::Webp => TileFormat::Webp,
        TileType::Avif => TileFormat::Avif,
        TileType::Mlt => TileFormat::Mlt,
        TileType::Unknown => TileFormat::Unknown,
    };

    let tile_compression = match header.tile_compression {
        Compression::None => TileCompression::None,
        Compression::Gzip => TileCompression::Gzip,
        Compression::Brotli => TileCompression::Brotli,
        Compression::Zstd => TileCompression::Zstd,
        Compression::Unknown => TileCompression::Unknown,
    };

    let bounds = Bounds([
        f64::from(header.min_longitude),
        f64::from(header.min_latitude),
        f64::from(header.max_longitude),
        f64::from(header.max_latitude),
    ]);

    let center = Center {
        lon: f64::from(header.center_longitude),
        lat: f64::from(header.center_latitude),
        zoom: header.center_zoom.min(MAX_ZOOM),
    };

    ArchiveInfo {
        tile_format,
        tile_compression,
        minzoom: header.min_zoom.min(MAX_ZOOM),
        maxzoom: header.max_zoom.min(MAX_ZOOM),
        // An all-zero header field means the writer recorded nothing
        bounds: (bounds.0 != [0.0; 4]).then_some(bounds),
        center: (center.lon != 0.0 || center.lat != 0.0 || center.zoom != 0).then_some(center),
    }
}

/// Parse the metadata document. Writers may leave it empty.
fn parse_metadata(raw: &str) -> Result<serde_json::Value, ArchiveError> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }

    serde_json::from_str(raw).map_err(|e| ArchiveError::InvalidMetadata(e.to_string()))
}

/// An opened PMTiles archive.
pub struct PmtilesArchive {
    locator: String,
    reader: AsyncPmTilesReader<ObjectStoreBackend>,
    info: ArchiveInfo,
}

impl PmtilesArchive {
    /// The locator this archive was opened from.
    pub fn locator(&self) -> &str {
        &self.locator
    }
}

#[async_trait]
impl TileArchive for PmtilesArchive {
    fn info(&self) -> &ArchiveInfo {
        &self.info
    }

    async fn metadata(&self) -> Result<serde_json::Value, ArchiveError> {
        let raw = self
            .reader
            .get_metadata()
            .await
            .map_err(|e| ArchiveError::Read(e.to_string()))?;

        parse_metadata(&raw)
    }

    async fn get_tile(&self, coord: TileCoord) -> Result<Option<Bytes>, ArchiveError> {
        // Column or row past 2^z is outside any archive's coverage
        let Ok(tile_coord) = pmtiles::TileCoord::new(coord.z, coord.x, coord.y) else {
            trace!(
                "{}/{}/{} is outside the tile grid of {}",
                coord.z,
                coord.x,
                coord.y,
                self.locator
            );
            return Ok(None);
        };

        let tile = self
            .reader
            .get_tile(tile_coord)
            .await
            .map_err(|e| ArchiveError::Read(e.to_string()))?;

        if tile.is_none() {
            trace!(
                "No tile at {}/{}/{} in {}",
                coord.z,
                coord.x,
                coord.y,
                self.locator
            );
        }

        Ok(tile)
    }
}
