//! Tile archive access layer.
//!
//! Handlers never talk to a storage backend directly. They ask an
//! [`ArchiveSource`] to open the archive named by the request's locator, use
//! the returned [`TileArchive`] for the lifetime of the request and drop it
//! before the response is sent.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │ open(locator)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           ArchiveSource Trait           │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │ PmtilesSource (pmtiles + object_store)  │
//! │   file://, s3://, gs://, az://, https://│
//! └─────────────────────────────────────────┘
//! ```

mod pmtiles_source;

pub use pmtiles_source::{PmtilesArchive, PmtilesSource};

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use crate::error::ArchiveError;

/// Highest zoom level accepted by the tile endpoint.
pub const MAX_ZOOM: u8 = 30;

/// Full-earth envelope clamped to the Web Mercator latitude limit.
pub const DEFAULT_BOUNDS: Bounds =
    Bounds([-180.0, -85.051_128_779_806_59, 180.0, 85.051_128_779_806_6]);

// =============================================================================
// Value Types
// =============================================================================

/// Address of a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

/// Geographic extent as `[west, south, east, north]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Bounds(pub [f64; 4]);

impl Bounds {
    pub fn west(&self) -> f64 {
        self.0[0]
    }

    pub fn south(&self) -> f64 {
        self.0[1]
    }

    pub fn east(&self) -> f64 {
        self.0[2]
    }

    pub fn north(&self) -> f64 {
        self.0[3]
    }

    /// Midpoint of the extent at the given zoom.
    pub fn center_at(&self, zoom: u8) -> Center {
        Center {
            lon: (self.west() + self.east()) / 2.0,
            lat: (self.south() + self.north()) / 2.0,
            zoom,
        }
    }
}

/// Default map view, serialized as a `[lon, lat, zoom]` triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Center {
    pub lon: f64,
    pub lat: f64,
    pub zoom: u8,
}

impl Serialize for Center {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.lon, self.lat, self.zoom).serialize(serializer)
    }
}

/// Encoding of the tiles stored in an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileFormat {
    Mvt,
    Png,
    Jpeg,
    Webp,
    Avif,
    /// MapLibre Vector Tile
    Mlt,
    Unknown,
}

impl TileFormat {
    /// Media type used for tile responses.
    pub fn content_type(&self) -> &'static str {
        match self {
            TileFormat::Mvt | TileFormat::Unknown => "application/x-protobuf",
            TileFormat::Mlt => "application/vnd.maplibre-vector-tile",
            TileFormat::Png => "image/png",
            TileFormat::Jpeg => "image/jpeg",
            TileFormat::Webp => "image/webp",
            TileFormat::Avif => "image/avif",
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, TileFormat::Mvt | TileFormat::Mlt)
    }
}

/// Compression applied to each tile inside the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileCompression {
    None,
    Gzip,
    Brotli,
    Zstd,
    Unknown,
}

impl TileCompression {
    /// `Content-Encoding` token announcing this compression to HTTP clients.
    pub fn content_encoding(&self) -> Option<&'static str> {
        match self {
            TileCompression::Gzip => Some("gzip"),
            TileCompression::Brotli => Some("br"),
            TileCompression::Zstd => Some("zstd"),
            TileCompression::None | TileCompression::Unknown => None,
        }
    }
}

/// Header-level facts about an opened archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveInfo {
    pub tile_format: TileFormat,
    pub tile_compression: TileCompression,
    pub minzoom: u8,
    pub maxzoom: u8,
    /// `None` when the archive does not record an extent
    pub bounds: Option<Bounds>,
    /// `None` when the archive does not record a default view
    pub center: Option<Center>,
}

impl ArchiveInfo {
    pub fn is_vector(&self) -> bool {
        self.tile_format.is_vector()
    }

    /// Bounds, falling back to the full-earth envelope.
    pub fn bounds_or_default(&self) -> Bounds {
        self.bounds.unwrap_or(DEFAULT_BOUNDS)
    }

    /// Center, derived from the bounds midpoint at `minzoom` when absent.
    pub fn center_or_derived(&self) -> Center {
        self.center
            .unwrap_or_else(|| self.bounds_or_default().center_at(self.minzoom))
    }
}

// =============================================================================
// Traits
// =============================================================================

/// An opened tile archive.
///
/// Handles are request-scoped: they are created by [`ArchiveSource::open`]
/// and released when dropped.
#[async_trait]
pub trait TileArchive: Send + Sync {
    /// Header-level information read when the archive was opened.
    fn info(&self) -> &ArchiveInfo;

    /// The archive's JSON metadata document.
    async fn metadata(&self) -> Result<serde_json::Value, ArchiveError>;

    /// Raw (still compressed) tile bytes, or `None` outside the archive's coverage.
    async fn get_tile(&self, coord: TileCoord) -> Result<Option<Bytes>, ArchiveError>;
}

/// Opens archives from locator strings.
///
/// This abstraction keeps the HTTP layer independent of where archives live
/// (local disk, object storage, plain HTTP) and lets tests serve archives
/// from memory.
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// The archive handle this source produces.
    type Archive: TileArchive + 'static;

    /// Open the archive named by `locator`.
    async fn open(&self, locator: &str) -> Result<Self::Archive, ArchiveError>;
}
