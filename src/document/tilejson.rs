//! TileJSON 3.0.0 documents.

use serde::Serialize;

use crate::archive::{ArchiveInfo, Bounds, Center};
use crate::error::ArchiveError;

use super::{metadata_str, vector_layers, VectorLayer};

/// TileJSON format version emitted by this server.
pub const TILEJSON_VERSION: &str = "3.0.0";

const DEFAULT_NAME: &str = "pmtiles";
const DEFAULT_VERSION: &str = "1.0.0";

/// Tile addressing scheme. Only XYZ is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Xyz,
}

/// A TileJSON document.
///
/// `center` is always populated: [`build_tilejson`] derives it from the
/// bounds when the archive does not record one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileJson {
    pub tilejson: &'static str,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    pub scheme: Scheme,
    pub tiles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_layers: Option<Vec<VectorLayer>>,
    pub minzoom: u8,
    pub maxzoom: u8,
    pub bounds: Bounds,
    pub center: Center,
}

/// Build the TileJSON for an archive.
///
/// # Arguments
///
/// * `metadata` - The archive's metadata document
/// * `info` - Header-level archive facts (zoom range, bounds, center)
/// * `tile_url` - Absolute tile URL template with literal `{z}/{x}/{y}` tokens
///
/// `vector_layers` is only set when the metadata lists at least one layer.
pub fn build_tilejson(
    metadata: &serde_json::Value,
    info: &ArchiveInfo,
    tile_url: String,
) -> Result<TileJson, ArchiveError> {
    let layers = vector_layers(metadata)?;

    Ok(TileJson {
        tilejson: TILEJSON_VERSION,
        name: metadata_str(metadata, "name").unwrap_or_else(|| DEFAULT_NAME.to_string()),
        description: metadata_str(metadata, "description"),
        version: DEFAULT_VERSION.to_string(),
        attribution: metadata_str(metadata, "attribution"),
        scheme: Scheme::Xyz,
        tiles: vec![tile_url],
        vector_layers: (!layers.is_empty()).then_some(layers),
        minzoom: info.minzoom,
        maxzoom: info.maxzoom,
        bounds: info.bounds_or_default(),
        center: info.center_or_derived(),
    })
}
