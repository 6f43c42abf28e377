//! Map-consumption documents synthesized from archive state.
//!
//! - [`TileJson`] describes how to fetch the archive's tiles
//! - [`StyleJson`] is a ready-to-render MapLibre style over those tiles
//!
//! Both are built fresh for every request and never cached here.

mod style;
mod tilejson;

pub use style::{
    build_style_json, BasemapSource, CirclePaint, DataSource, FillPaint, GeometryFilter,
    GeometryType, LayerKind, LinePaint, Paint, SourceKind, StyleJson, StyleLayer, StyleSources,
    BASEMAP_ATTRIBUTION, BASEMAP_TILE_URL, MASK_LAYER_ID, STYLE_VERSION,
};
pub use tilejson::{build_tilejson, Scheme, TileJson, TILEJSON_VERSION};

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;

/// One feature layer of a vector archive, as listed in its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorLayer {
    pub id: String,

    /// Attribute name to type tag
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<u8>,
}

/// Extract the `vector_layers` list from an archive metadata document.
///
/// A missing or `null` entry yields an empty list. Layer order is preserved.
pub fn vector_layers(metadata: &serde_json::Value) -> Result<Vec<VectorLayer>, ArchiveError> {
    let layers = match metadata.get("vector_layers") {
        None | Some(serde_json::Value::Null) => return Ok(Vec::new()),
        Some(value) => Vec::<VectorLayer>::deserialize(value)
            .map_err(|e| ArchiveError::InvalidMetadata(format!("vector_layers: {}", e)))?,
    };

    let mut seen = HashSet::new();
    for layer in &layers {
        if layer.id.is_empty() {
            return Err(ArchiveError::InvalidMetadata(
                "vector_layers: layer with empty id".to_string(),
            ));
        }
        if !seen.insert(layer.id.as_str()) {
            return Err(ArchiveError::InvalidMetadata(format!(
                "vector_layers: duplicate layer id '{}'",
                layer.id
            )));
        }
    }

    Ok(layers)
}

/// A string-valued top-level metadata entry.
pub(crate) fn metadata_str(metadata: &serde_json::Value, key: &str) -> Option<String> {
    metadata
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
