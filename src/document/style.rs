//! MapLibre/Mapbox StyleJSON synthesis.
//!
//! Every style carries two sources, the archive (`pmtiles`) and an
//! OpenStreetMap raster basemap (`basemap`), and always starts with the
//! basemap layer. Raster archives add one raster layer on top. Vector
//! archives add a fill, a stroke and a point layer for each source layer,
//! grouped per source layer in metadata order.

use serde::{Serialize, Serializer};

use crate::archive::{ArchiveInfo, Bounds, TileFormat};

use super::tilejson::Scheme;
use super::VectorLayer;

/// MapLibre style format version.
pub const STYLE_VERSION: u8 = 8;

/// Source layer id rendered as an opaque mask instead of a translucent fill.
pub const MASK_LAYER_ID: &str = "mask";

pub const BASEMAP_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const BASEMAP_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

const DATA_SOURCE: &str = "pmtiles";
const BASEMAP_SOURCE: &str = "basemap";
const BASEMAP_TILE_SIZE: u32 = 256;
const BASEMAP_MAXZOOM: u8 = 20;

const FEATURE_COLOR: &str = "rgba(200, 100, 240, 0.4)";
const OUTLINE_COLOR: &str = "#000";
const MASK_COLOR: &str = "black";
const MASK_OPACITY: f64 = 0.8;
const LINE_WIDTH: f64 = 1.0;
const LINE_OPACITY: f64 = 0.75;
const CIRCLE_RADIUS: f64 = 2.5;
const CIRCLE_OPACITY: f64 = 0.75;

// =============================================================================
// Document Types
// =============================================================================

/// A StyleJSON document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleJson {
    pub version: u8,
    pub sources: StyleSources,
    /// Render order, back to front
    pub layers: Vec<StyleLayer>,
    /// `[lon, lat]`
    pub center: [f64; 2],
    pub zoom: u8,
}

/// The two sources every style carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleSources {
    pub pmtiles: DataSource,
    pub basemap: BasemapSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Vector,
    Raster,
}

/// Source descriptor for the served archive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSource {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub scheme: Scheme,
    pub tiles: Vec<String>,
    pub minzoom: u8,
    pub maxzoom: u8,
    pub bounds: Bounds,
    /// `"mlt"` for MapLibre Vector Tile archives, MVT is the client default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<&'static str>,
}

/// Source descriptor for the third-party raster basemap.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasemapSource {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub tiles: Vec<String>,
    pub tile_size: u32,
    pub attribution: String,
}

impl Default for BasemapSource {
    fn default() -> Self {
        Self {
            kind: SourceKind::Raster,
            tiles: vec![BASEMAP_TILE_URL.to_string()],
            tile_size: BASEMAP_TILE_SIZE,
            attribution: BASEMAP_ATTRIBUTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Raster,
    Fill,
    Line,
    Circle,
}

/// One entry of the style's `layers` array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleLayer {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    pub source: String,
    #[serde(rename = "source-layer", skip_serializing_if = "Option::is_none")]
    pub source_layer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<GeometryFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paint: Option<Paint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
}

/// `["==", ["geometry-type"], <type>]` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryFilter(pub GeometryType);

impl Serialize for GeometryFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ("==", ("geometry-type",), self.0).serialize(serializer)
    }
}

/// Paint properties, shaped by layer type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Paint {
    Fill(FillPaint),
    Line(LinePaint),
    Circle(CirclePaint),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct FillPaint {
    pub fill_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_outline_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct LinePaint {
    pub line_color: String,
    pub line_width: f64,
    pub line_opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CirclePaint {
    pub circle_color: String,
    pub circle_radius: f64,
    pub circle_opacity: f64,
}

// =============================================================================
// Layer Builders
// =============================================================================

impl StyleLayer {
    fn basemap() -> Self {
        Self {
            id: BASEMAP_SOURCE.to_string(),
            kind: LayerKind::Raster,
            source: BASEMAP_SOURCE.to_string(),
            source_layer: None,
            minzoom: Some(0),
            maxzoom: Some(BASEMAP_MAXZOOM),
            filter: None,
            paint: None,
        }
    }

    fn raster() -> Self {
        Self {
            id: "raster".to_string(),
            kind: LayerKind::Raster,
            source: DATA_SOURCE.to_string(),
            source_layer: None,
            minzoom: None,
            maxzoom: None,
            filter: None,
            paint: None,
        }
    }

    fn feature(
        source_layer: &str,
        suffix: &str,
        kind: LayerKind,
        geometry: GeometryType,
        paint: Paint,
    ) -> Self {
        Self {
            id: format!("{}_{}", source_layer, suffix),
            kind,
            source: DATA_SOURCE.to_string(),
            source_layer: Some(source_layer.to_string()),
            minzoom: None,
            maxzoom: None,
            filter: Some(GeometryFilter(geometry)),
            paint: Some(paint),
        }
    }

    fn fill(source_layer: &str) -> Self {
        let paint = if source_layer == MASK_LAYER_ID {
            FillPaint {
                fill_color: MASK_COLOR.to_string(),
                fill_opacity: Some(MASK_OPACITY),
                fill_outline_color: None,
            }
        } else {
            FillPaint {
                fill_color: FEATURE_COLOR.to_string(),
                fill_opacity: None,
                fill_outline_color: Some(OUTLINE_COLOR.to_string()),
            }
        };
        Self::feature(
            source_layer,
            "fill",
            LayerKind::Fill,
            GeometryType::Polygon,
            Paint::Fill(paint),
        )
    }

    fn stroke(source_layer: &str) -> Self {
        Self::feature(
            source_layer,
            "stroke",
            LayerKind::Line,
            GeometryType::LineString,
            Paint::Line(LinePaint {
                line_color: OUTLINE_COLOR.to_string(),
                line_width: LINE_WIDTH,
                line_opacity: LINE_OPACITY,
            }),
        )
    }

    fn point(source_layer: &str) -> Self {
        Self::feature(
            source_layer,
            "point",
            LayerKind::Circle,
            GeometryType::Point,
            Paint::Circle(CirclePaint {
                circle_color: OUTLINE_COLOR.to_string(),
                circle_radius: CIRCLE_RADIUS,
                circle_opacity: CIRCLE_OPACITY,
            }),
        )
    }
}

/// Build a renderable style for an archive.
///
/// # Arguments
///
/// * `info` - Header-level archive facts; selects the vector or raster branch
/// * `vector_layers` - Source layers from the metadata, ignored for raster archives
/// * `tile_url` - Absolute tile URL template with literal `{z}/{x}/{y}` tokens
///
/// A vector archive without source layers yields a basemap-only style.
pub fn build_style_json(
    info: &ArchiveInfo,
    vector_layers: &[VectorLayer],
    tile_url: String,
) -> StyleJson {
    let mut layers = vec![StyleLayer::basemap()];

    let kind = if info.is_vector() {
        layers.reserve(vector_layers.len() * 3);
        for layer in vector_layers {
            layers.push(StyleLayer::fill(&layer.id));
            layers.push(StyleLayer::stroke(&layer.id));
            layers.push(StyleLayer::point(&layer.id));
        }
        SourceKind::Vector
    } else {
        layers.push(StyleLayer::raster());
        SourceKind::Raster
    };

    let center = info.center_or_derived();

    StyleJson {
        version: STYLE_VERSION,
        sources: StyleSources {
            pmtiles: DataSource {
                kind,
                scheme: Scheme::Xyz,
                tiles: vec![tile_url],
                minzoom: info.minzoom,
                maxzoom: info.maxzoom,
                bounds: info.bounds_or_default(),
                encoding: (info.tile_format == TileFormat::Mlt).then_some("mlt"),
            },
            basemap: BasemapSource::default(),
        },
        layers,
        center: [center.lon, center.lat],
        zoom: center.zoom,
    }
}
