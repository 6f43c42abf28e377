//! HTTP request handlers for the tiler API.
//!
//! Every archive-backed handler opens the archive named by the `url` query
//! parameter, uses it for the duration of the request and drops it before
//! the response is returned.
//!
//! # Endpoints
//!
//! - `GET /metadata` - Archive metadata document
//! - `GET /tiles/{z}/{x}/{y}` - Raw tile bytes
//! - `GET /tilejson.json` - TileJSON
//! - `GET /style.json` - StyleJSON
//! - `GET /map` - MapLibre viewer page
//! - `GET /healthz` - Health check

use std::fmt;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, RawPathParams, State},
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::archive::{ArchiveSource, TileArchive, TileCoord, MAX_ZOOM};
use crate::document::{build_style_json, build_tilejson, vector_layers};
use crate::error::{ArchiveError, TilerError};

use super::routes::endpoint;
use super::urls::{RequestContext, UrlComposer};
use super::viewer::generate_viewer_html;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// Holds no per-request data: archives are opened inside each handler.
pub struct AppState<S: ArchiveSource> {
    /// Opens archives from locators
    pub source: Arc<S>,

    /// Composes links between endpoints
    pub urls: Arc<UrlComposer>,

    /// `Cache-Control` value set on every tiler response
    pub cache_control: HeaderValue,

    /// Path a reverse proxy exposes the service under
    pub root_path: String,
}

impl<S: ArchiveSource> AppState<S> {
    /// Create a new application state.
    pub fn new(source: S, urls: UrlComposer) -> Self {
        Self {
            source: Arc::new(source),
            urls: Arc::new(urls),
            cache_control: HeaderValue::from_static("public, max-age=3600"),
            root_path: String::new(),
        }
    }

    pub fn with_cache_control(mut self, cache_control: HeaderValue) -> Self {
        self.cache_control = cache_control;
        self
    }

    pub fn with_root_path(mut self, root_path: impl Into<String>) -> Self {
        self.root_path = root_path.into();
        self
    }

    /// Context for composing links relative to the current request.
    fn request_context(
        &self,
        headers: &HeaderMap,
        uri: &Uri,
        path_params: &RawPathParams,
    ) -> RequestContext {
        RequestContext::from_request(headers, uri, path_params, &self.root_path)
    }

    /// Tile URL template for the current request, `{z}/{x}/{y}` left literal.
    fn tile_url(&self, ctx: &RequestContext) -> Result<String, TilerError> {
        Ok(self.urls.url_for(ctx, endpoint::TILES, &[])?)
    }
}

impl<S: ArchiveSource> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            urls: Arc::clone(&self.urls),
            cache_control: self.cache_control.clone(),
            root_path: self.root_path.clone(),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Query parameters shared by every archive-backed endpoint.
///
/// Any other query parameter is accepted and echoed onto generated links.
/// A repeated `url` resolves to its last value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveQuery {
    /// Archive locator (file path or URL)
    pub url: String,
}

impl<'de> Deserialize<'de> for ArchiveQuery {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ArchiveQueryVisitor;

        impl<'de> Visitor<'de> for ArchiveQueryVisitor {
            type Value = ArchiveQuery;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("query parameters including `url`")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ArchiveQuery, A::Error> {
                let mut url = None;
                while let Some(key) = map.next_key::<String>()? {
                    if key == "url" {
                        url = Some(map.next_value::<String>()?);
                    } else {
                        map.next_value::<IgnoredAny>()?;
                    }
                }
                match url {
                    Some(url) => Ok(ArchiveQuery { url }),
                    None => Err(de::Error::missing_field("url")),
                }
            }
        }

        deserializer.deserialize_map(ArchiveQueryVisitor)
    }
}

/// Path parameters for tile requests.
///
/// Extracted from: `/tiles/{z}/{x}/{y}`. Signed so that any integer reaches
/// the handler and gets a JSON error rather than an extractor rejection.
#[derive(Debug, Deserialize)]
pub struct TilePathParams {
    /// Zoom level (0-30)
    pub z: i64,

    /// Tile column
    pub x: i64,

    /// Tile row
    pub y: i64,
}

impl TilePathParams {
    /// Validate the zoom level and build a tile coordinate.
    ///
    /// A column or row that cannot exist on any grid is a missing tile.
    pub fn coord(&self) -> Result<TileCoord, TilerError> {
        let z = u8::try_from(self.z)
            .ok()
            .filter(|z| *z <= MAX_ZOOM)
            .ok_or(TilerError::InvalidZoom {
                zoom: self.z,
                max: MAX_ZOOM,
            })?;

        match (u32::try_from(self.x), u32::try_from(self.y)) {
            (Ok(x), Ok(y)) => Ok(TileCoord::new(z, x, y)),
            _ => Err(TilerError::TileNotFound {
                z,
                x: self.x,
                y: self.y,
            }),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_zoom")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ping: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert TilerError to HTTP response.
///
/// 5xx errors are logged at ERROR level, 4xx errors at DEBUG level.
impl IntoResponse for TilerError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            TilerError::InvalidZoom { .. } => (StatusCode::BAD_REQUEST, "invalid_zoom"),
            TilerError::TileNotFound { .. } => (StatusCode::NOT_FOUND, "tile_not_found"),

            TilerError::Archive(archive_err) => match archive_err {
                ArchiveError::InvalidLocator { .. } => {
                    (StatusCode::BAD_REQUEST, "invalid_locator")
                }
                ArchiveError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                ArchiveError::InvalidMetadata(_) => {
                    (StatusCode::UNSUPPORTED_MEDIA_TYPE, "invalid_metadata")
                }
                ArchiveError::Open { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "archive_open_error")
                }
                ArchiveError::Read(_) => (StatusCode::INTERNAL_SERVER_ERROR, "archive_read_error"),
            },

            TilerError::Url(url_err) if url_err.is_configuration() => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
            }
            TilerError::Url(_) => (StatusCode::INTERNAL_SERVER_ERROR, "unknown_endpoint"),
        };

        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);

        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle metadata requests.
///
/// # Endpoint
///
/// `GET /metadata?url={locator}`
///
/// # Response
///
/// `200 OK` with the archive's metadata document as JSON.
pub async fn metadata_handler<S: ArchiveSource>(
    State(state): State<AppState<S>>,
    Query(query): Query<ArchiveQuery>,
) -> Result<Response, TilerError> {
    let archive = state.source.open(&query.url).await?;
    let metadata = archive.metadata().await?;

    Ok((
        [(header::CACHE_CONTROL, state.cache_control.clone())],
        Json(metadata),
    )
        .into_response())
}

/// Handle tile requests.
///
/// # Endpoint
///
/// `GET /tiles/{z}/{x}/{y}?url={locator}`
///
/// # Response
///
/// - `200 OK`: raw tile bytes, still compressed as stored in the archive
/// - `400 Bad Request`: zoom outside 0-30
/// - `404 Not Found`: archive missing, or no tile at this coordinate
///
/// # Headers
///
/// - `Content-Type`: `application/x-protobuf` for vector tiles, the image type otherwise
/// - `Content-Encoding`: `gzip`, `br` or `zstd` when the archive compresses tiles
/// - `Cache-Control`: configured value
pub async fn tile_handler<S: ArchiveSource>(
    State(state): State<AppState<S>>,
    Path(params): Path<TilePathParams>,
    Query(query): Query<ArchiveQuery>,
) -> Result<Response, TilerError> {
    let coord = params.coord()?;

    let archive = state.source.open(&query.url).await?;
    let info = archive.info().clone();

    let data = archive
        .get_tile(coord)
        .await?
        .ok_or(TilerError::TileNotFound {
            z: coord.z,
            x: coord.x.into(),
            y: coord.y.into(),
        })?;

    let mut response = (
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(info.tile_format.content_type()),
            ),
            (header::CACHE_CONTROL, state.cache_control.clone()),
        ],
        data,
    )
        .into_response();

    if let Some(encoding) = info.tile_compression.content_encoding() {
        response
            .headers_mut()
            .insert(header::CONTENT_ENCODING, HeaderValue::from_static(encoding));
    }

    Ok(response)
}

/// Handle TileJSON requests.
///
/// # Endpoint
///
/// `GET /tilejson.json?url={locator}[&...]`
///
/// The `tiles` entry points back at `/tiles/{z}/{x}/{y}` carrying the same
/// query string as this request.
pub async fn tilejson_handler<S: ArchiveSource>(
    State(state): State<AppState<S>>,
    Query(query): Query<ArchiveQuery>,
    path_params: RawPathParams,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, TilerError> {
    let ctx = state.request_context(&headers, &uri, &path_params);
    let tile_url = state.tile_url(&ctx)?;

    let archive = state.source.open(&query.url).await?;
    let metadata = archive.metadata().await?;
    let tilejson = build_tilejson(&metadata, archive.info(), tile_url)?;

    Ok((
        [(header::CACHE_CONTROL, state.cache_control.clone())],
        Json(tilejson),
    )
        .into_response())
}

/// Handle StyleJSON requests.
///
/// # Endpoint
///
/// `GET /style.json?url={locator}[&...]`
///
/// Vector archives get fill/stroke/point layers per source layer, raster
/// archives a single raster layer, both above an OpenStreetMap basemap.
pub async fn stylejson_handler<S: ArchiveSource>(
    State(state): State<AppState<S>>,
    Query(query): Query<ArchiveQuery>,
    path_params: RawPathParams,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, TilerError> {
    let ctx = state.request_context(&headers, &uri, &path_params);
    let tile_url = state.tile_url(&ctx)?;

    let archive = state.source.open(&query.url).await?;
    let layers = if archive.info().is_vector() {
        vector_layers(&archive.metadata().await?)?
    } else {
        Vec::new()
    };
    let style = build_style_json(archive.info(), &layers, tile_url);

    Ok((
        [(header::CACHE_CONTROL, state.cache_control.clone())],
        Json(style),
    )
        .into_response())
}

/// Handle viewer requests.
///
/// # Endpoint
///
/// `GET /map?url={locator}[&...]`
///
/// # Response
///
/// `200 OK` with an HTML page rendering `/style.json` for the same query string.
pub async fn map_handler<S: ArchiveSource>(
    State(state): State<AppState<S>>,
    Query(_query): Query<ArchiveQuery>,
    path_params: RawPathParams,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, TilerError> {
    let ctx = state.request_context(&headers, &uri, &path_params);
    let style_url = state.urls.url_for(&ctx, endpoint::STYLEJSON, &[])?;

    let html = generate_viewer_html(&style_url);

    Ok((
        [(header::CACHE_CONTROL, state.cache_control.clone())],
        Html(html),
    )
        .into_response())
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /healthz`
///
/// # Response
///
/// `200 OK` with JSON body `{"ping": "pong!"}`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        ping: "pong!".to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
