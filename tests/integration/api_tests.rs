//! API integration tests for tiles, metadata and error handling.
//!
//! Tests verify:
//! - Raw tile retrieval with format-dependent headers
//! - Metadata passthrough
//! - Error cases (missing archive, missing tile, invalid zoom, missing locator)
//! - Health check, Cache-Control and CORS headers

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use pmtiles_tiler::{create_router, RouterConfig};

use super::test_utils::{
    body_bytes, body_json, fixture_source, get, roads_and_mask_metadata, PNG_TILE, VECTOR_TILE,
};

fn router() -> axum::Router {
    create_router(fixture_source(), RouterConfig::new().with_tracing(false)).unwrap()
}

// =============================================================================
// Tiles
// =============================================================================

#[tokio::test]
async fn test_vector_tile_retrieval() {
    let response = get(&router(), "/tiles/4/8/5?url=vector.pmtiles").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/x-protobuf"
    );
    assert_eq!(response.headers().get("content-encoding").unwrap(), "gzip");
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "public, max-age=3600"
    );

    // Bytes are served exactly as stored, compression untouched
    assert_eq!(body_bytes(response).await.as_ref(), VECTOR_TILE);
}

#[tokio::test]
async fn test_raster_tile_retrieval() {
    let response = get(&router(), "/tiles/0/0/0?url=raster.pmtiles").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/png");
    assert!(response.headers().get("content-encoding").is_none());
    assert_eq!(body_bytes(response).await.as_ref(), PNG_TILE);
}

#[tokio::test]
async fn test_tile_not_found() {
    let response = get(&router(), "/tiles/4/0/0?url=vector.pmtiles").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "tile_not_found");
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_tile_invalid_zoom() {
    let response = get(&router(), "/tiles/31/0/0?url=vector.pmtiles").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_zoom");
}

#[tokio::test]
async fn test_tile_max_zoom_accepted() {
    // Zoom 30 is valid; the archive simply has no tile there
    let response = get(&router(), "/tiles/30/0/0?url=vector.pmtiles").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tile_negative_column_not_found() {
    let response = get(&router(), "/tiles/4/-1/5?url=vector.pmtiles").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "tile_not_found");
    assert_eq!(json["message"], "Tile 4/-1/5 not found");
}

#[tokio::test]
async fn test_tile_negative_zoom_rejected() {
    let response = get(&router(), "/tiles/-1/0/0?url=vector.pmtiles").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_zoom");
}

#[tokio::test]
async fn test_tile_non_numeric_coordinates() {
    let response = get(&router(), "/tiles/a/0/0?url=vector.pmtiles").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_zoom_does_not_open_archive() {
    let source = fixture_source();
    let router = create_router(source.clone(), RouterConfig::new()).unwrap();

    get(&router, "/tiles/99/0/0?url=vector.pmtiles").await;
    assert_eq!(source.open_count("vector.pmtiles").await, 0);

    get(&router, "/tiles/4/8/5?url=vector.pmtiles").await;
    assert_eq!(source.open_count("vector.pmtiles").await, 1);
}

// =============================================================================
// Archive Errors
// =============================================================================

#[tokio::test]
async fn test_archive_not_found() {
    let response = get(&router(), "/metadata?url=missing.pmtiles").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "not_found");
    assert!(json["message"].as_str().unwrap().contains("missing.pmtiles"));
}

#[tokio::test]
async fn test_missing_locator_rejected() {
    let response = get(&router(), "/tilejson.json").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_locator_rejected() {
    let response = get(&router(), "/metadata?url=").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_locator");
}

#[tokio::test]
async fn test_repeated_locator_uses_last_value() {
    let response = get(&router(), "/metadata?url=missing.pmtiles&url=vector.pmtiles").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, roads_and_mask_metadata());
}

#[tokio::test]
async fn test_unknown_path() {
    let response = get(&router(), "/wmts?url=vector.pmtiles").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Metadata
// =============================================================================

#[tokio::test]
async fn test_metadata_passthrough() {
    let response = get(&router(), "/metadata?url=vector.pmtiles").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("cache-control"));
    assert_eq!(body_json(response).await, roads_and_mask_metadata());
}

#[tokio::test]
async fn test_metadata_keeps_key_order() {
    let response = get(&router(), "/metadata?url=vector.pmtiles").await;
    let body = body_bytes(response).await;
    let text = std::str::from_utf8(&body).unwrap();

    let zeta = text.find("\"zeta\"").unwrap();
    let alpha = text.find("\"alpha\"").unwrap();
    assert!(zeta < alpha);
}

// =============================================================================
// Health, Caching and CORS
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let response = get(&router(), "/healthz").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("cache-control").is_none());
    assert_eq!(body_json(response).await, serde_json::json!({"ping": "pong!"}));
}

#[tokio::test]
async fn test_custom_cache_control() {
    let router = create_router(
        fixture_source(),
        RouterConfig::new().with_cache_control("no-store"),
    )
    .unwrap();

    for uri in [
        "/metadata?url=vector.pmtiles",
        "/tiles/4/8/5?url=vector.pmtiles",
        "/tilejson.json?url=vector.pmtiles",
        "/style.json?url=vector.pmtiles",
        "/map?url=vector.pmtiles",
    ] {
        let response = get(&router, uri).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert_eq!(
            response.headers().get("cache-control").unwrap(),
            "no-store",
            "{uri}"
        );
    }
}

#[tokio::test]
async fn test_cors_any_origin() {
    let request = Request::builder()
        .uri("/tilejson.json?url=vector.pmtiles")
        .header("origin", "https://maps.example.org")
        .body(Body::empty())
        .unwrap();

    let response = router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_cors_preflight() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/tiles/4/8/5?url=vector.pmtiles")
        .header("origin", "https://maps.example.org")
        .header("access-control-request-method", "GET")
        .body(Body::empty())
        .unwrap();

    let response = router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let methods = response
        .headers()
        .get("access-control-allow-methods")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(methods.contains("GET"));
    assert!(methods.contains("OPTIONS"));
}

#[tokio::test]
async fn test_cors_restricted_origin() {
    let router = create_router(
        fixture_source(),
        RouterConfig::new().with_cors_origins(vec!["https://allowed.example".to_string()]),
    )
    .unwrap();

    let request = Request::builder()
        .uri("/metadata?url=vector.pmtiles")
        .header("origin", "https://other.example")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}
