//! Router tests against PMTiles archives on disk.
//!
//! Tests verify:
//! - Tiles, metadata and TileJSON served from a real archive
//! - Coordinates outside the tile grid are 404, not read errors
//! - Archives with brotli-compressed directories open

use axum::http::StatusCode;

use pmtiles_tiler::archive::PmtilesSource;
use pmtiles_tiler::{create_router, RouterConfig};

use super::test_utils::{body_bytes, body_json, get};

/// `url` query value for a file under `tests/fixtures`.
fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    urlencoding::encode(&path).into_owned()
}

fn router() -> axum::Router {
    create_router(PmtilesSource::new(), RouterConfig::new().with_tracing(false)).unwrap()
}

#[tokio::test]
async fn test_raster_archive_tiles() {
    let url = fixture("raster_z3.pmtiles");
    let router = router();

    for tile in ["0/0/0", "2/2/2", "3/4/5"] {
        let response = get(&router, &format!("/tiles/{tile}?url={url}")).await;
        assert_eq!(response.status(), StatusCode::OK, "{tile}");
        assert_eq!(response.headers().get("content-type").unwrap(), "image/png");
        assert!(response.headers().get("content-encoding").is_none());
        assert!(body_bytes(response).await.starts_with(b"\x89PNG"), "{tile}");
    }
}

#[tokio::test]
async fn test_tile_outside_grid_is_not_found() {
    let url = fixture("raster_z3.pmtiles");
    let router = router();

    for tile in ["0/5/5", "3/8/0", "3/0/8", "3/-1/0"] {
        let response = get(&router, &format!("/tiles/{tile}?url={url}")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{tile}");
        assert_eq!(body_json(response).await["error"], "tile_not_found", "{tile}");
    }

    // Inside the grid, past the archive's deepest zoom
    let response = get(&router, &format!("/tiles/6/1/1?url={url}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_raster_archive_documents() {
    let url = fixture("raster_z3.pmtiles");
    let router = router();

    let response = get(&router, &format!("/metadata?url={url}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!({}));

    let json = body_json(get(&router, &format!("/tilejson.json?url={url}")).await).await;
    assert_eq!(json["minzoom"], 0);
    assert_eq!(json["maxzoom"], 3);
    assert_eq!(json["bounds"], serde_json::json!([-180.0, -85.0, 180.0, 85.0]));
    assert!(json.get("vector_layers").is_none());

    let json = body_json(get(&router, &format!("/style.json?url={url}")).await).await;
    assert_eq!(json["sources"]["pmtiles"]["type"], "raster");
}

#[tokio::test]
async fn test_brotli_archive() {
    let url = fixture("single_tile_brotli.pmtiles");
    let router = router();

    let response = get(&router, &format!("/tiles/0/0/0?url={url}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-encoding").unwrap(), "br");

    let response = get(&router, &format!("/tilejson.json?url={url}")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&router, &format!("/style.json?url={url}")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_archive_file() {
    let url = fixture("absent.pmtiles");
    let response = get(&router(), &format!("/tilejson.json?url={url}")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "not_found");
}
