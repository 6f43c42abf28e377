//! Viewer module - generates the MapLibre page that renders an archive's style.

/// Encode a URL as a JavaScript string literal that is safe inside `<script>`.
fn js_string(s: &str) -> String {
    // serde_json handles quotes and control characters; `</` would still close the script tag.
    serde_json::Value::from(s)
        .to_string()
        .replace("</", "<\\/")
}

/// Generate an HTML page with a full-screen MapLibre map.
///
/// # Arguments
///
/// * `style_url` - Absolute URL of the `/style.json` endpoint, query string included
pub fn generate_viewer_html(style_url: &str) -> String {
    let style_url = js_string(style_url);

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>PMTiles Viewer</title>
    <script src="https://unpkg.com/maplibre-gl@4/dist/maplibre-gl.js"></script>
    <link href="https://unpkg.com/maplibre-gl@4/dist/maplibre-gl.css" rel="stylesheet" />
    <style>
        body {{
            margin: 0;
            padding: 0;
        }}
        #map {{
            position: absolute;
            top: 0;
            bottom: 0;
            width: 100%;
        }}
    </style>
</head>
<body>
    <div id="map"></div>
    <script>
        const map = new maplibregl.Map({{
            container: "map",
            style: {style_url},
            hash: true
        }});
        map.addControl(new maplibregl.NavigationControl());
        map.addControl(new maplibregl.ScaleControl());
    </script>
</body>
</html>
"##
    )
}
