//! Interactive Leaflet map.
//!
//! The page is a single HTML file with the feature data inlined as WGS84
//! GeoJSON. Leaflet itself and the OpenStreetMap tiles are loaded from
//! their public CDNs when the page is opened.

use super::wgs84_geometries;
use floodmap_impact::{
    geometry_to_value, FeatureCollection, FLOOD_CATEGORY_PROPERTY, NOT_EVALUATED,
};
use floodmap_osm::BoundingBox;
use floodmap_raster::FloodCategory;
use serde_json::{json, Value};
use std::fmt::Write;
use tracing::warn;

const LEAFLET_VERSION: &str = "1.9.4";

/// Colour of features that were not evaluated.
pub const NOT_EVALUATED_HEX: &str = "#808080";

/// Content of the web map.
#[derive(Debug, Clone)]
pub struct MapPage<'a> {
    /// Page title.
    pub title: &'a str,
    /// Analysis area, drawn as a rectangle and used for the initial view.
    pub bounds: BoundingBox,
    /// Overlay image file name relative to the page, if one was written.
    pub overlay: Option<&'a str>,
    /// Infrastructure features.
    pub infrastructure: &'a FeatureCollection,
    /// Road features, when roads were analysed.
    pub roads: Option<&'a FeatureCollection>,
}

/// Inline GeoJSON of a collection in WGS84. Features that cannot be
/// reprojected are left out.
pub fn wgs84_feature_collection(collection: &FeatureCollection) -> Value {
    let geometries = wgs84_geometries(collection);
    let dropped = geometries.iter().filter(|g| g.is_none()).count();
    if dropped > 0 {
        warn!(
            features = dropped,
            crs = %collection.crs(),
            "features without a WGS84 geometry left off the web map"
        );
    }

    let features: Vec<Value> = collection
        .iter()
        .zip(geometries)
        .filter_map(|(feature, geometry)| {
            let geometry = geometry?;
            Some(json!({
                "type": "Feature",
                "geometry": geometry_to_value(&geometry),
                "properties": Value::Object(feature.properties.clone()),
            }))
        })
        .collect();

    json!({ "type": "FeatureCollection", "features": features })
}

/// Render the map page.
pub fn render_map_page(page: &MapPage<'_>) -> Result<String, std::fmt::Error> {
    let infrastructure = script_json(&wgs84_feature_collection(page.infrastructure));
    let roads = page
        .roads
        .map(|roads| script_json(&wgs84_feature_collection(roads)));

    let colors: serde_json::Map<String, Value> = FloodCategory::ALL
        .iter()
        .map(|c| (c.value().to_string(), Value::from(c.color_hex())))
        .chain(std::iter::once((
            NOT_EVALUATED.to_string(),
            Value::from(NOT_EVALUATED_HEX),
        )))
        .collect();
    let labels: serde_json::Map<String, Value> = FloodCategory::ALL
        .iter()
        .map(|c| (c.value().to_string(), Value::from(c.label())))
        .chain(std::iter::once((
            NOT_EVALUATED.to_string(),
            Value::from("Not evaluated"),
        )))
        .collect();

    let b = &page.bounds;
    let bounds = format!("[[{}, {}], [{}, {}]]", b.south, b.west, b.north, b.east);

    let mut html = String::new();
    write_page(&mut html, page, &bounds, &infrastructure, roads.as_deref(), &colors, &labels)?;
    Ok(html)
}

fn write_page(
    out: &mut String,
    page: &MapPage<'_>,
    bounds: &str,
    infrastructure: &str,
    roads: Option<&str>,
    colors: &serde_json::Map<String, Value>,
    labels: &serde_json::Map<String, Value>,
) -> std::fmt::Result {
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html>")?;
    writeln!(out, "<head>")?;
    writeln!(out, "<meta charset=\"utf-8\">")?;
    writeln!(out, "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">")?;
    writeln!(out, "<title>{}</title>", escape_html(page.title))?;
    writeln!(
        out,
        "<link rel=\"stylesheet\" href=\"https://unpkg.com/leaflet@{}/dist/leaflet.css\">",
        LEAFLET_VERSION
    )?;
    writeln!(
        out,
        "<script src=\"https://unpkg.com/leaflet@{}/dist/leaflet.js\"></script>",
        LEAFLET_VERSION
    )?;
    writeln!(out, "<style>")?;
    writeln!(out, "html, body, #map {{ height: 100%; margin: 0; }}")?;
    writeln!(
        out,
        ".legend {{ background: white; padding: 8px 10px; font: 13px sans-serif; \
         border-radius: 4px; box-shadow: 0 0 6px rgba(0,0,0,0.3); }}"
    )?;
    writeln!(
        out,
        ".legend i {{ display: inline-block; width: 14px; height: 14px; margin-right: 6px; \
         vertical-align: middle; border: 1px solid #333; }}"
    )?;
    writeln!(out, "</style>")?;
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")?;
    writeln!(out, "<div id=\"map\"></div>")?;
    writeln!(out, "<script>")?;

    writeln!(out, "const colors = {};", Value::Object(colors.clone()))?;
    writeln!(out, "const labels = {};", Value::Object(labels.clone()))?;
    writeln!(out, "const infrastructureData = {};", infrastructure)?;
    writeln!(out, "const roadData = {};", roads.unwrap_or("null"))?;
    writeln!(out, "const bounds = {};", bounds)?;
    writeln!(out)?;
    writeln!(
        out,
        "function category(feature) {{ const c = feature.properties.{}; \
         return (c === undefined || c === null) ? {} : c; }}",
        FLOOD_CATEGORY_PROPERTY, NOT_EVALUATED
    )?;
    writeln!(
        out,
        "function color(feature) {{ return colors[category(feature)] || '{}'; }}",
        NOT_EVALUATED_HEX
    )?;
    writeln!(out, "function escapeHtml(s) {{")?;
    writeln!(
        out,
        "  return String(s).replace(/[&<>\"']/g, ch => ({{'&': '&amp;', '<': '&lt;', '>': '&gt;', '\"': '&quot;', \"'\": '&#39;'}}[ch]));"
    )?;
    writeln!(out, "}}")?;
    writeln!(out, "function popup(feature, layer) {{")?;
    writeln!(out, "  const p = feature.properties;")?;
    writeln!(out, "  const kind = p.infrastructure_type || p.highway || '';")?;
    writeln!(
        out,
        "  layer.bindPopup('<b>' + escapeHtml(p.name || 'Unnamed') + '</b><br>' + \
         escapeHtml(kind) + '<br>' + escapeHtml(labels[category(feature)] || ''));"
    )?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(out, "const map = L.map('map');")?;
    writeln!(
        out,
        "const streets = L.tileLayer('https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', \
         {{ maxZoom: 19, attribution: '&copy; OpenStreetMap contributors' }}).addTo(map);"
    )?;
    writeln!(out, "const overlays = {{}};")?;
    if let Some(overlay) = page.overlay {
        writeln!(
            out,
            "overlays['Flood categories'] = L.imageOverlay({}, bounds, {{ opacity: 0.7 }}).addTo(map);",
            script_json(&Value::from(overlay))
        )?;
    }
    writeln!(
        out,
        "overlays['Analysis area'] = L.rectangle(bounds, {{ color: '#0000FF', weight: 2, fill: false }}).addTo(map);"
    )?;
    writeln!(out, "if (roadData) {{")?;
    writeln!(
        out,
        "  overlays['Roads'] = L.geoJSON(roadData, {{ style: f => ({{ color: color(f), weight: 3, opacity: 0.9 }}), onEachFeature: popup }}).addTo(map);"
    )?;
    writeln!(out, "}}")?;
    writeln!(
        out,
        "overlays['Infrastructure'] = L.geoJSON(infrastructureData, {{"
    )?;
    writeln!(
        out,
        "  pointToLayer: (f, latlng) => L.circleMarker(latlng, {{ radius: 7, fillColor: color(f), color: '#333', weight: 1, fillOpacity: 0.9 }}),"
    )?;
    writeln!(out, "  style: f => ({{ color: color(f), weight: 3 }}),")?;
    writeln!(out, "  onEachFeature: popup")?;
    writeln!(out, "}}).addTo(map);")?;
    writeln!(
        out,
        "L.control.layers({{ 'OpenStreetMap': streets }}, overlays, {{ collapsed: false }}).addTo(map);"
    )?;
    writeln!(out)?;
    writeln!(out, "const legend = L.control({{ position: 'bottomright' }});")?;
    writeln!(out, "legend.onAdd = function () {{")?;
    writeln!(out, "  const div = L.DomUtil.create('div', 'legend');")?;
    writeln!(out, "  div.innerHTML = '<b>Flood category</b><br>' + Object.keys(labels)")?;
    writeln!(out, "    .sort((a, b) => b - a)")?;
    writeln!(
        out,
        "    .map(k => '<i style=\"background:' + colors[k] + '\"></i>' + escapeHtml(labels[k]))"
    )?;
    writeln!(out, "    .join('<br>');")?;
    writeln!(out, "  return div;")?;
    writeln!(out, "}};")?;
    writeln!(out, "legend.addTo(map);")?;
    writeln!(out, "map.fitBounds(bounds);")?;
    writeln!(out, "</script>")?;
    writeln!(out, "</body>")?;
    writeln!(out, "</html>")?;
    Ok(())
}

/// JSON text safe to place inside a `<script>` element.
fn script_json(value: &Value) -> String {
    value.to_string().replace("</", "<\\/")
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
