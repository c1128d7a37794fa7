//! GeoJSON (RFC 7946) feature collections.
//!
//! Only what the impact pipeline needs: `FeatureCollection` documents with
//! point, line and polygon geometries. Collections in a projected system
//! carry the legacy `crs` member (`{"type": "name", "properties": {"name":
//! "EPSG:32615"}}`) so they can be read back without guessing.
//!
//! A feature whose geometry is null or cannot be decoded is kept with no
//! geometry rather than failing the whole file; the assigner reports it.

use crate::error::GeoJsonError;
use crate::feature::{FeatureCollection, Properties, VectorFeature};
use floodmap_raster::Crs;
use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde_json::{json, Map, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

type Result<T> = std::result::Result<T, GeoJsonError>;

/// Read a feature collection from a GeoJSON file.
pub fn read_feature_collection<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let value: Value = serde_json::from_reader(reader)?;
    let collection = feature_collection_from_value(&value)?;
    debug!(path = %path.display(), features = collection.len(), "read GeoJSON");
    Ok(collection)
}

/// Parse a feature collection from GeoJSON text.
pub fn parse_feature_collection(text: &str) -> Result<FeatureCollection> {
    let value: Value = serde_json::from_str(text)?;
    feature_collection_from_value(&value)
}

/// Write a feature collection as a GeoJSON file.
pub fn write_feature_collection<P: AsRef<Path>>(
    path: P,
    collection: &FeatureCollection,
) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, &feature_collection_to_value(collection))?;
    writer.flush()?;
    debug!(path = %path.display(), features = collection.len(), "wrote GeoJSON");
    Ok(())
}

/// Decode a GeoJSON `FeatureCollection` object.
pub fn feature_collection_from_value(value: &Value) -> Result<FeatureCollection> {
    let object = value
        .as_object()
        .ok_or_else(|| GeoJsonError::Format("document is not a JSON object".to_string()))?;

    match object.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {}
        Some(other) => {
            return Err(GeoJsonError::Format(format!(
                "expected a FeatureCollection, found {}",
                other
            )))
        }
        None => return Err(GeoJsonError::Format("missing \"type\" member".to_string())),
    }

    let crs = match object.get("crs") {
        Some(Value::Null) | None => Crs::Wgs84,
        Some(crs) => parse_crs(crs)?,
    };

    let features = object
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| GeoJsonError::Format("missing \"features\" array".to_string()))?;

    let features = features
        .iter()
        .enumerate()
        .map(|(index, feature)| feature_from_value(index, feature))
        .collect::<Result<Vec<_>>>()?;

    Ok(FeatureCollection::with_features(crs, features))
}

/// Encode a feature collection as a GeoJSON object.
pub fn feature_collection_to_value(collection: &FeatureCollection) -> Value {
    let features: Vec<Value> = collection
        .iter()
        .map(|feature| {
            json!({
                "type": "Feature",
                "geometry": feature.geometry.as_ref().map_or(Value::Null, geometry_to_value),
                "properties": Value::Object(feature.properties.clone()),
            })
        })
        .collect();

    let mut object = Map::new();
    object.insert("type".to_string(), Value::from("FeatureCollection"));
    if collection.crs() != Crs::Wgs84 {
        if let Some(code) = collection.crs().epsg() {
            object.insert(
                "crs".to_string(),
                json!({ "type": "name", "properties": { "name": format!("EPSG:{}", code) } }),
            );
        }
    }
    object.insert("features".to_string(), Value::Array(features));
    Value::Object(object)
}

fn parse_crs(value: &Value) -> Result<Crs> {
    let name = value
        .pointer("/properties/name")
        .and_then(Value::as_str)
        .ok_or_else(|| GeoJsonError::Format("unrecognised \"crs\" member".to_string()))?;

    // EPSG:4326, urn:ogc:def:crs:EPSG::4326 and urn:ogc:def:crs:OGC:1.3:CRS84
    if name.ends_with("CRS84") {
        return Ok(Crs::Wgs84);
    }
    name.rsplit(':')
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .map(Crs::from_epsg)
        .ok_or_else(|| GeoJsonError::Format(format!("unrecognised CRS name '{}'", name)))
}

fn feature_from_value(index: usize, value: &Value) -> Result<VectorFeature> {
    let object = value
        .as_object()
        .ok_or_else(|| GeoJsonError::Format(format!("feature {} is not an object", index)))?;

    let properties = match object.get("properties") {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::Null) | None => Properties::new(),
        Some(_) => {
            return Err(GeoJsonError::Format(format!(
                "feature {} has non-object properties",
                index
            )))
        }
    };

    let geometry = match object.get("geometry") {
        Some(Value::Null) | None => None,
        Some(geometry) => match geometry_from_value(geometry) {
            Ok(geometry) => Some(geometry),
            Err(reason) => {
                warn!(index, %reason, "unreadable feature geometry");
                None
            }
        },
    };

    Ok(VectorFeature {
        geometry,
        properties,
    })
}

/// Decode a GeoJSON geometry object.
pub fn geometry_from_value(value: &Value) -> std::result::Result<Geometry<f64>, String> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or("geometry has no type")?;
    let coordinates = value.get("coordinates").ok_or("geometry has no coordinates");

    let geometry = match kind {
        "Point" => Geometry::Point(Point(position(coordinates?)?)),
        "MultiPoint" => Geometry::MultiPoint(MultiPoint(
            positions(coordinates?)?.into_iter().map(Point).collect(),
        )),
        "LineString" => Geometry::LineString(LineString(positions(coordinates?)?)),
        "MultiLineString" => Geometry::MultiLineString(MultiLineString(
            nested(coordinates?, |v| positions(v).map(LineString))?,
        )),
        "Polygon" => Geometry::Polygon(polygon(coordinates?)?),
        "MultiPolygon" => Geometry::MultiPolygon(MultiPolygon(nested(coordinates?, polygon)?)),
        other => return Err(format!("unsupported geometry type {}", other)),
    };
    Ok(geometry)
}

/// Encode a geometry as a GeoJSON geometry object.
///
/// Types without a GeoJSON equivalent (lines, rects, triangles) are written
/// as their closest GeoJSON shape.
pub fn geometry_to_value(geometry: &Geometry<f64>) -> Value {
    match geometry {
        Geometry::Point(p) => json!({ "type": "Point", "coordinates": coord_value(p.0) }),
        Geometry::MultiPoint(mp) => json!({
            "type": "MultiPoint",
            "coordinates": mp.iter().map(|p| coord_value(p.0)).collect::<Vec<_>>(),
        }),
        Geometry::LineString(ls) => json!({ "type": "LineString", "coordinates": ring_value(ls) }),
        Geometry::Line(line) => json!({
            "type": "LineString",
            "coordinates": [coord_value(line.start), coord_value(line.end)],
        }),
        Geometry::MultiLineString(mls) => json!({
            "type": "MultiLineString",
            "coordinates": mls.iter().map(ring_value).collect::<Vec<_>>(),
        }),
        Geometry::Polygon(poly) => json!({ "type": "Polygon", "coordinates": polygon_value(poly) }),
        Geometry::MultiPolygon(mp) => json!({
            "type": "MultiPolygon",
            "coordinates": mp.iter().map(polygon_value).collect::<Vec<_>>(),
        }),
        Geometry::Rect(rect) => json!({ "type": "Polygon", "coordinates": polygon_value(&rect.to_polygon()) }),
        Geometry::Triangle(tri) => json!({ "type": "Polygon", "coordinates": polygon_value(&tri.to_polygon()) }),
        Geometry::GeometryCollection(gc) => json!({
            "type": "GeometryCollection",
            "geometries": gc.iter().map(geometry_to_value).collect::<Vec<_>>(),
        }),
    }
}

fn position(value: &Value) -> std::result::Result<Coord<f64>, String> {
    let array = value.as_array().ok_or("position is not an array")?;
    match (
        array.first().and_then(Value::as_f64),
        array.get(1).and_then(Value::as_f64),
    ) {
        (Some(x), Some(y)) => Ok(Coord { x, y }),
        _ => Err("position needs two numbers".to_string()),
    }
}

fn positions(value: &Value) -> std::result::Result<Vec<Coord<f64>>, String> {
    nested(value, position)
}

fn nested<T>(
    value: &Value,
    item: impl Fn(&Value) -> std::result::Result<T, String>,
) -> std::result::Result<Vec<T>, String> {
    value
        .as_array()
        .ok_or_else(|| "coordinates are not an array".to_string())?
        .iter()
        .map(item)
        .collect()
}

fn polygon(value: &Value) -> std::result::Result<Polygon<f64>, String> {
    let mut rings = nested(value, |v| positions(v).map(LineString))?.into_iter();
    let exterior = rings.next().ok_or("polygon has no exterior ring")?;
    Ok(Polygon::new(exterior, rings.collect()))
}

fn coord_value(c: Coord<f64>) -> Value {
    json!([c.x, c.y])
}

fn ring_value(ls: &LineString<f64>) -> Vec<Value> {
    ls.coords().map(|c| coord_value(*c)).collect()
}

fn polygon_value(poly: &Polygon<f64>) -> Vec<Vec<Value>> {
    std::iter::once(poly.exterior())
        .chain(poly.interiors())
        .map(ring_value)
        .collect()
}
