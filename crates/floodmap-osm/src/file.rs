//! Offline vector source backed by local GeoJSON files.

use crate::overpass::UNNAMED_ROAD;
use crate::source::{BoundingBox, VectorSource};
use crate::Result;
use floodmap_impact::{read_feature_collection, FeatureCollection, InfrastructureKind, VectorFeature};
use floodmap_raster::Crs;
use geo::{BoundingRect, Geometry};
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// Vector source reading previously exported or hand-made GeoJSON.
///
/// An infrastructure feature belongs to the kind named by its
/// `infrastructure_type` property. Features without that property belong to
/// the kind whose OSM tag they carry (`amenity: hospital`), so every feature
/// lands in at most one kind. Layers without a file yield empty collections.
#[derive(Debug, Clone, Default)]
pub struct GeoJsonFileSource {
    infrastructure: Option<FeatureCollection>,
    roads: Option<FeatureCollection>,
}

impl GeoJsonFileSource {
    /// Load the given files; either may be absent.
    pub fn open(infrastructure: Option<&Path>, roads: Option<&Path>) -> Result<Self> {
        let infrastructure = infrastructure.map(read_feature_collection).transpose()?;
        let roads = roads.map(read_feature_collection).transpose()?;
        Ok(Self::from_collections(infrastructure, roads))
    }

    /// Source over in-memory collections.
    pub fn from_collections(
        infrastructure: Option<FeatureCollection>,
        roads: Option<FeatureCollection>,
    ) -> Self {
        Self {
            infrastructure,
            roads,
        }
    }
}

impl VectorSource for GeoJsonFileSource {
    fn name(&self) -> &str {
        "geojson"
    }

    fn infrastructure(&self, bbox: &BoundingBox, kind: &InfrastructureKind) -> Result<FeatureCollection> {
        let Some(source) = &self.infrastructure else {
            return Ok(FeatureCollection::new(Crs::Wgs84));
        };

        let mut collection = FeatureCollection::new(source.crs());
        for feature in source.iter() {
            if !matches_kind(feature, kind) || !in_area(feature, source.crs(), bbox) {
                continue;
            }
            let mut feature = feature.clone();
            let defaults = [
                ("name", kind.unnamed_label()),
                ("infrastructure_type", kind.name.clone()),
                ("group", kind.group.clone()),
                ("description", kind.description.clone()),
            ];
            for (key, value) in defaults {
                set_default(&mut feature, key, value);
            }
            collection.push(feature);
        }

        info!(kind = %kind.name, features = collection.len(), "loaded infrastructure from file");
        Ok(collection)
    }

    fn roads(&self, bbox: &BoundingBox) -> Result<FeatureCollection> {
        let Some(source) = &self.roads else {
            return Ok(FeatureCollection::new(Crs::Wgs84));
        };

        let mut collection = FeatureCollection::new(source.crs());
        for feature in source.iter() {
            let linear = matches!(
                feature.geometry,
                Some(Geometry::LineString(_) | Geometry::MultiLineString(_))
            );
            if !linear || !in_area(feature, source.crs(), bbox) {
                continue;
            }
            let mut feature = feature.clone();
            set_default(&mut feature, "name", UNNAMED_ROAD.to_string());
            set_default(&mut feature, "highway", "road".to_string());
            collection.push(feature);
        }

        info!(features = collection.len(), "loaded road network from file");
        Ok(collection)
    }
}

fn matches_kind(feature: &VectorFeature, kind: &InfrastructureKind) -> bool {
    match feature.property_str("infrastructure_type") {
        Some(name) => name == kind.name,
        None => feature.property_str(&kind.osm_key) == Some(kind.osm_value.as_str()),
    }
}

/// Area filter for WGS84 layers; projected layers are taken whole.
fn in_area(feature: &VectorFeature, crs: Crs, bbox: &BoundingBox) -> bool {
    if crs != Crs::Wgs84 {
        return true;
    }
    match feature.geometry.as_ref().and_then(|g| g.bounding_rect()) {
        Some(rect) => bbox.intersects(&rect),
        None => true,
    }
}

fn set_default(feature: &mut VectorFeature, key: &str, value: String) {
    let missing = match feature.properties.get(key) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    };
    if missing {
        feature.properties.insert(key.to_string(), Value::from(value));
    }
}
