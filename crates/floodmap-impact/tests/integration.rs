//! End-to-end impact assignment on files.

use floodmap_impact::{
    assign_impact, read_feature_collection, write_feature_collection, ImpactConfig,
    SearchDistance, NOT_EVALUATED,
};
use floodmap_raster::{
    read_category_raster, reclassify, write_category_raster, Crs, GeoTransform, Raster,
    Thresholds,
};
use std::fs;

const FEATURES: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"name": "Memorial Hermann", "infrastructure_type": "hospital"},
     "geometry": {"type": "Point", "coordinates": [-95.39985, 29.79985]}},
    {"type": "Feature", "properties": {"name": "Allen Parkway", "highway": "primary"},
     "geometry": {"type": "LineString", "coordinates": [[-95.39995, 29.79995], [-95.39955, 29.79995]]}},
    {"type": "Feature", "properties": {"name": "Far Away School"},
     "geometry": {"type": "Point", "coordinates": [-97.0, 31.0]}},
    {"type": "Feature", "properties": {"name": "Broken"},
     "geometry": {"type": "Polygon", "coordinates": [[[-95.4, 29.8], [-95.39, 29.8], [-95.39, 29.79], [-95.4, 29.8]]]}}
  ]
}"#;

#[test]
fn test_assign_from_files() {
    let dir = tempfile::tempdir().expect("temp dir");
    let raster_path = dir.path().join("categories.tif");
    let features_path = dir.path().join("features.geojson");
    let output_path = dir.path().join("impact.geojson");

    // 5x2 cells of 0.0001 degrees; depths rise from west to east along row 0
    let depth = Raster::new(
        5,
        2,
        vec![0.0, 0.15, 0.3, 0.7, 1.2, 0.0, 0.0, 0.0, 0.0, 0.0],
        GeoTransform::from_origin(-95.4, 29.8, 0.0001, 0.0001),
        Crs::Wgs84,
        Some(-9999.0),
    )
    .expect("valid raster");
    write_category_raster(&raster_path, &reclassify(&depth, &Thresholds::default()))
        .expect("write categories");
    fs::write(&features_path, FEATURES).expect("write features");

    let raster = read_category_raster(&raster_path).expect("read categories");
    let features = read_feature_collection(&features_path).expect("read features");
    let config = ImpactConfig {
        search_distance: SearchDistance::new(2.0).expect("valid distance"),
        ..ImpactConfig::default()
    };

    let outcome = assign_impact(features, &raster, &config);
    write_feature_collection(&output_path, &outcome.collection).expect("write output");

    let written = read_feature_collection(&output_path).expect("read output");
    let categories: Vec<Option<i64>> = written
        .iter()
        .map(|f| f.flood_category_value())
        .collect();
    // hospital sits in cell (1, 1), the road runs through row 0
    assert_eq!(categories, vec![Some(0), Some(4), Some(NOT_EVALUATED), Some(NOT_EVALUATED)]);
    assert_eq!(written.features()[1].property_str("name"), Some("Allen Parkway"));

    assert_eq!(outcome.summary.evaluated, 2);
    assert_eq!(outcome.summary.not_evaluated, 1);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].index, 3);
}
