//! Output files of a run.
//!
//! Everything lands under one output directory:
//!
//! ```text
//! output/
//!   data/infrastructure_flood_impact.geojson
//!   data/road_flood_impact.geojson
//!   flood_impact_map.html
//!   flood_overlay.png
//!   static_maps/infrastructure_flood_impact.png
//!   static_maps/road_flood_impact.png
//!   static_maps/flood_impact_overview.png
//!   run_report.json
//! ```

pub mod html;
pub mod maps;
pub mod report;

use crate::RunError;
use floodmap_impact::FeatureCollection;
use floodmap_raster::{Crs, Projector};
use geo::{Geometry, MapCoords};
use std::path::{Path, PathBuf};

/// Layout of the output directory.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    root: PathBuf,
}

impl OutputPaths {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Create the output directory and its subdirectories.
    pub fn create_dirs(&self) -> Result<(), RunError> {
        std::fs::create_dir_all(self.root.join("data"))?;
        std::fs::create_dir_all(self.root.join("static_maps"))?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn infrastructure_geojson(&self) -> PathBuf {
        self.root.join("data").join("infrastructure_flood_impact.geojson")
    }

    pub fn roads_geojson(&self) -> PathBuf {
        self.root.join("data").join("road_flood_impact.geojson")
    }

    pub fn html_map(&self) -> PathBuf {
        self.root.join("flood_impact_map.html")
    }

    /// Overlay image referenced by the HTML map, relative to the map.
    pub fn overlay_file_name(&self) -> &'static str {
        "flood_overlay.png"
    }

    pub fn overlay(&self) -> PathBuf {
        self.root.join(self.overlay_file_name())
    }

    pub fn static_map(&self, name: &str) -> PathBuf {
        self.root.join("static_maps").join(format!("{}.png", name))
    }

    pub fn report(&self) -> PathBuf {
        self.root.join("run_report.json")
    }
}

/// `<stem>_preview.png` next to `output`.
pub fn preview_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "raster".to_string());
    output.with_file_name(format!("{}_preview.png", stem))
}

/// Geometries of `collection` in WGS84, `None` where reprojection fails.
pub(crate) fn wgs84_geometries(collection: &FeatureCollection) -> Vec<Option<Geometry<f64>>> {
    let projector = Projector::new(collection.crs(), Crs::Wgs84).ok();
    collection
        .iter()
        .map(|feature| {
            let geometry = feature.geometry.as_ref()?;
            let projector = projector.as_ref()?;
            if projector.is_identity() {
                return Some(geometry.clone());
            }
            geometry.try_map_coords(|c| projector.apply(c)).ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodmap_impact::{Properties, VectorFeature};
    use geo::{point, Point};

    #[test]
    fn test_preview_path() {
        assert_eq!(
            preview_path(Path::new("out/categories.tif")),
            PathBuf::from("out/categories_preview.png")
        );
        assert_eq!(preview_path(Path::new("depth")), PathBuf::from("depth_preview.png"));
    }

    #[test]
    fn test_output_layout() {
        let paths = OutputPaths::new("output");
        assert_eq!(
            paths.roads_geojson(),
            PathBuf::from("output/data/road_flood_impact.geojson")
        );
        assert_eq!(
            paths.static_map("flood_impact_overview"),
            PathBuf::from("output/static_maps/flood_impact_overview.png")
        );
    }

    #[test]
    fn test_wgs84_geometries() {
        let utm = Crs::Utm { zone: 31, north: true };
        let collection = FeatureCollection::with_features(
            utm,
            vec![
                VectorFeature::new(point!(x: 500_000.0, y: 0.0), Properties::new()),
                VectorFeature::without_geometry(Properties::new()),
            ],
        );
        let geometries = wgs84_geometries(&collection);
        assert_eq!(geometries.len(), 2);
        assert!(geometries[1].is_none());

        let Some(Geometry::Point(Point(c))) = &geometries[0] else {
            panic!("expected a point, got {:?}", geometries[0]);
        };
        assert!((c.x - 3.0).abs() < 1e-6);
        assert!(c.y.abs() < 1e-6);

        let unknown = FeatureCollection::with_features(
            Crs::Unknown,
            vec![VectorFeature::new(point!(x: 1.0, y: 2.0), Properties::new())],
        );
        assert!(wgs84_geometries(&unknown)[0].is_none());
    }
}
