//! The vector source abstraction and the area of interest.

use crate::{Result, SourceError};
use floodmap_impact::{FeatureCollection, InfrastructureKind};
use floodmap_raster::{Crs, Extent, Projector, RasterError};
use geo::Rect;

/// Area of interest in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Western longitude.
    pub west: f64,
    /// Southern latitude.
    pub south: f64,
    /// Eastern longitude.
    pub east: f64,
    /// Northern latitude.
    pub north: f64,
}

impl BoundingBox {
    /// Create a bounding box, checking that it is a valid, non-empty area.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self> {
        let finite = [west, south, east, north].iter().all(|v| v.is_finite());
        if !finite || west >= east || south >= north || south < -90.0 || north > 90.0 {
            return Err(SourceError::InvalidBoundingBox(format!(
                "west={}, south={}, east={}, north={}",
                west, south, east, north
            )));
        }
        Ok(Self {
            west,
            south,
            east,
            north,
        })
    }

    /// WGS84 bounds of a raster extent given in `crs`.
    pub fn from_extent(extent: &Extent, crs: Crs) -> Result<Self> {
        let invalid = |e: RasterError| SourceError::InvalidBoundingBox(e.to_string());
        let to_wgs84 = Projector::new(crs, Crs::Wgs84).map_err(invalid)?;
        let corners = extent
            .corners()
            .iter()
            .map(|&c| to_wgs84.apply(c))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(invalid)?;

        let (mut west, mut south) = (f64::INFINITY, f64::INFINITY);
        let (mut east, mut north) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for c in &corners {
            west = west.min(c.x);
            east = east.max(c.x);
            south = south.min(c.y);
            north = north.max(c.y);
        }
        Self::new(west, south, east, north)
    }

    /// Overpass QL bounding box filter body: `south,west,north,east`.
    pub fn overpass_filter(&self) -> String {
        format!("{},{},{},{}", self.south, self.west, self.north, self.east)
    }

    /// Whether a WGS84 rectangle overlaps the box.
    pub fn intersects(&self, rect: &Rect<f64>) -> bool {
        rect.min().x <= self.east
            && rect.max().x >= self.west
            && rect.min().y <= self.north
            && rect.max().y >= self.south
    }
}

/// Where infrastructure and road features come from.
///
/// Implementations return collections in any CRS they declare; an empty
/// collection means the source has nothing for the area.
pub trait VectorSource {
    /// Short name for logs and reports.
    fn name(&self) -> &str;

    /// Features of one infrastructure kind inside `bbox`.
    fn infrastructure(&self, bbox: &BoundingBox, kind: &InfrastructureKind) -> Result<FeatureCollection>;

    /// Road network inside `bbox`.
    fn roads(&self, bbox: &BoundingBox) -> Result<FeatureCollection>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;

    #[test]
    fn test_rejects_degenerate_boxes() {
        assert!(BoundingBox::new(-95.5, 29.7, -95.3, 29.8).is_ok());
        assert!(BoundingBox::new(-95.3, 29.7, -95.5, 29.8).is_err());
        assert!(BoundingBox::new(-95.5, 29.8, -95.3, 29.8).is_err());
        assert!(BoundingBox::new(f64::NAN, 29.7, -95.3, 29.8).is_err());
    }

    #[test]
    fn test_from_utm_extent() {
        let extent = Extent {
            min_x: 500_000.0,
            min_y: 0.0,
            max_x: 600_000.0,
            max_y: 100_000.0,
        };
        let bbox = BoundingBox::from_extent(&extent, Crs::Utm { zone: 31, north: true })
            .expect("projectable extent");
        // zone 31 central meridian is 3 degrees east
        assert!((bbox.west - 3.0).abs() < 1e-9);
        assert!(bbox.east > 3.89 && bbox.east < 3.91);
        assert!(bbox.south.abs() < 1e-9);
        assert!(bbox.north > 0.9 && bbox.north < 0.91);
    }

    #[test]
    fn test_from_nad83_utm_extent() {
        // NAD83 / UTM zone 15N around downtown Houston
        let extent = Extent {
            min_x: 270_000.0,
            min_y: 3_290_000.0,
            max_x: 275_000.0,
            max_y: 3_296_000.0,
        };
        let bbox = BoundingBox::from_extent(&extent, Crs::from_epsg(26915)).expect("projectable extent");
        assert!(bbox.west > -95.42 && bbox.west < -95.36, "west {}", bbox.west);
        assert!(bbox.east > -95.37 && bbox.east < -95.31, "east {}", bbox.east);
        assert!(bbox.south > 29.70 && bbox.south < 29.74, "south {}", bbox.south);
        assert!(bbox.north > 29.75 && bbox.north < 29.79, "north {}", bbox.north);
    }

    #[test]
    fn test_from_unknown_crs_fails() {
        let extent = Extent {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 1.0,
            max_y: 1.0,
        };
        assert!(matches!(
            BoundingBox::from_extent(&extent, Crs::Unknown),
            Err(SourceError::InvalidBoundingBox(_))
        ));
    }

    #[test]
    fn test_overpass_filter_and_intersects() {
        let bbox = BoundingBox::new(-95.5, 29.7, -95.3, 29.8).expect("valid box");
        assert_eq!(bbox.overpass_filter(), "29.7,-95.5,29.8,-95.3");

        let inside = Rect::new(Coord { x: -95.4, y: 29.75 }, Coord { x: -95.35, y: 29.76 });
        let outside = Rect::new(Coord { x: -94.0, y: 29.75 }, Coord { x: -93.9, y: 29.76 });
        assert!(bbox.intersects(&inside));
        assert!(!bbox.intersects(&outside));
    }
}
