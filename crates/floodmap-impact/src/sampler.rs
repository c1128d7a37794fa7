//! Zonal severity sampling: the worst flood category near a geometry.
//!
//! ## Buffer semantics
//!
//! A cell belongs to a feature's neighbourhood when its centre lies within
//! the search distance of the geometry. A point additionally reads the cell
//! it sits in, so a zero search distance still samples something. Lines get
//! no such extra: a road clipping the corner of a cell does not read it.
//!
//! Distances are always metric. Projected rasters are measured in their own
//! units converted to meters (Web Mercator scaled by `1 / cos(latitude)`);
//! geographic rasters are measured in the UTM zone containing the geometry's
//! centroid.

use crate::error::{ConfigError, SampleError};
use floodmap_raster::{CategoryRaster, Crs, Extent, FloodCategory, Projector, RasterError};
use geo::{
    BoundingRect, Closest, ClosestPoint, Coord, Distance, Euclidean, Geometry,
    Intersects, LineString, MapCoords, Point, Rect,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Meters per degree of latitude, rounded down so margins err large.
const METERS_PER_DEGREE_LAT: f64 = 110_000.0;

/// Meters per degree of longitude at the equator, rounded down.
const METERS_PER_DEGREE_LON: f64 = 111_000.0;

/// Smallest cosine used when widening longitude margins near the poles.
const MIN_COS_LAT: f64 = 0.01;

// ============================================================================
// Search distance
// ============================================================================

/// Buffer radius in meters: finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SearchDistance(f64);

impl SearchDistance {
    /// Default buffer radius in meters.
    pub const DEFAULT_METERS: f64 = 10.0;

    /// Validate a radius in meters.
    pub fn new(meters: f64) -> Result<Self, ConfigError> {
        if meters.is_finite() && meters >= 0.0 {
            Ok(Self(meters))
        } else {
            Err(ConfigError::InvalidSearchDistance(meters))
        }
    }

    /// Radius in meters.
    pub fn meters(self) -> f64 {
        self.0
    }
}

impl Default for SearchDistance {
    fn default() -> Self {
        Self(Self::DEFAULT_METERS)
    }
}

impl TryFrom<f64> for SearchDistance {
    type Error = ConfigError;

    fn try_from(meters: f64) -> Result<Self, Self::Error> {
        Self::new(meters)
    }
}

impl From<SearchDistance> for f64 {
    fn from(distance: SearchDistance) -> f64 {
        distance.0
    }
}

impl fmt::Display for SearchDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} m", self.0)
    }
}

// ============================================================================
// Geometry preparation
// ============================================================================

/// Sampled building blocks of a supported geometry.
#[derive(Debug, Clone)]
enum Part {
    Point(Point<f64>),
    Line(LineString<f64>),
}

impl Part {
    fn distance_to(&self, c: Coord<f64>) -> f64 {
        let p = Point(c);
        match self {
            Part::Point(q) => Euclidean.distance(p, *q),
            Part::Line(ls) => match ls.closest_point(&p) {
                Closest::Intersection(q) | Closest::SinglePoint(q) => Euclidean.distance(p, q),
                Closest::Indeterminate => f64::INFINITY,
            },
        }
    }

    /// Whether a point part lies in the cell. Lines never count this way.
    fn sits_in(&self, cell: &Rect<f64>) -> bool {
        match self {
            Part::Point(p) => cell.intersects(&p.0),
            Part::Line(_) => false,
        }
    }

    fn project(&self, projector: &Projector) -> Result<Part, SampleError> {
        if projector.is_identity() {
            return Ok(self.clone());
        }
        let convert = |c: Coord<f64>| projector.apply(c);
        let part = match self {
            Part::Point(p) => Part::Point(p.try_map_coords(convert).map_err(mismatch)?),
            Part::Line(ls) => Part::Line(ls.try_map_coords(convert).map_err(mismatch)?),
        };
        Ok(part)
    }
}

/// Split a geometry into parts, rejecting anything the sampler cannot buffer.
fn parts(geometry: &Geometry<f64>) -> Result<Vec<Part>, SampleError> {
    let parts = match geometry {
        Geometry::Point(p) => vec![Part::Point(*p)],
        Geometry::MultiPoint(mp) => mp.iter().copied().map(Part::Point).collect(),
        Geometry::LineString(ls) => vec![line_part(ls)?],
        Geometry::Line(line) => vec![Part::Line(LineString::from(vec![line.start, line.end]))],
        Geometry::MultiLineString(mls) => mls.iter().map(line_part).collect::<Result<Vec<_>, _>>()?,
        other => {
            return Err(SampleError::InvalidGeometry(format!(
                "unsupported geometry type {}",
                geometry_name(other)
            )))
        }
    };

    if parts.is_empty() {
        return Err(SampleError::InvalidGeometry("empty geometry".to_string()));
    }
    let finite = |c: &Coord<f64>| c.x.is_finite() && c.y.is_finite();
    let all_finite = parts.iter().all(|part| match part {
        Part::Point(p) => finite(&p.0),
        Part::Line(ls) => ls.coords().all(finite),
    });
    if !all_finite {
        return Err(SampleError::InvalidGeometry(
            "non-finite coordinate".to_string(),
        ));
    }
    Ok(parts)
}

fn line_part(ls: &LineString<f64>) -> Result<Part, SampleError> {
    if ls.0.len() < 2 {
        return Err(SampleError::InvalidGeometry(format!(
            "line string needs at least 2 coordinates, has {}",
            ls.0.len()
        )));
    }
    Ok(Part::Line(ls.clone()))
}

fn geometry_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

fn mismatch(e: RasterError) -> SampleError {
    SampleError::CrsMismatch(e.to_string())
}

/// Frame in which buffer distances are measured.
enum MetricFrame {
    /// Raster units, with the radius pre-scaled into them.
    Native { radius: f64 },
    /// A UTM zone for geographic rasters; parts are already projected.
    Utm {
        to_zone: Projector,
        parts: Vec<Part>,
        radius: f64,
    },
}

// ============================================================================
// Sampling
// ============================================================================

/// Maximum flood category within `distance` of `geometry`.
///
/// `feature_crs` is the reference system of the geometry; it is reprojected
/// into the raster's system when they differ. Nodata cells are ignored, so
/// partial overlap with unmapped areas yields the worst valid category.
///
/// Returns `Ok(None)` when the buffered geometry misses the raster or covers
/// only nodata cells.
///
/// # Errors
///
/// - [`SampleError::InvalidGeometry`] for empty, non-finite, degenerate or
///   unsupported (polygonal) geometries.
/// - [`SampleError::CrsMismatch`] when the geometry cannot be expressed in
///   the raster's reference system.
pub fn sample_max_category(
    geometry: &Geometry<f64>,
    feature_crs: Crs,
    raster: &CategoryRaster,
    distance: SearchDistance,
) -> Result<Option<FloodCategory>, SampleError> {
    let raster_crs = raster.crs();
    let split = parts(geometry)?;
    let to_raster = Projector::new(feature_crs, raster_crs).map_err(mismatch)?;
    let native: Vec<Part> = split
        .iter()
        .map(|part| part.project(&to_raster))
        .collect::<Result<_, _>>()?;

    let Some(bounds) = parts_bounds(&native) else {
        return Ok(None);
    };
    let anchor = bounds.center();
    let frame = metric_frame(raster_crs, anchor, &native, distance.meters())?;

    let envelope = match &frame {
        MetricFrame::Native { radius } => bounds.expand(*radius, *radius),
        MetricFrame::Utm { radius, .. } => {
            let dy = radius / METERS_PER_DEGREE_LAT;
            let max_lat = (bounds.min_y.abs().max(bounds.max_y.abs()) + dy).min(90.0);
            let cos_lat = max_lat.to_radians().cos().max(MIN_COS_LAT);
            let dx = radius / (METERS_PER_DEGREE_LON * cos_lat);
            bounds.expand(dx, dy)
        }
    };

    let (width, height) = raster.dimensions();
    let transform = raster.transform();
    let Some(window) = transform.window(&envelope, width, height) else {
        return Ok(None);
    };

    let mut worst: Option<FloodCategory> = None;
    for (col, row) in window.cells() {
        let Some(category) = raster.category(col, row) else {
            continue;
        };
        if worst.is_some_and(|w| category <= w) {
            continue;
        }

        let cell = transform.cell_extent(col, row);
        let cell_rect = Rect::new(
            Coord { x: cell.min_x, y: cell.min_y },
            Coord { x: cell.max_x, y: cell.max_y },
        );
        let inside = native.iter().any(|part| part.sits_in(&cell_rect))
            || within_radius(&frame, &native, transform.pixel_center(col, row));

        if inside {
            worst = Some(category);
            if category == FloodCategory::MAX {
                break;
            }
        }
    }

    Ok(worst)
}

fn within_radius(frame: &MetricFrame, native: &[Part], centre: Coord<f64>) -> bool {
    match frame {
        MetricFrame::Native { radius } => native.iter().any(|p| p.distance_to(centre) <= *radius),
        MetricFrame::Utm {
            to_zone,
            parts,
            radius,
        } => match to_zone.apply(centre) {
            Ok(c) => parts.iter().any(|p| p.distance_to(c) <= *radius),
            Err(_) => false,
        },
    }
}

fn metric_frame(
    raster_crs: Crs,
    anchor: Coord<f64>,
    native: &[Part],
    meters: f64,
) -> Result<MetricFrame, SampleError> {
    match raster_crs {
        crs if crs.is_geographic() => {
            let zone = Crs::utm_for(anchor.x, anchor.y);
            let to_zone = Projector::new(crs, zone).map_err(mismatch)?;
            let parts = native
                .iter()
                .map(|part| part.project(&to_zone))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(MetricFrame::Utm {
                to_zone,
                parts,
                radius: meters,
            })
        }
        Crs::WebMercator => {
            let lat = Crs::WebMercator.to_wgs84(anchor).map_err(mismatch)?.y;
            let cos_lat = lat.to_radians().cos().max(MIN_COS_LAT);
            Ok(MetricFrame::Native {
                radius: meters / cos_lat,
            })
        }
        crs => Ok(MetricFrame::Native {
            radius: meters / crs.meters_per_unit(),
        }),
    }
}

fn parts_bounds(parts: &[Part]) -> Option<Extent> {
    parts
        .iter()
        .filter_map(|part| match part {
            Part::Point(p) => Some(p.bounding_rect()),
            Part::Line(ls) => ls.bounding_rect(),
        })
        .map(|r| Extent::from_corners(r.min(), r.max()))
        .reduce(|a, b| Extent {
            min_x: a.min_x.min(b.min_x),
            min_y: a.min_y.min(b.min_y),
            max_x: a.max_x.max(b.max_x),
            max_y: a.max_y.max(b.max_y),
        })
}
