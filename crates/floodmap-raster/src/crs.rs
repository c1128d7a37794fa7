//! Coordinate reference systems and the projections between them.
//!
//! Projections run through `proj4rs`. WGS84, Web Mercator and the WGS84
//! UTM zones carry their own PROJ definitions; every other EPSG code is
//! looked up in the `crs-definitions` table. A code missing from the table,
//! or whose definition `proj4rs` cannot build, is kept as an EPSG code so
//! it can still be written back out and compared for equality.
//!
//! Coordinates use `x = longitude/easting` and `y = latitude/northing`, with
//! geographic coordinates in degrees.

use crate::{RasterError, Result};
use geo::Coord;
use proj4rs::proj::Proj;
use std::borrow::Cow;
use std::fmt;

const WGS84_DEFINITION: &str = "+proj=longlat +datum=WGS84 +no_defs";

const WEB_MERCATOR_DEFINITION: &str =
    "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs";

/// US survey foot in meters.
const US_SURVEY_FOOT: f64 = 1200.0 / 3937.0;

/// Coordinate reference system of a raster or vector dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crs {
    /// Geographic WGS84 longitude/latitude in degrees (EPSG:4326).
    Wgs84,
    /// Spherical Web Mercator in meters (EPSG:3857).
    WebMercator,
    /// WGS84 UTM zone in meters (EPSG:326zz north, 327zz south).
    Utm {
        /// Zone number (1-60).
        zone: u8,
        /// Northern hemisphere.
        north: bool,
    },
    /// Any other EPSG code, projectable when its definition is known.
    Epsg(u16),
    /// No reference system information.
    Unknown,
}

impl Crs {
    /// Map an EPSG code to a reference system.
    pub fn from_epsg(code: u16) -> Self {
        match code {
            4326 => Crs::Wgs84,
            3857 => Crs::WebMercator,
            32601..=32660 => Crs::Utm {
                zone: (code - 32600) as u8,
                north: true,
            },
            32701..=32760 => Crs::Utm {
                zone: (code - 32700) as u8,
                north: false,
            },
            _ => Crs::Epsg(code),
        }
    }

    /// EPSG code, if known.
    pub fn epsg(&self) -> Option<u16> {
        match *self {
            Crs::Wgs84 => Some(4326),
            Crs::WebMercator => Some(3857),
            Crs::Utm { zone, north: true } => Some(32600 + zone as u16),
            Crs::Utm { zone, north: false } => Some(32700 + zone as u16),
            Crs::Epsg(code) => Some(code),
            Crs::Unknown => None,
        }
    }

    /// The UTM zone containing a WGS84 coordinate.
    pub fn utm_for(lon: f64, lat: f64) -> Self {
        let zone = (((lon + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u8;
        Crs::Utm {
            zone,
            north: lat >= 0.0,
        }
    }

    /// PROJ definition string, if this system has one.
    pub fn definition(&self) -> Option<Cow<'static, str>> {
        match *self {
            Crs::Wgs84 => Some(Cow::Borrowed(WGS84_DEFINITION)),
            Crs::WebMercator => Some(Cow::Borrowed(WEB_MERCATOR_DEFINITION)),
            Crs::Utm { zone, north } => Some(Cow::Owned(format!(
                "+proj=utm +zone={}{} +datum=WGS84 +units=m +no_defs",
                zone,
                if north { "" } else { " +south" }
            ))),
            Crs::Epsg(code) => crs_definitions::from_code(code).map(|def| Cow::Borrowed(def.proj4)),
            Crs::Unknown => None,
        }
    }

    /// Whether coordinates are angular degrees rather than linear units.
    pub fn is_geographic(&self) -> bool {
        match self {
            Crs::Wgs84 => true,
            Crs::Epsg(_) => self
                .definition()
                .is_some_and(|def| def.split_whitespace().any(|t| t == "+proj=longlat" || t == "+proj=latlong")),
            _ => false,
        }
    }

    /// Whether coordinates can be converted to and from WGS84.
    pub fn is_projectable(&self) -> bool {
        self.proj().is_ok()
    }

    /// Length of one coordinate unit in meters for projected systems.
    ///
    /// Geographic and unknown systems report 1.
    pub fn meters_per_unit(&self) -> f64 {
        if self.is_geographic() {
            return 1.0;
        }
        let Some(def) = self.definition() else {
            return 1.0;
        };
        let param = |name: &str| {
            def.split_whitespace()
                .find_map(|token| token.strip_prefix(name))
                .map(str::to_string)
        };
        if let Some(to_meter) = param("+to_meter=").and_then(|v| v.parse::<f64>().ok()) {
            return to_meter;
        }
        match param("+units=").as_deref() {
            Some("km") => 1000.0,
            Some("ft") => 0.3048,
            Some("us-ft") => US_SURVEY_FOOT,
            Some("yd") => 0.9144,
            Some("us-yd") => 3.0 * US_SURVEY_FOOT,
            Some("ch") => 20.1168,
            Some("link") => 0.201_168,
            _ => 1.0,
        }
    }

    /// Convert a coordinate in this system to WGS84 longitude/latitude.
    pub fn to_wgs84(&self, c: Coord) -> Result<Coord> {
        self.transform(&Crs::Wgs84, c)
    }

    /// Convert a WGS84 longitude/latitude coordinate into this system.
    pub fn from_wgs84(&self, c: Coord) -> Result<Coord> {
        Crs::Wgs84.transform(self, c)
    }

    /// Convert a coordinate from this system into `target`.
    ///
    /// Identical systems (including two unknown ones) pass coordinates
    /// through untouched. Converting many coordinates is cheaper through a
    /// [`Projector`].
    pub fn transform(&self, target: &Crs, c: Coord) -> Result<Coord> {
        Projector::new(*self, *target)?.apply(c)
    }

    fn proj(&self) -> Result<Proj> {
        let def = self.definition().ok_or_else(|| self.unsupported(&Crs::Wgs84))?;
        Proj::from_proj_string(&def).map_err(|e| RasterError::CrsDefinition {
            crs: self.to_string(),
            reason: e.to_string(),
        })
    }

    fn unsupported(&self, target: &Crs) -> RasterError {
        RasterError::UnsupportedCrs {
            from: self.to_string(),
            to: target.to_string(),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg() {
            Some(code) => write!(f, "EPSG:{}", code),
            None => write!(f, "unknown CRS"),
        }
    }
}

/// Built projection from one reference system into another.
///
/// Parsing PROJ definitions is not free, so callers converting whole
/// geometries build one of these and reuse it for every coordinate.
pub struct Projector {
    source: Crs,
    target: Crs,
    steps: Option<Steps>,
}

struct Steps {
    source: Proj,
    target: Proj,
    source_geographic: bool,
    target_geographic: bool,
}

impl Projector {
    /// Prepare a projection from `source` into `target`.
    ///
    /// # Errors
    ///
    /// [`RasterError::UnsupportedCrs`] when the systems differ and either
    /// has no usable definition.
    pub fn new(source: Crs, target: Crs) -> Result<Self> {
        if source == target {
            return Ok(Self {
                source,
                target,
                steps: None,
            });
        }
        let build = |crs: &Crs| crs.proj().map_err(|_| source.unsupported(&target));
        let steps = Steps {
            source: build(&source)?,
            target: build(&target)?,
            source_geographic: source.is_geographic(),
            target_geographic: target.is_geographic(),
        };
        Ok(Self {
            source,
            target,
            steps: Some(steps),
        })
    }

    pub fn source(&self) -> Crs {
        self.source
    }

    pub fn target(&self) -> Crs {
        self.target
    }

    /// Whether coordinates pass through unchanged.
    pub fn is_identity(&self) -> bool {
        self.steps.is_none()
    }

    /// Project one coordinate.
    pub fn apply(&self, c: Coord) -> Result<Coord> {
        let Some(steps) = &self.steps else {
            return Ok(c);
        };
        let invalid = |reason: String| RasterError::Projection {
            x: c.x,
            y: c.y,
            reason,
        };
        if !c.x.is_finite() || !c.y.is_finite() {
            return Err(invalid("non-finite coordinate".to_string()));
        }

        let mut point = if steps.source_geographic {
            if c.y.abs() > 90.0 {
                return Err(invalid("not a valid longitude/latitude".to_string()));
            }
            (c.x.to_radians(), c.y.to_radians(), 0.0)
        } else {
            (c.x, c.y, 0.0)
        };
        proj4rs::transform::transform(&steps.source, &steps.target, &mut point)
            .map_err(|e| invalid(e.to_string()))?;

        let (x, y) = if steps.target_geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };
        if !x.is_finite() || !y.is_finite() {
            return Err(invalid(format!("no finite image in {}", self.target)));
        }
        Ok(Coord { x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_from_epsg() {
        assert_eq!(Crs::from_epsg(4326), Crs::Wgs84);
        assert_eq!(Crs::from_epsg(3857), Crs::WebMercator);
        assert_eq!(Crs::from_epsg(32610), Crs::Utm { zone: 10, north: true });
        assert_eq!(Crs::from_epsg(32755), Crs::Utm { zone: 55, north: false });
        assert_eq!(Crs::from_epsg(2056), Crs::Epsg(2056));
        assert_eq!(Crs::Utm { zone: 10, north: true }.epsg(), Some(32610));
        assert_eq!(Crs::Unknown.epsg(), None);
    }

    #[test]
    fn test_utm_zone_selection() {
        assert_eq!(Crs::utm_for(-122.33, 47.6), Crs::Utm { zone: 10, north: true });
        assert_eq!(Crs::utm_for(151.2, -33.9), Crs::Utm { zone: 56, north: false });
        assert_eq!(Crs::utm_for(180.0, 0.0), Crs::Utm { zone: 60, north: true });
    }

    #[test]
    fn test_utm_central_meridian_equator() {
        // Zone 31 central meridian is 3°E; the equator maps to the false origin.
        let utm = Crs::Utm { zone: 31, north: true };
        let p = utm.from_wgs84(Coord { x: 3.0, y: 0.0 }).expect("projectable");
        assert_abs_diff_eq!(p.x, 500_000.0, epsilon = 1e-3);
        assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_utm_meridian_arc() {
        // On the central meridian the northing is k0 times the meridian arc length.
        let utm = Crs::Utm { zone: 10, north: true };
        let p = utm.from_wgs84(Coord { x: -123.0, y: 45.0 }).expect("projectable");
        assert_abs_diff_eq!(p.x, 500_000.0, epsilon = 1e-3);
        assert_abs_diff_eq!(p.y, 4_982_950.4, epsilon = 1.0);
    }

    #[test]
    fn test_utm_round_trip() {
        for &(lon, lat, crs) in &[
            (-95.37, 29.76, Crs::utm_for(-95.37, 29.76)),
            (151.21, -33.87, Crs::utm_for(151.21, -33.87)),
            (10.0, 60.0, Crs::Utm { zone: 32, north: true }),
        ] {
            let projected = crs.from_wgs84(Coord { x: lon, y: lat }).expect("projectable");
            let back = crs.to_wgs84(projected).expect("invertible");
            assert_abs_diff_eq!(back.x, lon, epsilon = 1e-7);
            assert_abs_diff_eq!(back.y, lat, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_web_mercator_round_trip() {
        let c = Coord { x: -95.3698, y: 29.7604 };
        let p = Crs::WebMercator.from_wgs84(c).expect("projectable");
        let back = Crs::WebMercator.to_wgs84(p).expect("invertible");
        assert_abs_diff_eq!(back.x, c.x, epsilon = 1e-8);
        assert_abs_diff_eq!(back.y, c.y, epsilon = 1e-8);
    }

    #[test]
    fn test_transform_between_projected_systems() {
        let utm = Crs::Utm { zone: 15, north: true };
        let wgs = Coord { x: -95.0, y: 30.0 };
        let in_utm = utm.from_wgs84(wgs).expect("projectable");
        let in_merc = utm.transform(&Crs::WebMercator, in_utm).expect("transformable");
        let back = Crs::WebMercator.to_wgs84(in_merc).expect("invertible");
        assert_abs_diff_eq!(back.x, wgs.x, epsilon = 1e-7);
        assert_abs_diff_eq!(back.y, wgs.y, epsilon = 1e-7);
    }

    #[test]
    fn test_unknown_systems() {
        let c = Coord { x: 1.0, y: 2.0 };
        assert_eq!(Crs::Unknown.transform(&Crs::Unknown, c).expect("identity"), c);
        assert!(matches!(
            Crs::Unknown.transform(&Crs::Wgs84, c),
            Err(RasterError::UnsupportedCrs { .. })
        ));
        assert!(Crs::Epsg(9).transform(&Crs::Wgs84, c).is_err());
        assert!(!Crs::Epsg(9).is_projectable());
        assert!(!Crs::Unknown.is_projectable());
    }

    #[test]
    fn test_epsg_definition_lookup() {
        // NAD83 / UTM zone 15N shares the GRS80 ellipsoid with no datum shift,
        // so it lands within millimetres of WGS84 UTM zone 15N.
        let nad83 = Crs::from_epsg(26915);
        assert_eq!(nad83, Crs::Epsg(26915));
        assert!(nad83.is_projectable());
        assert!(!nad83.is_geographic());

        let houston = Coord { x: -95.37, y: 29.76 };
        let a = nad83.from_wgs84(houston).expect("projectable");
        let b = Crs::Utm { zone: 15, north: true }.from_wgs84(houston).expect("projectable");
        assert_abs_diff_eq!(a.x, b.x, epsilon = 0.01);
        assert_abs_diff_eq!(a.y, b.y, epsilon = 0.01);

        let back = nad83.to_wgs84(a).expect("invertible");
        assert_abs_diff_eq!(back.x, houston.x, epsilon = 1e-7);
        assert_abs_diff_eq!(back.y, houston.y, epsilon = 1e-7);

        let via_transform = Crs::Wgs84.transform(&nad83, houston).expect("transformable");
        assert_abs_diff_eq!(via_transform.x, a.x, epsilon = 1e-6);
    }

    #[test]
    fn test_geographic_epsg_and_units() {
        assert!(Crs::Epsg(4269).is_geographic());
        assert!(Crs::Wgs84.is_geographic());
        assert!(!Crs::WebMercator.is_geographic());

        assert_abs_diff_eq!(Crs::Epsg(26915).meters_per_unit(), 1.0);
        // NAD83 / Texas South Central is in US survey feet
        assert_abs_diff_eq!(Crs::Epsg(2278).meters_per_unit(), 0.304_800_6, epsilon = 1e-7);
        assert_abs_diff_eq!(Crs::Unknown.meters_per_unit(), 1.0);
    }

    #[test]
    fn test_projector_reuse() {
        let utm = Crs::Utm { zone: 10, north: true };
        let projector = Projector::new(Crs::Wgs84, utm).expect("buildable");
        assert!(!projector.is_identity());
        assert_eq!(projector.target(), utm);
        for lat in [44.0, 45.0, 46.0] {
            let p = projector.apply(Coord { x: -123.0, y: lat }).expect("projectable");
            assert_abs_diff_eq!(p.x, 500_000.0, epsilon = 1e-3);
        }
        assert!(Projector::new(utm, utm).expect("identity").is_identity());
        assert!(Projector::new(Crs::Unknown, utm).is_err());
    }

    #[test]
    fn test_invalid_latitude_rejected() {
        let utm = Crs::Utm { zone: 10, north: true };
        assert!(utm.from_wgs84(Coord { x: -122.0, y: 91.0 }).is_err());
        assert!(utm.from_wgs84(Coord { x: f64::NAN, y: 10.0 }).is_err());
    }
}
