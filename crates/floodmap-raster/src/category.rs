//! Flood severity categories and the depth thresholds that define them.

use crate::{RasterError, Result};
use std::fmt;

/// Cell value marking "no measurement" in a category raster.
///
/// Distinct from [`FloodCategory::NoFlood`], which is a measured dry cell.
pub const CATEGORY_NODATA: u8 = 255;

/// Default depth cutoffs in meters: nuisance, minor, moderate, major.
pub const DEFAULT_THRESHOLDS: [f64; 4] = [0.1, 0.2, 0.5, 1.0];

/// Flood severity of a raster cell or a vector feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum FloodCategory {
    /// Dry, or shallower than the first threshold.
    NoFlood = 0,
    /// Nuisance flooding (0.1-0.2 m with default thresholds).
    Nuisance = 1,
    /// Minor flooding (0.2-0.5 m).
    Minor = 2,
    /// Moderate flooding (0.5-1.0 m).
    Moderate = 3,
    /// Major flooding (deeper than 1.0 m).
    Major = 4,
}

impl FloodCategory {
    /// All categories, least severe first.
    pub const ALL: [FloodCategory; 5] = [
        FloodCategory::NoFlood,
        FloodCategory::Nuisance,
        FloodCategory::Minor,
        FloodCategory::Moderate,
        FloodCategory::Major,
    ];

    /// The most severe category.
    pub const MAX: FloodCategory = FloodCategory::Major;

    /// Category for a stored cell value, `None` for nodata or out-of-range values.
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(FloodCategory::NoFlood),
            1 => Some(FloodCategory::Nuisance),
            2 => Some(FloodCategory::Minor),
            3 => Some(FloodCategory::Moderate),
            4 => Some(FloodCategory::Major),
            _ => None,
        }
    }

    /// Stored cell value (0-4).
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            FloodCategory::NoFlood => "No Flood",
            FloodCategory::Nuisance => "Nuisance Flood (0.1-0.2m)",
            FloodCategory::Minor => "Minor Flood (0.2-0.5m)",
            FloodCategory::Moderate => "Moderate Flood (0.5-1.0m)",
            FloodCategory::Major => "Major Flood (>1.0m)",
        }
    }

    /// Display colour as a `#RRGGBB` string.
    pub fn color_hex(self) -> &'static str {
        match self {
            FloodCategory::NoFlood => "#D3D3D3",
            FloodCategory::Nuisance => "#FFC8C8",
            FloodCategory::Minor => "#FF8080",
            FloodCategory::Moderate => "#FF0000",
            FloodCategory::Major => "#800080",
        }
    }

    /// Display colour as opaque RGBA.
    pub fn color_rgba(self) -> [u8; 4] {
        match self {
            FloodCategory::NoFlood => [211, 211, 211, 255],
            FloodCategory::Nuisance => [255, 200, 200, 255],
            FloodCategory::Minor => [255, 128, 128, 255],
            FloodCategory::Moderate => [255, 0, 0, 255],
            FloodCategory::Major => [128, 0, 128, 255],
        }
    }

    /// Semi-transparent RGBA used when drawing the raster over a map.
    /// Dry cells are fully transparent.
    pub fn overlay_rgba(self) -> [u8; 4] {
        match self {
            FloodCategory::NoFlood => [255, 255, 255, 0],
            FloodCategory::Nuisance => [255, 200, 200, 128],
            FloodCategory::Minor => [255, 128, 128, 160],
            FloodCategory::Moderate => [255, 0, 0, 192],
            FloodCategory::Major => [128, 0, 128, 224],
        }
    }
}

impl fmt::Display for FloodCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Strictly increasing depth cutoffs partitioning depth into five categories.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds([f64; 4]);

impl Thresholds {
    /// Validate a threshold list.
    ///
    /// The list must hold exactly four finite, positive, strictly increasing
    /// values.
    pub fn new(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(RasterError::InvalidThresholds("no thresholds given".to_string()));
        }
        let cutoffs: [f64; 4] = values.try_into().map_err(|_| {
            RasterError::InvalidThresholds(format!(
                "expected 4 thresholds, got {}",
                values.len()
            ))
        })?;
        if let Some(bad) = cutoffs.iter().find(|v| !v.is_finite() || **v <= 0.0) {
            return Err(RasterError::InvalidThresholds(format!(
                "thresholds must be positive, got {}",
                bad
            )));
        }
        if cutoffs.windows(2).any(|w| w[0] >= w[1]) {
            return Err(RasterError::InvalidThresholds(format!(
                "thresholds must be strictly increasing, got {:?}",
                cutoffs
            )));
        }
        Ok(Self(cutoffs))
    }

    /// The four cutoffs in meters.
    pub fn values(&self) -> [f64; 4] {
        self.0
    }

    /// Category of a measured depth.
    ///
    /// A depth equal to a cutoff falls into the upper bin. Non-positive
    /// depths are dry.
    pub fn categorize(&self, depth: f64) -> FloodCategory {
        if depth.is_nan() || depth <= 0.0 {
            return FloodCategory::NoFlood;
        }
        let reached = self.0.iter().filter(|&&t| depth >= t).count();
        match reached {
            0 => FloodCategory::NoFlood,
            1 => FloodCategory::Nuisance,
            2 => FloodCategory::Minor,
            3 => FloodCategory::Moderate,
            _ => FloodCategory::Major,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLDS)
    }
}

/// Cell or feature counts per flood category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryHistogram {
    counts: [usize; 5],
}

impl CategoryHistogram {
    /// Count one occurrence of `category`.
    pub fn record(&mut self, category: FloodCategory) {
        self.counts[category.value() as usize] += 1;
    }

    /// Occurrences of `category`.
    pub fn count(&self, category: FloodCategory) -> usize {
        self.counts[category.value() as usize]
    }

    /// Total across all categories.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Occurrences with flooding (category 1 and above).
    pub fn flooded(&self) -> usize {
        self.total() - self.count(FloodCategory::NoFlood)
    }

    /// Add another histogram into this one.
    pub fn merge(&mut self, other: &CategoryHistogram) {
        for (a, b) in self.counts.iter_mut().zip(other.counts.iter()) {
            *a += b;
        }
    }

    /// `(category, count)` pairs, least severe first.
    pub fn iter(&self) -> impl Iterator<Item = (FloodCategory, usize)> + '_ {
        FloodCategory::ALL.iter().map(move |&c| (c, self.count(c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_categorize() {
        let t = Thresholds::default();
        assert_eq!(t.categorize(0.0), FloodCategory::NoFlood);
        assert_eq!(t.categorize(-1.0), FloodCategory::NoFlood);
        assert_eq!(t.categorize(0.05), FloodCategory::NoFlood);
        assert_eq!(t.categorize(0.1), FloodCategory::Nuisance);
        assert_eq!(t.categorize(0.15), FloodCategory::Nuisance);
        assert_eq!(t.categorize(0.75), FloodCategory::Moderate);
        assert_eq!(t.categorize(1.5), FloodCategory::Major);
        assert_eq!(t.categorize(5.0), FloodCategory::Major);
    }

    #[test]
    fn test_cutoff_boundaries() {
        let t = Thresholds::default();
        assert_eq!(t.categorize(0.099_999), FloodCategory::NoFlood);
        assert_eq!(t.categorize(0.1), FloodCategory::Nuisance);
        assert_eq!(t.categorize(0.2), FloodCategory::Minor);
        assert_eq!(t.categorize(0.5), FloodCategory::Moderate);
        assert_eq!(t.categorize(0.999_999), FloodCategory::Moderate);
        assert_eq!(t.categorize(1.0), FloodCategory::Major);
    }

    #[test]
    fn test_thresholds_rejected() {
        assert!(matches!(Thresholds::new(&[]), Err(RasterError::InvalidThresholds(_))));
        assert!(Thresholds::new(&[0.1, 0.2, 0.5]).is_err());
        assert!(Thresholds::new(&[0.1, 0.2, 0.5, 1.0, 2.0]).is_err());
        assert!(Thresholds::new(&[0.1, 0.1, 0.5, 1.0]).is_err());
        assert!(Thresholds::new(&[0.5, 0.2, 0.1, 1.0]).is_err());
        assert!(Thresholds::new(&[0.0, 0.2, 0.5, 1.0]).is_err());
        assert!(Thresholds::new(&[0.1, f64::NAN, 0.5, 1.0]).is_err());
        assert!(Thresholds::new(&[0.1, 0.2, 0.5, f64::INFINITY]).is_err());
    }

    #[test]
    fn test_thresholds_accepted() {
        let t = Thresholds::new(&[0.99, 1.99, 2.99, 3.99]).expect("valid thresholds");
        assert_eq!(t.values(), [0.99, 1.99, 2.99, 3.99]);
    }

    #[test]
    fn test_monotonic_categorization() {
        let t = Thresholds::default();
        let mut previous = FloodCategory::NoFlood;
        for step in 0..400 {
            let depth = step as f64 * 0.005;
            let category = t.categorize(depth);
            assert!(category >= previous, "category decreased at depth {}", depth);
            previous = category;
        }
    }

    #[test]
    fn test_category_values_round_trip() {
        for category in FloodCategory::ALL {
            assert_eq!(FloodCategory::from_value(category.value()), Some(category));
        }
        assert_eq!(FloodCategory::from_value(5), None);
        assert_eq!(FloodCategory::from_value(CATEGORY_NODATA), None);
    }

    #[test]
    fn test_histogram() {
        let mut h = CategoryHistogram::default();
        h.record(FloodCategory::NoFlood);
        h.record(FloodCategory::Major);
        h.record(FloodCategory::Major);

        let mut other = CategoryHistogram::default();
        other.record(FloodCategory::Minor);
        h.merge(&other);

        assert_eq!(h.total(), 4);
        assert_eq!(h.flooded(), 3);
        assert_eq!(h.count(FloodCategory::Major), 2);
        assert_eq!(h.iter().count(), 5);
    }
}
