//! In-memory single-band rasters.

use crate::category::{CategoryHistogram, FloodCategory, CATEGORY_NODATA};
use crate::crs::Crs;
use crate::transform::{Extent, GeoTransform};
use crate::{RasterError, Result};

/// A georeferenced single-band grid.
///
/// Cells are stored in row-major order, row 0 first (north for north-up
/// transforms).
#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
    transform: GeoTransform,
    crs: Crs,
    nodata: Option<T>,
}

/// Continuous flood depth in meters.
pub type DepthRaster = Raster<f32>;

/// Flood categories 0-4, or [`CATEGORY_NODATA`].
pub type CategoryRaster = Raster<u8>;

impl<T: Copy + PartialEq> Raster<T> {
    /// Create a raster, checking that `data` holds `width * height` cells.
    pub fn new(
        width: usize,
        height: usize,
        data: Vec<T>,
        transform: GeoTransform,
        crs: Crs,
        nodata: Option<T>,
    ) -> Result<Self> {
        if data.len() != width * height {
            return Err(RasterError::DimensionMismatch {
                width,
                height,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
            transform,
            crs,
            nodata,
        })
    }

    /// Build a raster with the same grid as `self` and new cell values.
    pub(crate) fn with_data<U>(&self, data: Vec<U>, nodata: Option<U>) -> Raster<U> {
        debug_assert_eq!(data.len(), self.data.len());
        Raster {
            width: self.width,
            height: self.height,
            data,
            transform: self.transform,
            crs: self.crs,
            nodata,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Cell values in row-major order.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Georeferencing transform.
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Coordinate reference system.
    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// No-data value, if any.
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// World extent covered by the raster.
    pub fn extent(&self) -> Extent {
        self.transform.extent(self.width, self.height)
    }

    /// Raw value at a pixel, `None` when out of range.
    pub fn get(&self, col: usize, row: usize) -> Option<T> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }

    /// Whether `value` is the raster's no-data marker.
    pub fn is_nodata(&self, value: T) -> bool {
        self.nodata == Some(value)
    }
}

impl Raster<u8> {
    /// Flood category at a pixel; `None` for nodata or out-of-range pixels.
    pub fn category(&self, col: usize, row: usize) -> Option<FloodCategory> {
        let value = self.get(col, row)?;
        if self.is_nodata(value) {
            return None;
        }
        FloodCategory::from_value(value)
    }

    /// Number of cells per category, nodata excluded.
    pub fn histogram(&self) -> CategoryHistogram {
        let mut histogram = CategoryHistogram::default();
        for &value in &self.data {
            if value == CATEGORY_NODATA || self.is_nodata(value) {
                continue;
            }
            if let Some(category) = FloodCategory::from_value(value) {
                histogram.record(category);
            }
        }
        histogram
    }

    /// Number of nodata cells.
    pub fn nodata_count(&self) -> usize {
        self.data
            .iter()
            .filter(|&&v| self.is_nodata(v) || FloodCategory::from_value(v).is_none())
            .count()
    }
}
