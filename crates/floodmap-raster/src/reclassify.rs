//! Continuous depth to categorical flood raster.

use crate::category::{Thresholds, CATEGORY_NODATA};
use crate::raster::{CategoryRaster, DepthRaster};
use tracing::debug;

/// Reclassify a depth raster into flood categories 0-4.
///
/// Cells equal to the source no-data value (and NaN cells) become
/// [`CATEGORY_NODATA`] rather than category 0, so "not measured" stays
/// distinguishable from "dry". The output shares the source grid and CRS.
pub fn reclassify(depth: &DepthRaster, thresholds: &Thresholds) -> CategoryRaster {
    let categories: Vec<u8> = depth
        .data()
        .iter()
        .map(|&v| {
            if v.is_nan() || depth.is_nodata(v) {
                CATEGORY_NODATA
            } else {
                thresholds.categorize(v as f64).value()
            }
        })
        .collect();

    let out = depth.with_data(categories, Some(CATEGORY_NODATA));
    debug!(
        width = out.width(),
        height = out.height(),
        thresholds = ?thresholds.values(),
        "reclassified depth raster"
    );
    out
}
