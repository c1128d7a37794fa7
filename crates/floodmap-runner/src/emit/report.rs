//! Machine-readable run report (`run_report.json`).

use crate::settings::Settings;
use crate::RunError;
use chrono::{DateTime, Utc};
use floodmap_impact::{ImpactSummary, SkippedFeature};
use floodmap_osm::{BoundingBox, VectorWarning};
use floodmap_raster::{CategoryHistogram, CategoryRaster};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Everything worth knowing about a finished `impact` run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub flood_map: PathBuf,
    pub raster: RasterReport,
    pub bounding_box: [f64; 4],
    pub source: String,
    pub settings: Settings,
    pub layers: Vec<LayerReport>,
    pub warnings: Vec<String>,
    pub outputs: Vec<PathBuf>,
}

/// Shape and content of the input flood map.
#[derive(Debug, Clone, Serialize)]
pub struct RasterReport {
    pub width: usize,
    pub height: usize,
    pub crs: String,
    /// `[min_x, min_y, max_x, max_y]` in raster units.
    pub extent: [f64; 4],
    /// Cells per category value.
    pub categories: BTreeMap<u8, usize>,
    pub nodata_cells: usize,
}

impl RasterReport {
    pub fn new(raster: &CategoryRaster) -> Self {
        let extent = raster.extent();
        Self {
            width: raster.width(),
            height: raster.height(),
            crs: raster.crs().to_string(),
            extent: [extent.min_x, extent.min_y, extent.max_x, extent.max_y],
            categories: category_counts(&raster.histogram()),
            nodata_cells: raster.nodata_count(),
        }
    }
}

/// Result for one feature layer.
#[derive(Debug, Clone, Serialize)]
pub struct LayerReport {
    pub name: String,
    pub total: usize,
    pub evaluated: usize,
    pub not_evaluated: usize,
    pub skipped: usize,
    pub crs_mismatch: usize,
    /// Evaluated features per category value.
    pub categories: BTreeMap<u8, usize>,
    pub skipped_features: Vec<SkippedReport>,
}

impl LayerReport {
    pub fn new(name: &str, summary: &ImpactSummary, skipped: &[SkippedFeature]) -> Self {
        Self {
            name: name.to_string(),
            total: summary.total,
            evaluated: summary.evaluated,
            not_evaluated: summary.not_evaluated,
            skipped: summary.skipped,
            crs_mismatch: summary.crs_mismatch,
            categories: category_counts(&summary.histogram),
            skipped_features: skipped
                .iter()
                .map(|s| SkippedReport {
                    index: s.index,
                    reason: s.reason.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedReport {
    pub index: usize,
    pub reason: String,
}

impl RunReport {
    pub fn bounding_box(bbox: &BoundingBox) -> [f64; 4] {
        [bbox.west, bbox.south, bbox.east, bbox.north]
    }

    pub fn warning_messages(warnings: &[VectorWarning]) -> Vec<String> {
        warnings.iter().map(ToString::to_string).collect()
    }

    /// Write the report as pretty-printed JSON.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), RunError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

fn category_counts(histogram: &CategoryHistogram) -> BTreeMap<u8, usize> {
    histogram.iter().map(|(c, n)| (c.value(), n)).collect()
}
