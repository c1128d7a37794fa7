//! Impact assignment over feature collections.

use crate::config::ImpactConfig;
use crate::error::SampleError;
use crate::feature::{FeatureCollection, VectorFeature};
use crate::sampler::{sample_max_category, SearchDistance};
use floodmap_raster::{CategoryHistogram, CategoryRaster, Crs, FloodCategory};
use rayon::prelude::*;
use tracing::{debug, info};

/// A feature that could not be evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFeature {
    /// Position of the feature in its collection.
    pub index: usize,
    /// What went wrong.
    pub reason: SampleError,
}

/// Counts for one or more assigned collections.
///
/// `total == evaluated + not_evaluated + skipped + crs_mismatch`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImpactSummary {
    /// Features seen.
    pub total: usize,
    /// Features that received a category 0-4.
    pub evaluated: usize,
    /// Features outside the mapped area or over nodata only.
    pub not_evaluated: usize,
    /// Features with invalid geometry.
    pub skipped: usize,
    /// Features whose CRS could not be reconciled with the raster.
    pub crs_mismatch: usize,
    /// Evaluated features per category.
    pub histogram: CategoryHistogram,
}

impl ImpactSummary {
    /// Add the counts of another summary.
    pub fn merge(&mut self, other: &ImpactSummary) {
        self.total += other.total;
        self.evaluated += other.evaluated;
        self.not_evaluated += other.not_evaluated;
        self.skipped += other.skipped;
        self.crs_mismatch += other.crs_mismatch;
        self.histogram.merge(&other.histogram);
    }

    /// Features that were skipped for any reason.
    pub fn failed(&self) -> usize {
        self.skipped + self.crs_mismatch
    }

    fn record(&mut self, result: &Result<Option<FloodCategory>, SampleError>) {
        self.total += 1;
        match result {
            Ok(Some(category)) => {
                self.evaluated += 1;
                self.histogram.record(*category);
            }
            Ok(None) => self.not_evaluated += 1,
            Err(SampleError::InvalidGeometry(_)) => self.skipped += 1,
            Err(SampleError::CrsMismatch(_)) => self.crs_mismatch += 1,
        }
    }
}

/// Result of assigning flood categories to a collection.
#[derive(Debug, Clone)]
pub struct ImpactOutcome {
    /// Input features, in order, each with a `flood_category` property.
    pub collection: FeatureCollection,
    /// Counts for the collection.
    pub summary: ImpactSummary,
    /// Features that could not be evaluated, in order.
    pub skipped: Vec<SkippedFeature>,
}

/// Assign a `flood_category` to every feature of `collection`.
///
/// Every feature stays in the output, in its original position. Features the
/// sampler cannot handle get [`NOT_EVALUATED`](crate::NOT_EVALUATED) and are
/// listed in [`ImpactOutcome::skipped`]; they never abort the run.
///
/// With `config.parallel` the features are sampled on the rayon pool; the
/// result is identical to the sequential run.
pub fn assign_impact(
    collection: FeatureCollection,
    raster: &CategoryRaster,
    config: &ImpactConfig,
) -> ImpactOutcome {
    let crs = collection.crs();
    let distance = config.search_distance;

    let results: Vec<Result<Option<FloodCategory>, SampleError>> = if config.parallel {
        collection
            .features()
            .par_iter()
            .map(|feature| evaluate(feature, crs, raster, distance))
            .collect()
    } else {
        collection
            .features()
            .iter()
            .map(|feature| evaluate(feature, crs, raster, distance))
            .collect()
    };

    let mut summary = ImpactSummary::default();
    let mut skipped = Vec::new();
    let mut features = collection.into_features();

    for (index, (feature, result)) in features.iter_mut().zip(results).enumerate() {
        summary.record(&result);
        match result {
            Ok(category) => {
                debug!(index, category = ?category, "assigned flood category");
                feature.set_flood_category(category);
            }
            Err(reason) => {
                debug!(index, %reason, "skipped feature");
                feature.set_flood_category(None);
                skipped.push(SkippedFeature { index, reason });
            }
        }
    }

    info!(
        total = summary.total,
        evaluated = summary.evaluated,
        not_evaluated = summary.not_evaluated,
        skipped = summary.failed(),
        "assigned flood categories"
    );

    ImpactOutcome {
        collection: FeatureCollection::with_features(crs, features),
        summary,
        skipped,
    }
}

fn evaluate(
    feature: &VectorFeature,
    crs: Crs,
    raster: &CategoryRaster,
    distance: SearchDistance,
) -> Result<Option<FloodCategory>, SampleError> {
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| SampleError::InvalidGeometry("feature has no geometry".to_string()))?;
    sample_max_category(geometry, crs, raster, distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Properties, NOT_EVALUATED};
    use floodmap_raster::{GeoTransform, Raster, CATEGORY_NODATA};
    use geo::{point, Coord, LineString, Point};

    fn raster() -> CategoryRaster {
        #[rustfmt::skip]
        let values = vec![
            0, 1, 2, 3,
            0, 1, 2, 4,
            CATEGORY_NODATA, CATEGORY_NODATA, 0, 0,
        ];
        Raster::new(
            4,
            3,
            values,
            GeoTransform::from_origin(0.0, 30.0, 10.0, 10.0),
            Crs::Utm { zone: 33, north: true },
            Some(CATEGORY_NODATA),
        )
        .expect("valid raster")
    }

    fn at(raster: &CategoryRaster, col: usize, row: usize) -> VectorFeature {
        VectorFeature::new(Point(raster.transform().pixel_center(col, row)), Properties::new())
    }

    fn config(meters: f64) -> ImpactConfig {
        ImpactConfig {
            search_distance: SearchDistance::new(meters).expect("valid distance"),
            ..ImpactConfig::default()
        }
    }

    fn collection(raster: &CategoryRaster) -> FeatureCollection {
        let road = VectorFeature::new(
            LineString::from(vec![
                raster.transform().pixel_center(0, 0),
                raster.transform().pixel_center(2, 0),
            ]),
            Properties::new(),
        );
        let broken = VectorFeature::new(
            LineString::from(vec![Coord { x: 5.0, y: 5.0 }]),
            Properties::new(),
        );
        FeatureCollection::with_features(
            raster.crs(),
            vec![
                at(raster, 3, 1),
                road,
                VectorFeature::new(point! { x: -500.0, y: -500.0 }, Properties::new()),
                broken,
                at(raster, 0, 2),
                VectorFeature::without_geometry(Properties::new()),
            ],
        )
    }

    #[test]
    fn test_assign_mixed_collection() {
        let raster = raster();
        let outcome = assign_impact(collection(&raster), &raster, &config(1.0));

        let values: Vec<Option<i64>> = outcome
            .collection
            .iter()
            .map(VectorFeature::flood_category_value)
            .collect();
        assert_eq!(
            values,
            vec![
                Some(4),
                Some(2),
                Some(NOT_EVALUATED),
                Some(NOT_EVALUATED),
                Some(NOT_EVALUATED),
                Some(NOT_EVALUATED),
            ]
        );

        let summary = &outcome.summary;
        assert_eq!(summary.total, 6);
        assert_eq!(summary.evaluated, 2);
        assert_eq!(summary.not_evaluated, 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.crs_mismatch, 0);
        assert_eq!(summary.histogram.count(FloodCategory::Major), 1);

        let skipped: Vec<usize> = outcome.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![3, 5]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let raster = raster();
        let sequential = assign_impact(collection(&raster), &raster, &config(12.0));
        let parallel = assign_impact(
            collection(&raster),
            &raster,
            &ImpactConfig {
                parallel: true,
                ..config(12.0)
            },
        );
        assert_eq!(parallel.collection, sequential.collection);
        assert_eq!(parallel.summary, sequential.summary);
        assert_eq!(parallel.skipped, sequential.skipped);
    }

    #[test]
    fn test_empty_collection() {
        let raster = raster();
        let outcome = assign_impact(FeatureCollection::new(raster.crs()), &raster, &config(10.0));
        assert!(outcome.collection.is_empty());
        assert_eq!(outcome.summary, ImpactSummary::default());
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_crs_mismatch_recorded() {
        let raster = raster();
        let mut features = FeatureCollection::new(Crs::Unknown);
        features.push(VectorFeature::new(point! { x: 1.0, y: 1.0 }, Properties::new()));

        let outcome = assign_impact(features, &raster, &config(10.0));
        assert_eq!(outcome.summary.crs_mismatch, 1);
        assert_eq!(outcome.summary.failed(), 1);
        assert!(matches!(
            outcome.skipped[0].reason,
            SampleError::CrsMismatch(_)
        ));
        assert_eq!(
            outcome.collection.features()[0].flood_category_value(),
            Some(NOT_EVALUATED)
        );
    }

    #[test]
    fn test_summary_merge() {
        let raster = raster();
        let a = assign_impact(collection(&raster), &raster, &config(1.0)).summary;
        let mut merged = a.clone();
        merged.merge(&a);
        assert_eq!(merged.total, 12);
        assert_eq!(merged.histogram.total(), 4);
    }
}
