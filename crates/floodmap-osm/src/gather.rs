//! Collecting every requested layer from a source.

use crate::source::{BoundingBox, VectorSource};
use crate::{Result, SourceError};
use floodmap_impact::{FeatureCollection, InfrastructureKind};
use floodmap_raster::Crs;
use std::fmt;
use tracing::{info, warn};

/// A layer that could not be retrieved; the run continues without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorWarning {
    /// Layer name: an infrastructure kind or `roads`.
    pub layer: String,
    /// What happened.
    pub message: String,
}

impl fmt::Display for VectorWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.layer, self.message)
    }
}

/// Everything retrieved for one run.
#[derive(Debug, Clone)]
pub struct GatheredVectors {
    /// All infrastructure kinds in one collection.
    pub infrastructure: FeatureCollection,
    /// Road network; `None` when roads were not requested.
    pub roads: Option<FeatureCollection>,
    /// Layers that came back empty or failed.
    pub warnings: Vec<VectorWarning>,
}

impl GatheredVectors {
    /// Total number of features retrieved.
    pub fn feature_count(&self) -> usize {
        self.infrastructure.len() + self.roads.as_ref().map_or(0, FeatureCollection::len)
    }
}

/// Fetch each infrastructure kind and, optionally, the roads.
///
/// A kind with no features or a failing request becomes a warning and the
/// remaining layers are still fetched.
///
/// # Errors
///
/// [`SourceError::NoVectorData`] when no feature at all was retrieved.
pub fn gather_vectors(
    source: &dyn VectorSource,
    bbox: &BoundingBox,
    kinds: &[InfrastructureKind],
    include_roads: bool,
) -> Result<GatheredVectors> {
    let mut warnings = Vec::new();
    let mut infrastructure: Option<FeatureCollection> = None;

    for kind in kinds {
        match source.infrastructure(bbox, kind) {
            Ok(collection) if collection.is_empty() => {
                push_warning(&mut warnings, &kind.name, "no features found in the flood map area".to_string());
            }
            Ok(collection) => match infrastructure.as_ref().map(FeatureCollection::crs) {
                None => infrastructure = Some(collection),
                Some(crs) if crs != collection.crs() => push_warning(
                    &mut warnings,
                    &kind.name,
                    format!(
                        "features are in {} but earlier layers are in {}; layer dropped",
                        collection.crs(),
                        crs
                    ),
                ),
                Some(_) => {
                    if let Some(all) = infrastructure.as_mut() {
                        all.extend(collection);
                    }
                }
            },
            Err(e) => push_warning(&mut warnings, &kind.name, e.to_string()),
        }
    }

    let roads = if include_roads {
        match source.roads(bbox) {
            Ok(collection) => {
                if collection.is_empty() {
                    push_warning(&mut warnings, "roads", "no roads found in the flood map area".to_string());
                }
                Some(collection)
            }
            Err(e) => {
                push_warning(&mut warnings, "roads", e.to_string());
                Some(FeatureCollection::new(Crs::Wgs84))
            }
        }
    } else {
        None
    };

    let gathered = GatheredVectors {
        infrastructure: infrastructure.unwrap_or_else(|| FeatureCollection::new(Crs::Wgs84)),
        roads,
        warnings,
    };

    if gathered.feature_count() == 0 {
        return Err(SourceError::NoVectorData);
    }

    info!(
        source = source.name(),
        infrastructure = gathered.infrastructure.len(),
        roads = gathered.roads.as_ref().map_or(0, FeatureCollection::len),
        warnings = gathered.warnings.len(),
        "gathered vector data"
    );
    Ok(gathered)
}

fn push_warning(warnings: &mut Vec<VectorWarning>, layer: &str, message: String) {
    warn!(layer, %message, "vector layer unavailable");
    warnings.push(VectorWarning {
        layer: layer.to_string(),
        message,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodmap_impact::{InfrastructureCatalog, Properties, VectorFeature};
    use geo::{line_string, point};

    /// Source with one hospital, failing police queries and optional roads.
    struct StubSource {
        roads: bool,
    }

    impl VectorSource for StubSource {
        fn name(&self) -> &str {
            "stub"
        }

        fn infrastructure(&self, _bbox: &BoundingBox, kind: &InfrastructureKind) -> Result<FeatureCollection> {
            let mut collection = FeatureCollection::new(Crs::Wgs84);
            match kind.name.as_str() {
                "hospital" => collection.push(VectorFeature::new(
                    point! { x: -95.4, y: 29.71 },
                    Properties::new(),
                )),
                "police" => return Err(SourceError::Overpass("runtime error: timeout".to_string())),
                _ => {}
            }
            Ok(collection)
        }

        fn roads(&self, _bbox: &BoundingBox) -> Result<FeatureCollection> {
            let mut collection = FeatureCollection::new(Crs::Wgs84);
            if self.roads {
                collection.push(VectorFeature::new(
                    line_string![(x: -95.4, y: 29.74), (x: -95.39, y: 29.74)],
                    Properties::new(),
                ));
            }
            Ok(collection)
        }
    }

    fn bbox() -> BoundingBox {
        BoundingBox::new(-95.5, 29.7, -95.3, 29.8).expect("valid box")
    }

    fn kinds(names: &[&str]) -> Vec<InfrastructureKind> {
        InfrastructureCatalog::builtin().resolve(names).expect("known kinds")
    }

    #[test]
    fn test_failures_become_warnings() {
        let source = StubSource { roads: true };
        let gathered = gather_vectors(&source, &bbox(), &kinds(&["hospital", "police", "school"]), true)
            .expect("some data");

        assert_eq!(gathered.infrastructure.len(), 1);
        assert_eq!(gathered.roads.as_ref().map(FeatureCollection::len), Some(1));
        let layers: Vec<&str> = gathered.warnings.iter().map(|w| w.layer.as_str()).collect();
        assert_eq!(layers, vec!["police", "school"]);
        assert!(gathered.warnings[0].to_string().starts_with("police: Overpass query failed"));
    }

    #[test]
    fn test_roads_not_requested() {
        let source = StubSource { roads: true };
        let gathered = gather_vectors(&source, &bbox(), &kinds(&["hospital"]), false).expect("some data");
        assert!(gathered.roads.is_none());
        assert_eq!(gathered.feature_count(), 1);
    }

    #[test]
    fn test_nothing_retrieved_is_fatal() {
        let source = StubSource { roads: false };
        let result = gather_vectors(&source, &bbox(), &kinds(&["police", "school"]), true);
        assert!(matches!(result, Err(SourceError::NoVectorData)));
    }
}
