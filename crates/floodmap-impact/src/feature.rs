//! Vector features and feature collections.

use floodmap_raster::{Crs, FloodCategory};
use geo::{BoundingRect, Geometry, Rect};
use serde_json::{Map, Value};

/// Property that receives the assigned flood category.
pub const FLOOD_CATEGORY_PROPERTY: &str = "flood_category";

/// `flood_category` value for features that could not be evaluated.
///
/// Kept apart from 0 so "no flooding found" and "nothing to look at" never
/// read the same.
pub const NOT_EVALUATED: i64 = -1;

/// Feature attributes as a JSON object.
pub type Properties = Map<String, Value>;

/// A geometry with attributes.
///
/// `geometry` is `None` when the source feature had a null or unreadable
/// geometry. Such features are carried through unchanged apart from their
/// flood category.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorFeature {
    /// Geometry in the collection's CRS.
    pub geometry: Option<Geometry<f64>>,
    /// Attribute map.
    pub properties: Properties,
}

impl VectorFeature {
    /// Create a feature.
    pub fn new(geometry: impl Into<Geometry<f64>>, properties: Properties) -> Self {
        Self {
            geometry: Some(geometry.into()),
            properties,
        }
    }

    /// Create a feature without geometry.
    pub fn without_geometry(properties: Properties) -> Self {
        Self {
            geometry: None,
            properties,
        }
    }

    /// String property, if present and a string.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// Raw `flood_category` value, if assigned.
    pub fn flood_category_value(&self) -> Option<i64> {
        self.properties
            .get(FLOOD_CATEGORY_PROPERTY)
            .and_then(Value::as_i64)
    }

    /// Assigned flood category; `None` when unassigned or not evaluated.
    pub fn flood_category(&self) -> Option<FloodCategory> {
        let value = self.flood_category_value()?;
        u8::try_from(value).ok().and_then(FloodCategory::from_value)
    }

    /// Store a flood category, or [`NOT_EVALUATED`] for `None`.
    pub fn set_flood_category(&mut self, category: Option<FloodCategory>) {
        let value = category.map_or(NOT_EVALUATED, |c| i64::from(c.value()));
        self.properties
            .insert(FLOOD_CATEGORY_PROPERTY.to_string(), Value::from(value));
    }
}

/// Ordered features sharing one reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    crs: Crs,
    features: Vec<VectorFeature>,
}

impl FeatureCollection {
    /// Empty collection.
    pub fn new(crs: Crs) -> Self {
        Self {
            crs,
            features: Vec::new(),
        }
    }

    /// Collection from existing features.
    pub fn with_features(crs: Crs, features: Vec<VectorFeature>) -> Self {
        Self { crs, features }
    }

    /// Reference system of every geometry.
    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Features in order.
    pub fn features(&self) -> &[VectorFeature] {
        &self.features
    }

    /// Consume the collection, returning its features.
    pub fn into_features(self) -> Vec<VectorFeature> {
        self.features
    }

    /// Append a feature.
    pub fn push(&mut self, feature: VectorFeature) {
        self.features.push(feature);
    }

    /// Append all features of `other`.
    ///
    /// Both collections must share a CRS; callers reproject beforehand.
    pub fn extend(&mut self, other: FeatureCollection) {
        debug_assert_eq!(self.crs, other.crs);
        self.features.extend(other.features);
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the collection has no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Iterate features.
    pub fn iter(&self) -> std::slice::Iter<'_, VectorFeature> {
        self.features.iter()
    }

    /// Bounding box of all geometries, `None` when there are none.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.as_ref()?.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    geo::coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                    geo::coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
                )
            })
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a VectorFeature;
    type IntoIter = std::slice::Iter<'a, VectorFeature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point};

    #[test]
    fn test_flood_category_property() {
        let mut feature = VectorFeature::new(point! { x: 1.0, y: 2.0 }, Properties::new());
        assert_eq!(feature.flood_category(), None);

        feature.set_flood_category(Some(FloodCategory::Moderate));
        assert_eq!(feature.flood_category_value(), Some(3));
        assert_eq!(feature.flood_category(), Some(FloodCategory::Moderate));

        feature.set_flood_category(None);
        assert_eq!(feature.flood_category_value(), Some(NOT_EVALUATED));
        assert_eq!(feature.flood_category(), None);
    }

    #[test]
    fn test_collection_bounds() {
        let mut collection = FeatureCollection::new(Crs::Wgs84);
        assert!(collection.bounds().is_none());

        collection.push(VectorFeature::new(point! { x: -95.4, y: 29.7 }, Properties::new()));
        collection.push(VectorFeature::without_geometry(Properties::new()));
        collection.push(VectorFeature::new(
            line_string![(x: -95.5, y: 29.75), (x: -95.45, y: 29.8)],
            Properties::new(),
        ));

        let bounds = collection.bounds().expect("bounds");
        assert_eq!(bounds.min().x, -95.5);
        assert_eq!(bounds.max().x, -95.4);
        assert_eq!(bounds.min().y, 29.7);
        assert_eq!(bounds.max().y, 29.8);
        assert_eq!(collection.len(), 3);
    }
}
