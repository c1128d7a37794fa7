//! # floodmap-impact
//!
//! Flood impact assessment for vector features.
//!
//! Given a categorical flood raster (see [`floodmap_raster::reclassify`]) and
//! a collection of points or lines, every feature receives the most severe
//! flood category found within a search distance around it.
//!
//! ## Features
//!
//! - **Zonal sampling**: [`sample_max_category`] buffers a geometry in meters
//!   and returns the worst category under it
//! - **Impact assignment**: [`assign_impact`] maps the sampler over a
//!   collection, keeping order and reporting skipped features
//! - **GeoJSON**: read and write feature collections
//! - **Configuration**: search distance and the infrastructure catalog
//!
//! ## Example
//!
//! ```no_run
//! use floodmap_impact::{assign_impact, read_feature_collection, ImpactConfig};
//! use floodmap_raster::read_category_raster;
//!
//! let raster = read_category_raster("flood_categories.tif")?;
//! let roads = read_feature_collection("roads.geojson")?;
//!
//! let outcome = assign_impact(roads, &raster, &ImpactConfig::default());
//! println!(
//!     "{} of {} roads evaluated, {} skipped",
//!     outcome.summary.evaluated,
//!     outcome.summary.total,
//!     outcome.skipped.len()
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod assign;
mod config;
mod error;
mod feature;
mod geojson;
mod sampler;

pub use assign::{assign_impact, ImpactOutcome, ImpactSummary, SkippedFeature};
pub use config::{ImpactConfig, InfrastructureCatalog, InfrastructureKind, DEFAULT_INFRASTRUCTURE};
pub use error::{ConfigError, GeoJsonError, SampleError};
pub use feature::{
    FeatureCollection, Properties, VectorFeature, FLOOD_CATEGORY_PROPERTY, NOT_EVALUATED,
};
pub use geojson::{
    feature_collection_from_value, feature_collection_to_value, geometry_from_value,
    geometry_to_value, parse_feature_collection, read_feature_collection,
    write_feature_collection,
};
pub use sampler::{sample_max_category, SearchDistance};
