//! # floodmap-osm
//!
//! Infrastructure and road data for flood impact mapping.
//!
//! This crate provides the [`VectorSource`] abstraction and two
//! implementations:
//!
//! - [`OverpassClient`]: queries an OpenStreetMap Overpass API server,
//!   caching responses on disk
//! - [`GeoJsonFileSource`]: reads local GeoJSON files for offline runs
//!
//! [`gather_vectors`] fetches every requested layer from a source, turning
//! empty or failing layers into warnings.
//!
//! ## Example
//!
//! ```no_run
//! use floodmap_impact::InfrastructureCatalog;
//! use floodmap_osm::{gather_vectors, BoundingBox, OverpassClient};
//!
//! let client = OverpassClient::new()?.with_cache_dir("./osm_cache")?;
//! let bbox = BoundingBox::new(-95.45, 29.70, -95.30, 29.80)?;
//! let kinds = InfrastructureCatalog::builtin().resolve(&["hospital", "school"])?;
//!
//! let vectors = gather_vectors(&client, &bbox, &kinds, true)?;
//! for warning in &vectors.warnings {
//!     eprintln!("warning: {}", warning);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod file;
mod gather;
mod overpass;
mod source;

pub use error::SourceError;
pub use file::GeoJsonFileSource;
pub use gather::{gather_vectors, GatheredVectors, VectorWarning};
pub use overpass::{
    infrastructure_query, parse_infrastructure, parse_roads, roads_query,
    OverpassClient, DEFAULT_OVERPASS_URL, UNNAMED_ROAD,
};
pub use source::{BoundingBox, VectorSource};

/// Result type for vector source operations.
pub type Result<T> = std::result::Result<T, SourceError>;
