//! Error types for impact analysis.

use std::io;
use thiserror::Error;

/// Why a single feature could not be sampled.
///
/// These never abort a run; the assigner records them per feature.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleError {
    /// Geometry is missing, empty, malformed or of an unsupported type.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Geometry could not be brought into the raster's reference system.
    #[error("CRS mismatch: {0}")]
    CrsMismatch(String),
}

/// Errors reading or writing GeoJSON.
#[derive(Debug, Error)]
pub enum GeoJsonError {
    /// Underlying file error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Valid JSON that is not a GeoJSON feature collection.
    #[error("invalid GeoJSON: {0}")]
    Format(String),
}

/// Errors in impact configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Search distance is negative or not finite.
    #[error("search distance must be a finite, non-negative number of meters, got {0}")]
    InvalidSearchDistance(f64),

    /// Infrastructure name with no catalog entry.
    #[error("unknown infrastructure type '{0}'")]
    UnknownInfrastructure(String),

    /// Catalog entry with missing fields.
    #[error("invalid infrastructure entry '{name}': {reason}")]
    InvalidCatalogEntry {
        /// Entry name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
}
