//! Error types for vector data sources.

use floodmap_impact::GeoJsonError;
use std::io;
use thiserror::Error;

/// Errors that can occur while retrieving vector data.
#[derive(Debug, Error)]
pub enum SourceError {
    /// IO error (cache or local files).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response was not the expected JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local GeoJSON file could not be read.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] GeoJsonError),

    /// Overpass answered with an error status.
    #[error("Overpass returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Start of the response body.
        message: String,
    },

    /// Overpass reported a runtime error inside a successful response.
    #[error("Overpass query failed: {0}")]
    Overpass(String),

    /// Area of interest is degenerate or cannot be expressed in WGS84.
    #[error("invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    /// Neither infrastructure nor roads could be retrieved.
    #[error("no vector data retrieved for the flood map area")]
    NoVectorData,
}
