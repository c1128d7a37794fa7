//! Error types for the raster crate.

use thiserror::Error;

/// Errors that can occur when reading, writing or reclassifying rasters.
#[derive(Debug, Error)]
pub enum RasterError {
    /// I/O error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding or encoding error.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Invalid GeoTIFF - missing or unusable georeferencing tags.
    #[error("Invalid GeoTIFF: {0}")]
    InvalidGeoTiff(String),

    /// The raster has more than one band.
    #[error("Expected a single-band raster, found {bands} bands")]
    MultiBand {
        /// Number of samples per pixel in the file.
        bands: u32,
    },

    /// Threshold list is empty, the wrong length, or not strictly increasing.
    #[error("Invalid depth thresholds: {0}")]
    InvalidThresholds(String),

    /// Pixel buffer length does not match the raster dimensions.
    #[error("Raster data has {actual} cells, expected {width}x{height}")]
    DimensionMismatch {
        /// Raster width in pixels.
        width: usize,
        /// Raster height in pixels.
        height: usize,
        /// Number of values supplied.
        actual: usize,
    },

    /// Coordinates cannot be transformed between the two reference systems.
    #[error("Cannot transform coordinates from {from} to {to}")]
    UnsupportedCrs {
        /// Source reference system.
        from: String,
        /// Target reference system.
        to: String,
    },

    /// A PROJ definition could not be turned into a projection.
    #[error("Unusable definition for {crs}: {reason}")]
    CrsDefinition {
        /// Reference system whose definition failed.
        crs: String,
        /// Reason for failure.
        reason: String,
    },

    /// A coordinate is outside the domain of a projection.
    #[error("Coordinate ({x}, {y}) cannot be projected: {reason}")]
    Projection {
        /// X coordinate (longitude or easting).
        x: f64,
        /// Y coordinate (latitude or northing).
        y: f64,
        /// Reason for failure.
        reason: String,
    },

    /// Invalid parameter for raster generation.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
