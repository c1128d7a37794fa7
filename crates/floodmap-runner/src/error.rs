//! Error type for runner operations.

use floodmap_impact::{ConfigError, GeoJsonError};
use floodmap_osm::SourceError;
use floodmap_raster::RasterError;
use thiserror::Error;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Raster error: {0}")]
    RasterError(#[from] RasterError),

    #[error("GeoJSON error: {0}")]
    GeoJsonError(#[from] GeoJsonError),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Vector data error: {0}")]
    SourceError(#[from] SourceError),

    #[error("Settings file error: {0}")]
    SettingsError(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Page rendering error: {0}")]
    RenderError(#[from] std::fmt::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
