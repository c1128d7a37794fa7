//! # floodmap-runner
//!
//! The `floodmap` command line tool and the runs behind it:
//!
//! - `impact`: assign flood categories to infrastructure and roads around a
//!   category GeoTIFF and write GeoJSON, an interactive map, static maps
//!   and a run report.
//! - `reclassify`: turn a depth GeoTIFF into flood categories 0-4.
//! - `sample`: write a synthetic depth GeoTIFF for trying the tool.

pub mod emit;
pub mod error;
pub mod pipeline;
pub mod settings;

pub use error::RunError;
pub use pipeline::{
    run_impact, run_impact_with_source, run_reclassify, run_sample, ImpactRequest, RunOutcome,
};
pub use settings::{Settings, SettingsOverrides};
