//! # floodmap-raster
//!
//! Flood-depth rasters: GeoTIFF I/O, georeferencing, flood categories and
//! the reclassification of continuous depth into five severity levels.
//!
//! ## Overview
//!
//! A flood model produces a single-band GeoTIFF of water depth in meters.
//! Impact analysis works on a categorical version of that grid:
//!
//! | Category | Depth (default thresholds) |
//! |----------|----------------------------|
//! | 0 No Flood | below 0.1 m |
//! | 1 Nuisance | 0.1 - 0.2 m |
//! | 2 Minor | 0.2 - 0.5 m |
//! | 3 Moderate | 0.5 - 1.0 m |
//! | 4 Major | 1.0 m and deeper |
//!
//! Cells without a measurement keep a separate no-data marker
//! ([`CATEGORY_NODATA`]) so they are never mistaken for dry land.
//!
//! ## Example
//!
//! ```no_run
//! use floodmap_raster::{read_depth_raster, reclassify, write_category_raster, Thresholds};
//!
//! let depth = read_depth_raster("depth.tif")?;
//! let categories = reclassify(&depth, &Thresholds::default());
//! write_category_raster("categories.tif", &categories)?;
//!
//! for (category, cells) in categories.histogram().iter() {
//!     println!("{}: {} cells", category, cells);
//! }
//! # Ok::<(), floodmap_raster::RasterError>(())
//! ```

mod category;
mod crs;
mod error;
mod geotiff;
mod raster;
mod reclassify;
mod sample;
mod transform;

pub use category::{CategoryHistogram, FloodCategory, Thresholds, CATEGORY_NODATA, DEFAULT_THRESHOLDS};
pub use crs::{Crs, Projector};
pub use error::RasterError;
pub use geotiff::{decode_band, read_category_raster, read_depth_raster, write_category_raster, write_depth_raster};
pub use raster::{CategoryRaster, DepthRaster, Raster};
pub use reclassify::reclassify;
pub use sample::{sample_depth_raster, DEFAULT_SAMPLE_SEED, SAMPLE_NODATA};
pub use transform::{Extent, GeoTransform, PixelWindow};

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;
