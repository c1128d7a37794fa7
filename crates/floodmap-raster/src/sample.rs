//! Synthetic flood depth maps for trying the pipeline without real data.

use crate::crs::Crs;
use crate::raster::{DepthRaster, Raster};
use crate::transform::GeoTransform;
use crate::{RasterError, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// Depth at the centre of a sample map, in meters.
pub const SAMPLE_PEAK_DEPTH: f64 = 2.0;

/// Standard deviation of the noise added to sample depths.
pub const SAMPLE_NOISE_STD_DEV: f64 = 0.1;

/// No-data value written into sample maps.
pub const SAMPLE_NODATA: f32 = -9999.0;

/// Seed used when none is given.
pub const DEFAULT_SAMPLE_SEED: u64 = 42;

/// Generate a radial flood depth map.
///
/// Depth peaks at [`SAMPLE_PEAK_DEPTH`] in the centre and falls linearly to
/// zero at the corners, with Gaussian noise clipped at zero. Pixels are
/// 1 m squares with the upper-left corner at `(0, height)` in UTM zone 10N.
/// The same seed always yields the same raster.
pub fn sample_depth_raster(width: usize, height: usize, seed: u64) -> Result<DepthRaster> {
    if width == 0 || height == 0 {
        return Err(RasterError::InvalidParameter(format!(
            "sample raster must be at least 1x1, got {}x{}",
            width, height
        )));
    }

    let noise = Normal::new(0.0, SAMPLE_NOISE_STD_DEV)
        .map_err(|e| RasterError::InvalidParameter(e.to_string()))?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let half_w = width as f64 / 2.0;
    let half_h = height as f64 / 2.0;
    let max_distance = (half_w * half_w + half_h * half_h).sqrt();

    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        let y = row as f64 - half_h;
        for col in 0..width {
            let x = col as f64 - half_w;
            let distance = (x * x + y * y).sqrt();
            let depth = SAMPLE_PEAK_DEPTH * (1.0 - distance / max_distance) + noise.sample(&mut rng);
            data.push(depth.max(0.0) as f32);
        }
    }

    Raster::new(
        width,
        height,
        data,
        GeoTransform::from_origin(0.0, height as f64, 1.0, 1.0),
        Crs::Utm { zone: 10, north: true },
        Some(SAMPLE_NODATA),
    )
}
