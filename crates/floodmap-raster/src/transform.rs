//! Affine georeferencing for north-up rasters.

use geo::Coord;

/// Axis-aligned extent in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    /// Minimum x (west edge).
    pub min_x: f64,
    /// Minimum y (south edge).
    pub min_y: f64,
    /// Maximum x (east edge).
    pub max_x: f64,
    /// Maximum y (north edge).
    pub max_y: f64,
}

impl Extent {
    /// Create an extent from two opposite corners in any order.
    pub fn from_corners(a: Coord, b: Coord) -> Self {
        Self {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
        }
    }

    /// Check if a coordinate is within the extent (edges inclusive).
    pub fn contains(&self, c: Coord) -> bool {
        c.x >= self.min_x && c.x <= self.max_x && c.y >= self.min_y && c.y <= self.max_y
    }

    /// Check if two extents overlap (touching edges count).
    pub fn intersects(&self, other: &Extent) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Overlapping part of two extents, if any.
    pub fn intersection(&self, other: &Extent) -> Option<Extent> {
        if !self.intersects(other) {
            return None;
        }
        Some(Extent {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        })
    }

    /// Grow the extent by `dx` horizontally and `dy` vertically on each side.
    pub fn expand(&self, dx: f64, dy: f64) -> Extent {
        Extent {
            min_x: self.min_x - dx,
            min_y: self.min_y - dy,
            max_x: self.max_x + dx,
            max_y: self.max_y + dy,
        }
    }

    /// The four corners, counter-clockwise from south-west.
    pub fn corners(&self) -> [Coord; 4] {
        [
            Coord { x: self.min_x, y: self.min_y },
            Coord { x: self.max_x, y: self.min_y },
            Coord { x: self.max_x, y: self.max_y },
            Coord { x: self.min_x, y: self.max_y },
        ]
    }

    /// Centre of the extent.
    pub fn center(&self) -> Coord {
        Coord {
            x: (self.min_x + self.max_x) / 2.0,
            y: (self.min_y + self.max_y) / 2.0,
        }
    }
}

/// Inclusive range of pixel columns and rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    /// First column.
    pub col_min: usize,
    /// Last column (inclusive).
    pub col_max: usize,
    /// First row.
    pub row_min: usize,
    /// Last row (inclusive).
    pub row_max: usize,
}

impl PixelWindow {
    /// Iterate `(col, row)` pairs in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.row_min..=self.row_max)
            .flat_map(move |row| (self.col_min..=self.col_max).map(move |col| (col, row)))
    }

    /// Number of cells in the window.
    pub fn len(&self) -> usize {
        (self.col_max - self.col_min + 1) * (self.row_max - self.row_min + 1)
    }

    /// A window always holds at least one cell.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Affine transform from pixel space to world coordinates (no rotation).
///
/// `pixel_height` is negative for the usual north-up layout where row 0 is
/// the northern edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// World x of the upper-left corner of pixel (0, 0).
    pub origin_x: f64,
    /// World y of the upper-left corner of pixel (0, 0).
    pub origin_y: f64,
    /// Pixel size along x.
    pub pixel_width: f64,
    /// Pixel size along y (negative for north-up).
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform from the upper-left corner and pixel sizes.
    pub fn from_origin(west: f64, north: f64, x_size: f64, y_size: f64) -> Self {
        Self {
            origin_x: west,
            origin_y: north,
            pixel_width: x_size,
            pixel_height: -y_size,
        }
    }

    /// World coordinate of a pixel centre.
    pub fn pixel_center(&self, col: usize, row: usize) -> Coord {
        Coord {
            x: self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            y: self.origin_y + (row as f64 + 0.5) * self.pixel_height,
        }
    }

    /// Fractional pixel position `(col, row)` of a world coordinate.
    pub fn world_to_pixel(&self, c: Coord) -> (f64, f64) {
        (
            (c.x - self.origin_x) / self.pixel_width,
            (c.y - self.origin_y) / self.pixel_height,
        )
    }

    /// World extent of a single pixel.
    pub fn cell_extent(&self, col: usize, row: usize) -> Extent {
        let a = Coord {
            x: self.origin_x + col as f64 * self.pixel_width,
            y: self.origin_y + row as f64 * self.pixel_height,
        };
        let b = Coord {
            x: a.x + self.pixel_width,
            y: a.y + self.pixel_height,
        };
        Extent::from_corners(a, b)
    }

    /// World extent of a `width` x `height` raster.
    pub fn extent(&self, width: usize, height: usize) -> Extent {
        let far = Coord {
            x: self.origin_x + width as f64 * self.pixel_width,
            y: self.origin_y + height as f64 * self.pixel_height,
        };
        Extent::from_corners(
            Coord {
                x: self.origin_x,
                y: self.origin_y,
            },
            far,
        )
    }

    /// Pixels of a `width` x `height` raster touched by `extent`.
    ///
    /// Returns `None` when the extent lies completely outside the raster.
    pub fn window(&self, extent: &Extent, width: usize, height: usize) -> Option<PixelWindow> {
        if width == 0 || height == 0 {
            return None;
        }
        let clipped = self.extent(width, height).intersection(extent)?;

        let (c0, r0) = self.world_to_pixel(Coord {
            x: clipped.min_x,
            y: clipped.max_y,
        });
        let (c1, r1) = self.world_to_pixel(Coord {
            x: clipped.max_x,
            y: clipped.min_y,
        });

        let to_index = |v: f64, len: usize| (v.floor().max(0.0) as usize).min(len - 1);
        let (col_a, col_b) = (to_index(c0, width), to_index(c1, width));
        let (row_a, row_b) = (to_index(r0, height), to_index(r1, height));

        Some(PixelWindow {
            col_min: col_a.min(col_b),
            col_max: col_a.max(col_b),
            row_min: row_a.min(row_b),
            row_max: row_a.max(row_b),
        })
    }
}
