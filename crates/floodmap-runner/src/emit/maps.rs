//! Static PNG maps and raster previews.
//!
//! Maps are drawn in the pixel grid of the flood raster: the raster is the
//! background and feature coordinates are projected into raster space, so
//! no basemap or font rendering is needed. Features are anti-aliased
//! `tiny_skia` paths; `image` encodes the PNG.

use floodmap_impact::{FeatureCollection, VectorFeature};
use floodmap_raster::{CategoryRaster, DepthRaster, FloodCategory, Projector};
use geo::{Coord, Geometry};
use image::{Rgba, RgbaImage};
use tiny_skia::{
    Color, FillRule, IntSize, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Rect, Shader, Stroke,
    Transform,
};
use tracing::warn;

/// Longest side of static maps and previews, in pixels.
pub const MAP_SIZE: u32 = 1024;

/// Longest side of the web map overlay, in pixels.
pub const MAX_OVERLAY_SIZE: u32 = 2048;

const BACKGROUND: [u8; 4] = [255, 255, 255, 255];
const NODATA_COLOR: Rgba<u8> = Rgba([240, 240, 240, 255]);
const NOT_EVALUATED_COLOR: [u8; 4] = [128, 128, 128, 255];
const OUTLINE_COLOR: [u8; 4] = [51, 51, 51, 255];
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Depth ramp end points, shallow to deep.
const SHALLOW_COLOR: [f64; 3] = [247.0, 251.0, 255.0];
const DEEP_COLOR: [f64; 3] = [8.0, 48.0, 107.0];

const POINT_RADIUS: f32 = 5.0;
const OUTLINE_WIDTH: f32 = 1.0;
const LINE_WIDTH: f32 = 3.0;
const LEGEND_MARGIN: f32 = 6.0;
const LEGEND_SWATCH: f32 = 14.0;
const LEGEND_GAP: f32 = 4.0;

// Coordinates this far outside the canvas are not drawn
const DRAW_LIMIT: f64 = 4.0 * MAP_SIZE as f64;

/// Colour of a feature on static maps, grey when it was not evaluated.
pub fn feature_color(feature: &VectorFeature) -> Rgba<u8> {
    Rgba(
        feature
            .flood_category()
            .map_or(NOT_EVALUATED_COLOR, FloodCategory::color_rgba),
    )
}

/// Impact map: flood categories in the background, `layers` drawn on top in
/// the order given.
pub fn render_impact_map(raster: &CategoryRaster, layers: &[&FeatureCollection]) -> RgbaImage {
    let background = impact_background(raster);
    let Some(mut canvas) = Canvas::new(raster, &background) else {
        return background;
    };
    for layer in layers {
        let projector = match Projector::new(layer.crs(), raster.crs()) {
            Ok(projector) => projector,
            Err(e) => {
                warn!(crs = %layer.crs(), error = %e, "layer left off the static map");
                continue;
            }
        };
        for feature in layer.iter() {
            if let Some(geometry) = &feature.geometry {
                canvas.draw_geometry(geometry, &projector, rgba_color(feature_color(feature).0));
            }
        }
    }
    canvas.draw_legend();
    canvas.into_image().unwrap_or(background)
}

/// Flood categories blended over white; nodata cells are light grey.
fn impact_background(raster: &CategoryRaster) -> RgbaImage {
    let (width, height) = fit(raster.width(), raster.height(), MAP_SIZE);
    resample(raster.data(), raster.width(), width, height, |v| {
        if raster.is_nodata(v) {
            return NODATA_COLOR;
        }
        FloodCategory::from_value(v).map_or(NODATA_COLOR, |c| blend(BACKGROUND, c.overlay_rgba()))
    })
}

/// Preview of a category raster in the category colours; nodata is transparent.
pub fn render_category_preview(raster: &CategoryRaster) -> RgbaImage {
    let (width, height) = fit(raster.width(), raster.height(), MAP_SIZE);
    resample(raster.data(), raster.width(), width, height, |v| {
        if raster.is_nodata(v) {
            return TRANSPARENT;
        }
        FloodCategory::from_value(v).map_or(TRANSPARENT, |c| Rgba(c.color_rgba()))
    })
}

/// Preview of a depth raster on a white-to-blue ramp scaled to the deepest cell.
pub fn render_depth_preview(raster: &DepthRaster) -> RgbaImage {
    let max_depth = raster
        .data()
        .iter()
        .copied()
        .filter(|&v| v.is_finite() && !raster.is_nodata(v))
        .fold(0.0f32, f32::max);
    let max_depth = if max_depth > 0.0 { max_depth as f64 } else { 1.0 };

    let (width, height) = fit(raster.width(), raster.height(), MAP_SIZE);
    resample(raster.data(), raster.width(), width, height, |v| {
        if !v.is_finite() || raster.is_nodata(v) {
            return TRANSPARENT;
        }
        let t = (v as f64 / max_depth).clamp(0.0, 1.0);
        let channel = |i: usize| (SHALLOW_COLOR[i] + t * (DEEP_COLOR[i] - SHALLOW_COLOR[i])).round() as u8;
        Rgba([channel(0), channel(1), channel(2), 255])
    })
}

/// Semi-transparent flood overlay for the web map. Dry and nodata cells are
/// fully transparent.
pub fn render_overlay(raster: &CategoryRaster) -> RgbaImage {
    let longest = raster.width().max(raster.height()) as u32;
    let (width, height) = fit(raster.width(), raster.height(), longest.clamp(1, MAX_OVERLAY_SIZE));
    resample(raster.data(), raster.width(), width, height, |v| {
        if raster.is_nodata(v) {
            return TRANSPARENT;
        }
        FloodCategory::from_value(v).map_or(TRANSPARENT, |c| Rgba(c.overlay_rgba()))
    })
}

/// Output size with the longest side equal to `longest`.
fn fit(width: usize, height: usize, longest: u32) -> (u32, u32) {
    let scale = longest as f64 / width.max(height).max(1) as f64;
    (
        ((width as f64 * scale).round() as u32).max(1),
        ((height as f64 * scale).round() as u32).max(1),
    )
}

/// Nearest-neighbour resampling of a row-major grid.
fn resample<T: Copy>(
    data: &[T],
    src_width: usize,
    width: u32,
    height: u32,
    color: impl Fn(T) -> Rgba<u8>,
) -> RgbaImage {
    let src_height = if src_width == 0 { 0 } else { data.len() / src_width };
    RgbaImage::from_fn(width, height, |x, y| {
        let col = ((x as f64 + 0.5) * src_width as f64 / width as f64) as usize;
        let row = ((y as f64 + 0.5) * src_height as f64 / height as f64) as usize;
        let col = col.min(src_width.saturating_sub(1));
        let row = row.min(src_height.saturating_sub(1));
        data.get(row * src_width + col).copied().map_or(TRANSPARENT, &color)
    })
}

fn blend(base: [u8; 4], over: [u8; 4]) -> Rgba<u8> {
    let alpha = over[3] as f64 / 255.0;
    let mix = |i: usize| (over[i] as f64 * alpha + base[i] as f64 * (1.0 - alpha)).round() as u8;
    Rgba([mix(0), mix(1), mix(2), 255])
}

/// Vector layer drawn with `tiny_skia` on top of the raster background.
struct Canvas<'a> {
    pixmap: Pixmap,
    raster: &'a CategoryRaster,
    scale: f64,
}

impl<'a> Canvas<'a> {
    fn new(raster: &'a CategoryRaster, background: &RgbaImage) -> Option<Self> {
        let size = IntSize::from_wh(background.width(), background.height())?;
        // The background is opaque, so straight and premultiplied RGBA agree
        let pixmap = Pixmap::from_vec(background.as_raw().clone(), size)?;
        let scale = background.width() as f64 / raster.width().max(1) as f64;
        Some(Self { pixmap, raster, scale })
    }

    fn into_image(self) -> Option<RgbaImage> {
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        RgbaImage::from_raw(width, height, self.pixmap.take())
    }

    /// Canvas position of a coordinate, `None` when it cannot be projected
    /// or lies too far off the canvas to draw.
    fn project(&self, projector: &Projector, c: Coord) -> Option<(f32, f32)> {
        let c = projector.apply(c).ok()?;
        let (col, row) = self.raster.transform().world_to_pixel(c);
        let (x, y) = (col * self.scale, row * self.scale);
        let drawable = |v: f64| v.is_finite() && (-DRAW_LIMIT..=DRAW_LIMIT).contains(&v);
        (drawable(x) && drawable(y)).then_some((x as f32, y as f32))
    }

    fn draw_geometry(&mut self, geometry: &Geometry<f64>, projector: &Projector, color: Color) {
        match geometry {
            Geometry::Point(p) => self.draw_point(projector, p.0, color),
            Geometry::MultiPoint(mp) => {
                for p in mp {
                    self.draw_point(projector, p.0, color);
                }
            }
            Geometry::Line(line) => self.draw_path(projector, &[line.start, line.end], color),
            Geometry::LineString(ls) => self.draw_path(projector, &ls.0, color),
            Geometry::MultiLineString(mls) => {
                for ls in mls {
                    self.draw_path(projector, &ls.0, color);
                }
            }
            Geometry::Polygon(polygon) => self.draw_path(projector, &polygon.exterior().0, color),
            Geometry::MultiPolygon(mp) => {
                for polygon in mp {
                    self.draw_path(projector, &polygon.exterior().0, color);
                }
            }
            Geometry::GeometryCollection(gc) => {
                for g in gc {
                    self.draw_geometry(g, projector, color);
                }
            }
            Geometry::Rect(_) | Geometry::Triangle(_) => {}
        }
    }

    /// Filled circle with a thin outline.
    fn draw_point(&mut self, projector: &Projector, c: Coord, color: Color) {
        let Some((x, y)) = self.project(projector, c) else {
            return;
        };
        if let Some(circle) = PathBuilder::from_circle(x, y, POINT_RADIUS) {
            self.pixmap
                .fill_path(&circle, &paint(color), FillRule::Winding, Transform::default(), None);
            let outline = Stroke {
                width: OUTLINE_WIDTH,
                ..Default::default()
            };
            self.pixmap
                .stroke_path(&circle, &paint(outline_color()), &outline, Transform::default(), None);
        }
    }

    /// Polyline; coordinates that cannot be drawn break it into pieces.
    fn draw_path(&mut self, projector: &Projector, coords: &[Coord], color: Color) {
        let mut builder = PathBuilder::new();
        let mut pen_down = false;
        for &c in coords {
            match self.project(projector, c) {
                Some((x, y)) if pen_down => builder.line_to(x, y),
                Some((x, y)) => {
                    builder.move_to(x, y);
                    pen_down = true;
                }
                None => pen_down = false,
            }
        }
        let Some(path) = builder.finish() else {
            return;
        };
        let stroke = Stroke {
            width: LINE_WIDTH,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Default::default()
        };
        self.pixmap
            .stroke_path(&path, &paint(color), &stroke, Transform::default(), None);
    }

    /// Colour swatches in the upper-left corner, least severe first, then
    /// the not-evaluated grey.
    fn draw_legend(&mut self) {
        let colors = FloodCategory::ALL
            .iter()
            .map(|c| rgba_color(c.color_rgba()))
            .chain(std::iter::once(rgba_color(NOT_EVALUATED_COLOR)));
        let outline = Stroke {
            width: OUTLINE_WIDTH,
            ..Default::default()
        };
        for (i, color) in colors.enumerate() {
            let top = LEGEND_MARGIN + i as f32 * (LEGEND_SWATCH + LEGEND_GAP);
            let Some(swatch) = Rect::from_xywh(LEGEND_MARGIN, top, LEGEND_SWATCH, LEGEND_SWATCH) else {
                continue;
            };
            self.pixmap
                .fill_rect(swatch, &paint(color), Transform::default(), None);
            let border = PathBuilder::from_rect(swatch);
            self.pixmap
                .stroke_path(&border, &paint(outline_color()), &outline, Transform::default(), None);
        }
    }
}

fn rgba_color(rgba: [u8; 4]) -> Color {
    Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3])
}

fn outline_color() -> Color {
    rgba_color(OUTLINE_COLOR)
}

fn paint(color: Color) -> Paint<'static> {
    Paint {
        shader: Shader::SolidColor(color),
        anti_alias: true,
        ..Default::default()
    }
}
