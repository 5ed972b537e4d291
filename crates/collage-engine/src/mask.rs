//! Single-channel coverage masks for the main image and scattered pieces.
//!
//! Masks are `GrayImage`s where 255 means fully covered and 0 means fully
//! transparent; they are written into a patch's alpha channel before it is
//! composited.

use std::f64::consts::TAU;

use image::{GrayImage, Luma};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_ellipse_mut, draw_polygon_mut};
use imageproc::filter::box_filter;
use imageproc::point::Point;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layout::PolygonConfig;

const COVERED: Luma<u8> = Luma([255]);

/// Maximum angular jitter applied to each polygon vertex, in radians.
const ANGLE_JITTER: f64 = 0.3;

/// Shape of the main-area mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Ellipse,
    Circle,
    Rectangle,
}

impl ShapeKind {
    /// Parse a shape tag. Unrecognised tags give full coverage.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "ellipse" => Self::Ellipse,
            "circle" => Self::Circle,
            "rectangle" | "rect" => Self::Rectangle,
            other => {
                debug!(shape = other, "Unknown mask shape, using full coverage");
                Self::Rectangle
            }
        }
    }
}

/// Every mask the generator can produce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaskShape {
    Ellipse,
    Circle,
    Rectangle,
    Polygon(PolygonConfig),
}

impl From<ShapeKind> for MaskShape {
    fn from(kind: ShapeKind) -> Self {
        match kind {
            ShapeKind::Ellipse => Self::Ellipse,
            ShapeKind::Circle => Self::Circle,
            ShapeKind::Rectangle => Self::Rectangle,
        }
    }
}

/// Produces coverage masks.
#[derive(Debug, Clone)]
pub struct MaskGenerator {
    /// Chance that a piece gets a polygon mask instead of a full rectangle.
    polygon_probability: f64,
    /// Soften polygon edges with a 3x3 box blur.
    smooth_edges: bool,
}

impl Default for MaskGenerator {
    fn default() -> Self {
        Self {
            polygon_probability: 0.8,
            smooth_edges: true,
        }
    }
}

impl MaskGenerator {
    pub fn new(polygon_probability: f64, smooth_edges: bool) -> Self {
        Self {
            polygon_probability: polygon_probability.clamp(0.0, 1.0),
            smooth_edges,
        }
    }

    /// Mask for the main area. Area shapes draw nothing from `rng`.
    pub fn create_area_mask<R: Rng + ?Sized>(
        &self,
        shape: ShapeKind,
        width: u32,
        height: u32,
        rng: &mut R,
    ) -> GrayImage {
        self.create_mask(&MaskShape::from(shape), width, height, rng)
    }

    /// Mask for a scattered piece: a noisy polygon most of the time, a plain
    /// rectangle otherwise.
    pub fn create_piece_mask<R: Rng + ?Sized>(
        &self,
        width: u32,
        height: u32,
        polygon: &PolygonConfig,
        rng: &mut R,
    ) -> GrayImage {
        if rng.gen_bool(self.polygon_probability) {
            self.create_mask(&MaskShape::Polygon(*polygon), width, height, rng)
        } else {
            self.create_mask(&MaskShape::Rectangle, width, height, rng)
        }
    }

    /// Single dispatch point over every mask shape.
    pub fn create_mask<R: Rng + ?Sized>(
        &self,
        shape: &MaskShape,
        width: u32,
        height: u32,
        rng: &mut R,
    ) -> GrayImage {
        match shape {
            MaskShape::Ellipse => ellipse_mask(width, height),
            MaskShape::Circle => circle_mask(width, height),
            MaskShape::Rectangle => full_mask(width, height),
            MaskShape::Polygon(config) => {
                let mask = polygon_mask(width, height, config, rng);
                if self.smooth_edges && width > 2 && height > 2 {
                    box_filter(&mask, 1, 1)
                } else {
                    mask
                }
            }
        }
    }
}

fn full_mask(width: u32, height: u32) -> GrayImage {
    GrayImage::from_pixel(width, height, COVERED)
}

fn ellipse_mask(width: u32, height: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return mask;
    }
    let center = ((width / 2) as i32, (height / 2) as i32);
    let rx = (f64::from(width) * 0.5) as i32;
    let ry = (f64::from(height) * 0.5) as i32;
    draw_filled_ellipse_mut(&mut mask, center, rx, ry, COVERED);
    mask
}

fn circle_mask(width: u32, height: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return mask;
    }
    let center = ((width / 2) as i32, (height / 2) as i32);
    let radius = (width.min(height) / 2) as i32;
    draw_filled_circle_mut(&mut mask, center, radius, COVERED);
    mask
}

fn polygon_mask<R: Rng + ?Sized>(
    width: u32,
    height: u32,
    config: &PolygonConfig,
    rng: &mut R,
) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return mask;
    }

    let (w, h) = (f64::from(width), f64::from(height));
    let (cx, cy) = (w / 2.0, h / 2.0);
    let noise_x = (w * config.noise_ratio) as i32;
    let noise_y = (h * config.noise_ratio) as i32;
    let r_lo = config.radius_min_ratio.min(config.radius_max_ratio);
    let r_hi = config.radius_min_ratio.max(config.radius_max_ratio);

    let lo = config.min_vertices.min(config.max_vertices);
    let hi = config.min_vertices.max(config.max_vertices);
    let n = rng.gen_range(lo..=hi).max(3);

    let mut points: Vec<Point<i32>> = Vec::with_capacity(n as usize);
    for i in 0..n {
        let angle = f64::from(i) / f64::from(n) * TAU + rng.gen_range(-ANGLE_JITTER..=ANGLE_JITTER);
        let radius_x = w * rng.gen_range(r_lo..=r_hi);
        let radius_y = h * rng.gen_range(r_lo..=r_hi);

        let x = (cx + angle.cos() * radius_x) as i32 + rng.gen_range(-noise_x..=noise_x);
        let y = (cy + angle.sin() * radius_y) as i32 + rng.gen_range(-noise_y..=noise_y);

        let point = Point::new(x.clamp(0, width as i32 - 1), y.clamp(0, height as i32 - 1));
        if points.last() != Some(&point) {
            points.push(point);
        }
    }
    // The polygon is closed implicitly; a repeated first vertex is rejected.
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    if points.len() < 3 {
        debug!(
            width,
            height,
            vertices = points.len(),
            "Polygon collapsed after clamping, using full coverage"
        );
        return full_mask(width, height);
    }

    draw_polygon_mut(&mut mask, &points, COVERED);
    mask
}
