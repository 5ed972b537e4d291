//! Rectangle and sizing arithmetic shared by the compositing steps.

use serde::{Deserialize, Serialize};

/// Integer rectangle in canvas coordinates.
///
/// The origin may be negative (patches hanging off the canvas edge); the
/// size never is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i64 {
        self.x + i64::from(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i64 {
        self.y + i64::from(self.height)
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Overlapping rectangle of `self` and `other`, or `None` when they
    /// share no pixel.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        Some(Rect::new(x1, y1, (x2 - x1) as u32, (y2 - y1) as u32))
    }

    /// Number of pixels shared with `other`.
    pub fn intersection_area(&self, other: &Rect) -> u64 {
        self.intersection(other).map_or(0, |r| r.area())
    }
}

/// Scale factor and resulting size that make `(src_w, src_h)` cover
/// `(target_w, target_h)`, multiplied by `overscan`.
///
/// The returned size is never smaller than the target on either axis, so a
/// crop of exactly the target size always fits.
pub fn scale_to_cover(
    src_w: u32,
    src_h: u32,
    target_w: u32,
    target_h: u32,
    overscan: f64,
) -> (f64, u32, u32) {
    let scale_w = f64::from(target_w) / f64::from(src_w.max(1));
    let scale_h = f64::from(target_h) / f64::from(src_h.max(1));
    let scale = scale_w.max(scale_h) * overscan;

    let new_w = ((f64::from(src_w) * scale).round() as u32).max(target_w).max(1);
    let new_h = ((f64::from(src_h) * scale).round() as u32).max(target_h).max(1);

    (scale, new_w, new_h)
}

/// Size of the tight bounding box around a `width x height` rectangle
/// rotated by `angle_degrees` about its center.
pub fn rotated_bounds(width: u32, height: u32, angle_degrees: f64) -> (u32, u32) {
    let theta = angle_degrees.to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let (w, h) = (f64::from(width), f64::from(height));

    let new_w = (h * sin + w * cos).round() as u32;
    let new_h = (h * cos + w * sin).round() as u32;

    (new_w.max(1), new_h.max(1))
}
