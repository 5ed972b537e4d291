//! Canvas layout: the reserved main area and the piece size range.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CollageConfig;
use crate::geometry::Rect;
use crate::mask::ShapeKind;
use crate::{CollageError, Result};

/// Bounds for procedural polygon piece masks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolygonConfig {
    pub min_vertices: u32,
    pub max_vertices: u32,
    /// Per-axis radius as a fraction of the mask width/height.
    pub radius_min_ratio: f64,
    pub radius_max_ratio: f64,
    /// Vertex jitter as a fraction of the mask width (x) and height (y).
    pub noise_ratio: f64,
}

impl Default for PolygonConfig {
    fn default() -> Self {
        Self {
            min_vertices: 3,
            max_vertices: 8,
            radius_min_ratio: 0.3,
            radius_max_ratio: 0.5,
            noise_ratio: 0.1,
        }
    }
}

/// The reserved area the primary image is composited into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainArea {
    pub rect: Rect,
    pub shape: ShapeKind,
}

impl MainArea {
    /// Center point of the area, rounded down.
    pub fn center(&self) -> (i64, i64) {
        (
            self.rect.x + i64::from(self.rect.width / 2),
            self.rect.y + i64::from(self.rect.height / 2),
        )
    }
}

/// Derives every layout quantity from the working canvas size and a fixed
/// set of ratios.
#[derive(Debug, Clone)]
pub struct LayoutManager {
    canvas_width: u32,
    canvas_height: u32,
    piece_min_ratio: f64,
    piece_max_ratio: f64,
    polygon: PolygonConfig,
    main_area: MainArea,
}

impl LayoutManager {
    /// Build the layout for a `width x height` working canvas.
    pub fn new(width: i64, height: i64, config: &CollageConfig) -> Result<Self> {
        if width <= 0 || height <= 0 || width > i64::from(u32::MAX) || height > i64::from(u32::MAX)
        {
            return Err(CollageError::InvalidDimension { width, height });
        }
        let (w, h) = (width as u32, height as u32);

        let main_w = ((f64::from(w) * config.main_width_ratio) as u32).clamp(1, w);
        let main_h = ((f64::from(h) * config.main_height_ratio) as u32).clamp(1, h);
        let rect = Rect::new(
            i64::from((w - main_w) / 2),
            i64::from((h - main_h) / 2),
            main_w,
            main_h,
        );
        let main_area = MainArea {
            rect,
            shape: config.main_shape,
        };

        debug!(
            canvas_w = w,
            canvas_h = h,
            main_x = rect.x,
            main_y = rect.y,
            main_w,
            main_h,
            shape = ?main_area.shape,
            "Computed collage layout"
        );

        Ok(Self {
            canvas_width: w,
            canvas_height: h,
            piece_min_ratio: config.piece_min_ratio,
            piece_max_ratio: config.piece_max_ratio,
            polygon: config.polygon,
            main_area,
        })
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }

    pub fn main_area(&self) -> MainArea {
        self.main_area
    }

    /// `((min_w, max_w), (min_h, max_h))` for scattered pieces.
    ///
    /// Bounds are relative to the dimensions passed in (the output size),
    /// not the working canvas, so the margin never changes piece sizes.
    /// Every bound is at least 1 and `min <= max` always holds.
    pub fn piece_size_range(&self, canvas_w: u32, canvas_h: u32) -> ((u32, u32), (u32, u32)) {
        let bound = |dim: u32, ratio: f64| ((f64::from(dim) * ratio) as u32).max(1);

        let min_w = bound(canvas_w, self.piece_min_ratio);
        let max_w = bound(canvas_w, self.piece_max_ratio).max(min_w);
        let min_h = bound(canvas_h, self.piece_min_ratio);
        let max_h = bound(canvas_h, self.piece_max_ratio).max(min_h);

        ((min_w, max_w), (min_h, max_h))
    }

    pub fn polygon_config(&self) -> PolygonConfig {
        self.polygon
    }
}
