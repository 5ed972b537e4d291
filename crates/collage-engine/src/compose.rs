//! Compositing and placement: source-over blending onto the canvas and the
//! random placement search that keeps pieces off the main area.

use image::{Rgba, RgbaImage};
use rand::Rng;
use tracing::debug;

use crate::geometry::Rect;

/// Default number of candidate positions tried before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 50;

/// Default share of a patch that may overlap the main area.
pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.3;

/// Result of a placement search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i64,
    pub y: i64,
    /// Candidate positions drawn, including the fallback draw.
    pub draws: u32,
    /// No candidate met the overlap limit; the position ignores it.
    pub fallback: bool,
}

/// Composite `patch` onto `canvas` with its top-left corner at `(x, y)`
/// using the source-over operator.
///
/// Parts of the patch outside the canvas are clipped; a patch that misses
/// the canvas entirely is a no-op.
pub fn alpha_blend(canvas: &mut RgbaImage, patch: &RgbaImage, x: i64, y: i64) {
    let canvas_rect = Rect::new(0, 0, canvas.width(), canvas.height());
    let patch_rect = Rect::new(x, y, patch.width(), patch.height());

    let Some(region) = canvas_rect.intersection(&patch_rect) else {
        debug!(x, y, "Patch lies outside the canvas, skipping");
        return;
    };

    for cy in region.y..region.bottom() {
        for cx in region.x..region.right() {
            let src = patch.get_pixel((cx - x) as u32, (cy - y) as u32);
            if src[3] == 0 {
                continue;
            }
            let dst = canvas.get_pixel_mut(cx as u32, cy as u32);
            *dst = blend_pixel(dst, src);
        }
    }
}

/// Source-over for one pixel; colors are straight (not premultiplied).
fn blend_pixel(bg: &Rgba<u8>, fg: &Rgba<u8>) -> Rgba<u8> {
    if fg[3] == 255 {
        return *fg;
    }

    let alpha = f32::from(fg[3]) / 255.0;
    let inv = 1.0 - alpha;
    let channel = |i: usize| (f32::from(fg[i]) * alpha + f32::from(bg[i]) * inv).round() as u8;
    let bg_alpha = f32::from(bg[3]) / 255.0;
    let out_alpha = ((alpha + bg_alpha * inv) * 255.0).round() as u8;

    Rgba([channel(0), channel(1), channel(2), out_alpha])
}

/// Uniform top-left offset keeping the patch inside the canvas where it
/// fits. Axes where the patch is larger than the canvas get offset 0.
pub fn random_position<R: Rng + ?Sized>(
    canvas_size: (u32, u32),
    patch_size: (u32, u32),
    rng: &mut R,
) -> (i64, i64) {
    let (cw, ch) = canvas_size;
    let (pw, ph) = patch_size;
    let x = rng.gen_range(0..=cw.saturating_sub(pw));
    let y = rng.gen_range(0..=ch.saturating_sub(ph));
    (i64::from(x), i64::from(y))
}

/// Rejection-sample a position whose overlap with `main_area` stays below
/// `overlap_threshold` of the patch area.
///
/// After `max_attempts` rejected candidates one more position is drawn and
/// returned regardless of overlap, so the search always terminates.
pub fn random_position_avoid_main<R: Rng + ?Sized>(
    canvas_size: (u32, u32),
    patch_size: (u32, u32),
    main_area: &Rect,
    rng: &mut R,
    max_attempts: u32,
    overlap_threshold: f64,
) -> Placement {
    let (pw, ph) = patch_size;
    let patch_area = u64::from(pw) * u64::from(ph);
    let limit = overlap_threshold * patch_area as f64;

    for attempt in 1..=max_attempts {
        let (x, y) = random_position(canvas_size, patch_size, rng);
        let overlap = Rect::new(x, y, pw, ph).intersection_area(main_area);
        if (overlap as f64) < limit {
            return Placement {
                x,
                y,
                draws: attempt,
                fallback: false,
            };
        }
    }

    let (x, y) = random_position(canvas_size, patch_size, rng);
    debug!(pw, ph, max_attempts, "No low-overlap position found, placing anyway");
    Placement {
        x,
        y,
        draws: max_attempts + 1,
        fallback: true,
    }
}
