//! Scale-to-cover resizing and cropping.
//!
//! Uses Lanczos3 filtering for every resample.

use image::RgbaImage;
use image::imageops::{self, FilterType};
use rand::Rng;
use tracing::debug;

use crate::geometry::scale_to_cover;

/// Scale `img` so it covers `target_w x target_h` (times `overscan`), then
/// crop exactly that size at a random offset.
///
/// `overscan > 1.0` leaves room for the random offset; with `1.0` the crop
/// only moves along the axis that overflows. Only the source window under
/// the crop is resampled, so memory stays proportional to the target.
pub fn scale_to_cover_and_random_crop<R: Rng + ?Sized>(
    img: &RgbaImage,
    target_w: u32,
    target_h: u32,
    overscan: f64,
    rng: &mut R,
) -> RgbaImage {
    let Some((scaled_w, scaled_h)) = cover(img, target_w, target_h, overscan) else {
        return RgbaImage::new(target_w, target_h);
    };

    let x = rng.gen_range(0..=scaled_w.saturating_sub(target_w));
    let y = rng.gen_range(0..=scaled_h.saturating_sub(target_h));

    crop_scaled(img, (scaled_w, scaled_h), x, y, target_w, target_h)
}

/// Scale `img` to cover `target_w x target_h` and crop the centered region.
pub fn resize_crop_center(img: &RgbaImage, target_w: u32, target_h: u32) -> RgbaImage {
    let Some((scaled_w, scaled_h)) = cover(img, target_w, target_h, 1.0) else {
        return RgbaImage::new(target_w, target_h);
    };

    let x = scaled_w.saturating_sub(target_w) / 2;
    let y = scaled_h.saturating_sub(target_h) / 2;

    crop_scaled(img, (scaled_w, scaled_h), x, y, target_w, target_h)
}

/// Cut a `width x height` region at a random position.
///
/// A requested size larger than the source shrinks to the source extent on
/// that axis instead of failing.
pub fn random_crop<R: Rng + ?Sized>(
    img: &RgbaImage,
    width: u32,
    height: u32,
    rng: &mut R,
) -> RgbaImage {
    let (src_w, src_h) = img.dimensions();
    let w = width.min(src_w).max(1);
    let h = height.min(src_h).max(1);

    if w != width || h != height {
        debug!(
            requested_w = width,
            requested_h = height,
            w,
            h,
            "Piece larger than source, shrinking"
        );
    }

    let x = rng.gen_range(0..=src_w.saturating_sub(w));
    let y = rng.gen_range(0..=src_h.saturating_sub(h));

    imageops::crop_imm(img, x, y, w, h).to_image()
}

/// Size of `img` scaled to cover the target, or `None` when either side is
/// empty. Nothing is allocated here.
fn cover(img: &RgbaImage, target_w: u32, target_h: u32, overscan: f64) -> Option<(u32, u32)> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 || target_w == 0 || target_h == 0 {
        debug!(w, h, target_w, target_h, "Nothing to resize");
        return None;
    }

    let (scale, new_w, new_h) = scale_to_cover(w, h, target_w, target_h, overscan);
    debug!(
        orig_w = w,
        orig_h = h,
        new_w,
        new_h,
        scale,
        "Scaling image to cover target"
    );
    Some((new_w, new_h))
}

/// Crop `target_w x target_h` at `(x, y)` of `img` as if it had been
/// resized to `scaled`. The matching source window is cut first and only
/// that window is resampled.
fn crop_scaled(
    img: &RgbaImage,
    scaled: (u32, u32),
    x: u32,
    y: u32,
    target_w: u32,
    target_h: u32,
) -> RgbaImage {
    let (w, h) = img.dimensions();
    let (x0, x1) = source_span(x, target_w, w, scaled.0);
    let (y0, y1) = source_span(y, target_h, h, scaled.1);

    let window = imageops::crop_imm(img, x0, y0, x1 - x0, y1 - y0).to_image();
    if window.dimensions() == (target_w, target_h) {
        return window;
    }
    imageops::resize(&window, target_w, target_h, FilterType::Lanczos3)
}

/// Source pixels `[start, end)` covering `[offset, offset + len)` of an axis
/// scaled from `src` to `scaled`. Never empty.
fn source_span(offset: u32, len: u32, src: u32, scaled: u32) -> (u32, u32) {
    let ratio = f64::from(src) / f64::from(scaled);
    let start = ((f64::from(offset) * ratio).floor() as u32).min(src - 1);
    let end = ((f64::from(offset) + f64::from(len)) * ratio).ceil() as u32;
    (start, end.clamp(start + 1, src))
}
