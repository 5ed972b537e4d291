//! Arbitrary-angle rotation with bounding-box expansion.
//!
//! The output grows to the tight bounding box of the rotated image and the
//! exposed corners are fully transparent.

use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use rand::Rng;
use tracing::debug;

use crate::geometry::rotated_bounds;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Rotate `img` about its center by `angle_degrees` (counter-clockwise on
/// screen), expanding the canvas to fit.
///
/// Whole turns return an unmodified copy.
pub fn rotate_arbitrary(img: &RgbaImage, angle_degrees: f64) -> RgbaImage {
    let angle = angle_degrees.rem_euclid(360.0);
    let (w, h) = img.dimensions();

    if angle == 0.0 || w == 0 || h == 0 {
        return img.clone();
    }

    let (new_w, new_h) = rotated_bounds(w, h, angle);
    debug!(w, h, new_w, new_h, angle, "Rotating image");

    let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
    let (new_cx, new_cy) = (new_w as f32 / 2.0, new_h as f32 / 2.0);
    // image rows grow downwards, so a negative theta turns counter-clockwise
    let theta = -(angle.to_radians() as f32);
    let projection = Projection::translate(new_cx, new_cy)
        * Projection::rotate(theta)
        * Projection::translate(-cx, -cy);

    let mut out = RgbaImage::from_pixel(new_w, new_h, TRANSPARENT);
    warp_into(img, &projection, Interpolation::Bilinear, TRANSPARENT, &mut out);
    out
}

/// Rotate by an angle drawn uniformly from `[0, 360)` degrees.
pub fn rotate_random<R: Rng + ?Sized>(img: &RgbaImage, rng: &mut R) -> RgbaImage {
    let angle = rng.gen_range(0.0..360.0);
    rotate_arbitrary(img, angle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Create a test image with unique pixel values at corners.
    fn create_corner_image(width: u32, height: u32) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(width, height, Rgba([128, 128, 128, 255]));
        img.put_pixel(0, 0, Rgba([10, 0, 0, 255]));
        img.put_pixel(width - 1, 0, Rgba([20, 0, 0, 255]));
        img.put_pixel(0, height - 1, Rgba([30, 0, 0, 255]));
        img.put_pixel(width - 1, height - 1, Rgba([40, 0, 0, 255]));
        img
    }

    #[test]
    fn zero_rotation_is_identity() {
        let img = create_corner_image(7, 5);
        let rotated = rotate_arbitrary(&img, 0.0);
        assert_eq!(rotated, img);
    }

    #[test]
    fn full_turn_is_identity() {
        let img = create_corner_image(7, 5);
        assert_eq!(rotate_arbitrary(&img, 360.0), img);
        assert_eq!(rotate_arbitrary(&img, -720.0), img);
    }

    #[test]
    fn quarter_turn_swaps_dimensions() {
        let img = create_corner_image(40, 20);
        let rotated = rotate_arbitrary(&img, 90.0);
        assert_eq!(rotated.dimensions(), (20, 40));
        // interior stays opaque
        assert!(rotated.get_pixel(10, 20).0[3] >= 254);
    }

    #[test]
    fn diagonal_rotation_expands_with_transparent_corners() {
        let img = RgbaImage::from_pixel(50, 50, Rgba([200, 100, 50, 255]));
        let rotated = rotate_arbitrary(&img, 45.0);

        assert_eq!(rotated.dimensions(), (71, 71));
        for (x, y) in [(0, 0), (70, 0), (0, 70), (70, 70)] {
            assert_eq!(rotated.get_pixel(x, y).0[3], 0, "corner ({x}, {y})");
        }
        let center = rotated.get_pixel(35, 35).0;
        for (got, want) in center.iter().zip([200u8, 100, 50, 255]) {
            assert!(got.abs_diff(want) <= 1, "center {center:?}");
        }
    }

    #[test]
    fn random_rotation_is_reproducible_for_a_seed() {
        let img = create_corner_image(30, 10);
        let a = rotate_random(&img, &mut StdRng::seed_from_u64(5));
        let b = rotate_random(&img, &mut StdRng::seed_from_u64(5));
        assert_eq!(a, b);
    }

    #[test]
    fn empty_image_is_returned_unchanged() {
        let img = RgbaImage::new(0, 0);
        assert_eq!(rotate_arbitrary(&img, 33.0).dimensions(), (0, 0));
    }
}
