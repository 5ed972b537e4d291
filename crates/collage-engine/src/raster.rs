//! Raster normalization and alpha masking.

use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb, RgbaImage};
use tracing::debug;

use crate::{CollageError, Result};

/// Convert a decoded raster to 8-bit RGBA.
///
/// Gray and RGB inputs become fully opaque. Layouts other than 1, 3 or 4
/// channels are rejected.
pub fn normalize_to_rgba(img: &DynamicImage) -> Result<RgbaImage> {
    let channels = img.color().channel_count();
    match channels {
        1 | 3 | 4 => {
            debug!(
                w = img.width(),
                h = img.height(),
                channels,
                "Normalizing raster to RGBA"
            );
            Ok(img.to_rgba8())
        }
        _ => Err(CollageError::UnsupportedChannelLayout { channels }),
    }
}

/// Build an RGBA buffer from interleaved 8-bit samples.
pub fn normalize_raw(width: u32, height: u32, channels: u8, data: &[u8]) -> Result<RgbaImage> {
    let expected = width as usize * height as usize * channels as usize;
    if !matches!(channels, 1 | 3 | 4) {
        return Err(CollageError::UnsupportedChannelLayout { channels });
    }
    if data.len() != expected {
        return Err(CollageError::InvalidRaster(format!(
            "expected {expected} bytes for {width}x{height}x{channels}, got {}",
            data.len()
        )));
    }

    let bytes = data.to_vec();
    let img = match channels {
        1 => ImageBuffer::<Luma<u8>, _>::from_raw(width, height, bytes).map(DynamicImage::ImageLuma8),
        3 => ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, bytes).map(DynamicImage::ImageRgb8),
        _ => RgbaImage::from_raw(width, height, bytes).map(DynamicImage::ImageRgba8),
    };

    match img {
        Some(img) => normalize_to_rgba(&img),
        None => Err(CollageError::InvalidRaster(format!(
            "buffer does not fit {width}x{height}x{channels}"
        ))),
    }
}

/// Write `mask` into the alpha channel of `img`.
///
/// Coverage scales the existing alpha, so pixels that were already
/// transparent stay transparent. Only the overlapping region is touched
/// when the sizes differ.
pub fn apply_alpha_mask(img: &mut RgbaImage, mask: &GrayImage) {
    let w = img.width().min(mask.width());
    let h = img.height().min(mask.height());

    for y in 0..h {
        for x in 0..w {
            let coverage = u16::from(mask.get_pixel(x, y).0[0]);
            let pixel = img.get_pixel_mut(x, y);
            let alpha = u16::from(pixel.0[3]);
            pixel.0[3] = ((alpha * coverage + 127) / 255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayAlphaImage, LumaA, Rgba};

    #[test]
    fn gray_becomes_opaque_rgba() {
        let gray = GrayImage::from_pixel(3, 2, Luma([90]));
        let rgba = normalize_to_rgba(&DynamicImage::ImageLuma8(gray)).unwrap();
        assert_eq!(rgba.dimensions(), (3, 2));
        assert!(rgba.pixels().all(|p| *p == Rgba([90, 90, 90, 255])));
    }

    #[test]
    fn rgb_becomes_opaque_rgba() {
        let rgb = image::RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]));
        let rgba = normalize_to_rgba(&DynamicImage::ImageRgb8(rgb)).unwrap();
        assert!(rgba.pixels().all(|p| *p == Rgba([1, 2, 3, 255])));
    }

    #[test]
    fn rgba_alpha_is_preserved() {
        let src = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 40]));
        let rgba = normalize_to_rgba(&DynamicImage::ImageRgba8(src.clone())).unwrap();
        assert_eq!(rgba, src);
    }

    #[test]
    fn gray_alpha_is_unsupported() {
        let ga = GrayAlphaImage::from_pixel(2, 2, LumaA([1, 2]));
        let err = normalize_to_rgba(&DynamicImage::ImageLumaA8(ga)).unwrap_err();
        assert!(matches!(err, CollageError::UnsupportedChannelLayout { channels: 2 }));
    }

    #[test]
    fn raw_rgb_samples() {
        let data = [255, 0, 0, 0, 255, 0];
        let rgba = normalize_raw(2, 1, 3, &data).unwrap();
        assert_eq!(*rgba.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*rgba.get_pixel(1, 0), Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn raw_with_bad_channel_count_is_rejected() {
        let err = normalize_raw(1, 1, 2, &[0, 0]).unwrap_err();
        assert!(matches!(err, CollageError::UnsupportedChannelLayout { channels: 2 }));
    }

    #[test]
    fn raw_with_wrong_length_is_rejected() {
        let err = normalize_raw(2, 2, 4, &[0; 15]).unwrap_err();
        assert!(matches!(err, CollageError::InvalidRaster(_)));
    }

    #[test]
    fn mask_scales_alpha() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([5, 5, 5, 255]));
        let mut mask = GrayImage::new(2, 1);
        mask.put_pixel(0, 0, Luma([255]));
        mask.put_pixel(1, 0, Luma([0]));
        apply_alpha_mask(&mut img, &mask);
        assert_eq!(img.get_pixel(0, 0).0[3], 255);
        assert_eq!(img.get_pixel(1, 0).0[3], 0);
        // color is untouched
        assert_eq!(&img.get_pixel(1, 0).0[..3], &[5, 5, 5]);
    }

    #[test]
    fn mask_keeps_transparent_pixels_transparent() {
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([5, 5, 5, 0]));
        let mask = GrayImage::from_pixel(1, 1, Luma([255]));
        apply_alpha_mask(&mut img, &mask);
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
    }
}
