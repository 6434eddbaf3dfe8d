//! # Color Normalization
//!
//! Single entry point for luma conversion and channel-layout normalization.
//! Every stage that works on intensities goes through [`to_grayscale`].

use image::{DynamicImage, GrayImage, ImageBuffer, Luma, RgbImage};

use crate::errors::PipelineError;

/// Converts an image to 8-bit luma using ITU-R BT.601 weights.
///
/// Grayscale input is copied unchanged. Color input is reduced as
/// `0.299 R + 0.587 G + 0.114 B`, rounded to the nearest integer.
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        other if other.color().has_color() => rgb_to_luma(&other.to_rgb8()),
        other => other.to_luma8(),
    }
}

fn rgb_to_luma(rgb: &RgbImage) -> GrayImage {
    ImageBuffer::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

/// Normalizes any decoded layout to `Luma8` or `Rgb8`.
///
/// Layouts with color channels become `Rgb8` (alpha dropped), everything else
/// becomes `Luma8`. Images already in one of the two layouts are returned as-is.
pub fn normalize_layout(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image,
        other if other.color().has_color() => DynamicImage::ImageRgb8(other.to_rgb8()),
        other => DynamicImage::ImageLuma8(other.to_luma8()),
    }
}

/// Builds an image from a raw interleaved buffer.
///
/// `channels` must be 1 (grayscale) or 3 (RGB) and `bytes` must hold exactly
/// `width * height * channels` samples.
pub fn image_from_raw(
    width: u32,
    height: u32,
    channels: u8,
    bytes: Vec<u8>,
) -> Result<DynamicImage, PipelineError> {
    if width == 0 || height == 0 {
        return Err(PipelineError::Input(format!(
            "raw image dimensions must be non-zero (got {}x{})",
            width, height
        )));
    }

    let expected = width as usize * height as usize * channels as usize;
    if bytes.len() != expected {
        return Err(PipelineError::Input(format!(
            "raw buffer holds {} bytes, expected {} for {}x{}x{}",
            bytes.len(),
            expected,
            width,
            height,
            channels
        )));
    }

    let image = match channels {
        1 => GrayImage::from_raw(width, height, bytes).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, bytes).map(DynamicImage::ImageRgb8),
        other => {
            return Err(PipelineError::Input(format!(
                "unsupported channel count {} (expected 1 or 3)",
                other
            )))
        }
    };

    image.ok_or_else(|| PipelineError::Input("raw buffer does not match dimensions".to_string()))
}

/// Fails with an input error when the image has no pixels.
pub fn ensure_non_empty(image: &DynamicImage, stage: &str) -> Result<(), PipelineError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::Input(format!(
            "{} received an empty image ({}x{})",
            stage,
            image.width(),
            image.height()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_grayscale_is_identity_for_luma() {
        let gray = GrayImage::from_fn(4, 3, |x, y| Luma([(x * 10 + y) as u8]));
        let out = to_grayscale(&DynamicImage::ImageLuma8(gray.clone()));
        assert_eq!(out, gray);
    }

    #[test]
    fn test_grayscale_uses_bt601_weights() {
        let mut rgb = RgbImage::new(3, 1);
        rgb.put_pixel(0, 0, Rgb([255, 0, 0]));
        rgb.put_pixel(1, 0, Rgb([0, 255, 0]));
        rgb.put_pixel(2, 0, Rgb([0, 0, 255]));
        let gray = to_grayscale(&DynamicImage::ImageRgb8(rgb));
        assert_eq!(gray.get_pixel(0, 0)[0], 76);
        assert_eq!(gray.get_pixel(1, 0)[0], 150);
        assert_eq!(gray.get_pixel(2, 0)[0], 29);
    }

    #[test]
    fn test_normalize_layout_drops_alpha() {
        let rgba = image::RgbaImage::new(2, 2);
        let normalized = normalize_layout(DynamicImage::ImageRgba8(rgba));
        assert!(matches!(normalized, DynamicImage::ImageRgb8(_)));

        let la = image::GrayAlphaImage::new(2, 2);
        let normalized = normalize_layout(DynamicImage::ImageLumaA8(la));
        assert!(matches!(normalized, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_image_from_raw_validates_length() {
        assert!(image_from_raw(2, 2, 1, vec![0; 4]).is_ok());
        assert!(image_from_raw(2, 2, 3, vec![0; 12]).is_ok());
        assert!(image_from_raw(2, 2, 3, vec![0; 11]).unwrap_err().is_input());
        assert!(image_from_raw(2, 2, 4, vec![0; 16]).unwrap_err().is_input());
        assert!(image_from_raw(0, 2, 1, vec![]).unwrap_err().is_input());
    }
}
