//! # Background Removal Module
//!
//! Adaptive binarization followed by a morphological closing, producing a
//! strictly two-valued image.

use image::{DynamicImage, GrayImage};

use super::color::to_grayscale;
use super::filtering::{apply_morphological_operation, MorphologicalOperation};
use super::thresholding::adaptive_gaussian_threshold;
use super::types::BackgroundConfig;
use crate::errors::PipelineError;

/// Removes uneven background from a document image.
///
/// The image is grayscale-converted, binarized against a Gaussian-weighted
/// local mean (`config.block_size`, `config.offset`) and closed with a 3x3
/// all-ones element to fill pinholes in strokes.
///
/// The output has the input's width and height and only contains 0 and 255.
///
/// # Errors
///
/// Returns `PipelineError::Config` for an invalid block size.
pub fn remove_background(
    image: &DynamicImage,
    config: &BackgroundConfig,
) -> Result<GrayImage, PipelineError> {
    config.validate()?;
    let start_time = std::time::Instant::now();

    let gray = to_grayscale(image);
    let binary = adaptive_gaussian_threshold(&gray, config.block_size, config.offset)?;
    let cleaned = if binary.width() == 0 || binary.height() == 0 {
        binary
    } else {
        apply_morphological_operation(&binary, MorphologicalOperation::Closing)
    };

    tracing::debug!(
        target: "scanprep::preprocessing",
        "Background removal completed in {}ms: block_size={}, offset={}, dimensions={}x{}",
        start_time.elapsed().as_millis(),
        config.block_size,
        config.offset,
        cleaned.width(),
        cleaned.height()
    );

    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    #[test]
    fn test_output_is_binary_with_same_shape() {
        let rgb = RgbImage::from_fn(40, 25, |x, y| Rgb([(x * 6) as u8, (y * 9) as u8, 50]));
        let cleaned =
            remove_background(&DynamicImage::ImageRgb8(rgb), &BackgroundConfig::default()).unwrap();
        assert_eq!(cleaned.dimensions(), (40, 25));
        assert!(cleaned.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn test_dark_text_survives_on_light_background() {
        let mut img = GrayImage::from_pixel(40, 40, Luma([220]));
        for y in 10..30 {
            for x in 18..21 {
                img.put_pixel(x, y, Luma([30]));
            }
        }
        let cleaned =
            remove_background(&DynamicImage::ImageLuma8(img), &BackgroundConfig::default()).unwrap();
        assert_eq!(cleaned.get_pixel(19, 20)[0], 0);
        assert_eq!(cleaned.get_pixel(5, 5)[0], 255);
    }

    #[test]
    fn test_invalid_block_size_is_config_error() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(10, 10));
        let config = BackgroundConfig {
            block_size: 8,
            ..Default::default()
        };
        assert!(matches!(
            remove_background(&img, &config),
            Err(PipelineError::Config(_))
        ));
    }
}
