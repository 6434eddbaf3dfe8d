//! # Preprocessing Tests
//!
//! Shape, value-range and geometric properties of the preprocessing stages
//! on synthetic documents.

mod test_helpers;

#[cfg(test)]
mod tests {
    use crate::test_helpers::{noise_image, rotated_bar_canvas, square_canvas};
    use image::{DynamicImage, GrayImage};
    use scanprep::geometry::Rect;
    use scanprep::preprocessing::{
        auto_crop, deskew, enhance, estimate_skew_angle, image_from_raw, remove_background,
        rotate_about_center, BackgroundConfig, CropConfig, DeskewConfig, EnhanceConfig, Interpolation,
    };

    /// Enhancement keeps the frame size and produces a single channel
    #[test]
    fn test_enhance_preserves_shape() {
        let noisy = DynamicImage::ImageLuma8(noise_image(64, 48, 7));
        let enhanced = enhance(&noisy, &EnhanceConfig::default()).unwrap();
        assert_eq!(enhanced.dimensions(), (64, 48));

        let color = DynamicImage::ImageRgb8(noisy.to_rgb8());
        let enhanced = enhance(&color, &EnhanceConfig::default()).unwrap();
        assert_eq!(enhanced.dimensions(), (64, 48));
    }

    /// Background removal output only holds 0 and 255
    #[test]
    fn test_background_removal_is_binary() {
        for seed in [1, 2, 3] {
            let noisy = DynamicImage::ImageLuma8(noise_image(50, 40, seed));
            let cleaned = remove_background(&noisy, &BackgroundConfig::default()).unwrap();
            assert_eq!(cleaned.dimensions(), (50, 40));
            assert!(cleaned.pixels().all(|p| p[0] == 0 || p[0] == 255));
        }
    }

    #[test]
    fn test_background_rejects_even_block_size() {
        let config = BackgroundConfig {
            block_size: 10,
            ..Default::default()
        };
        let image = DynamicImage::ImageLuma8(noise_image(20, 20, 4));
        assert!(remove_background(&image, &config).is_err());
    }

    /// The crop rectangle always lies inside the source frame
    #[test]
    fn test_crop_is_contained_in_frame() {
        for seed in [11, 12] {
            let noisy = DynamicImage::ImageLuma8(noise_image(80, 60, seed));
            let result = auto_crop(&noisy, &CropConfig::default()).unwrap();
            assert!(result.rect.fits_within(80, 60));
            assert_eq!(result.image.width(), result.rect.width);
            assert_eq!(result.image.height(), result.rect.height);
        }
    }

    #[test]
    fn test_crop_of_square_canvas() {
        let result = auto_crop(&square_canvas(), &CropConfig::default()).unwrap();
        assert_eq!(result.rect, Rect::new(90, 90, 120, 120));
        assert!(matches!(result.image, DynamicImage::ImageRgb8(_)));
    }

    /// An all-black document is returned unchanged by deskew
    #[test]
    fn test_deskew_blank_is_identity() {
        let blank = DynamicImage::ImageLuma8(GrayImage::new(500, 300));
        let result = deskew(&blank, &DeskewConfig::default()).unwrap();
        assert!(!result.rotated);
        assert_eq!(result.image, blank);
    }

    /// Rotated content is measured and corrected to within 2 degrees
    #[test]
    fn test_deskew_recovers_rotation() {
        for degrees in [-8.0f32, 5.0, 15.0] {
            let canvas = rotated_bar_canvas(degrees);
            let measured = estimate_skew_angle(&canvas).unwrap().unwrap();
            assert!(
                (measured - degrees).abs() < 2.0,
                "rotated by {} but measured {}",
                degrees,
                measured
            );

            let config = DeskewConfig {
                interpolation: Interpolation::Bilinear,
            };
            let corrected = deskew(&canvas, &config).unwrap();
            assert_eq!(
                (corrected.image.width(), corrected.image.height()),
                (500, 300)
            );
            let residual = estimate_skew_angle(&corrected.image).unwrap().unwrap();
            assert!(residual.abs() < 2.0, "residual {} after {}", residual, degrees);
        }
    }

    /// The 500x300 square canvas turned by 15 degrees is measured near 15
    /// and straightened back to level
    #[test]
    fn test_deskew_square_canvas_rotated_15_degrees() {
        let rotated = rotate_about_center(&square_canvas(), 15.0, Interpolation::Bilinear);

        let measured = estimate_skew_angle(&rotated).unwrap().unwrap();
        assert!((measured - 15.0).abs() < 2.0, "measured {}", measured);

        let config = DeskewConfig {
            interpolation: Interpolation::Bilinear,
        };
        let corrected = deskew(&rotated, &config).unwrap();
        assert!(corrected.rotated);
        assert_eq!(
            (corrected.image.width(), corrected.image.height()),
            (500, 300)
        );
        let residual = estimate_skew_angle(&corrected.image).unwrap().unwrap();
        assert!(residual.abs() < 2.0, "residual {}", residual);
    }

    #[test]
    fn test_raw_buffer_input() {
        let bytes = vec![128u8; 6 * 4 * 3];
        let image = image_from_raw(6, 4, 3, bytes).unwrap();
        assert!(matches!(image, DynamicImage::ImageRgb8(_)));
        assert!(image_from_raw(6, 4, 3, vec![0u8; 10]).unwrap_err().is_input());

        let enhanced = enhance(&image, &EnhanceConfig::default()).unwrap();
        assert_eq!(enhanced.dimensions(), (6, 4));
    }
}
