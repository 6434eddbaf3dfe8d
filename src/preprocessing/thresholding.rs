//! # Image Thresholding Module
//!
//! This module provides binary thresholding functionality for preprocessing.
//! It includes Otsu's method for automatic global threshold selection and an
//! adaptive Gaussian threshold for unevenly lit scans.

use image::{GrayImage, Luma};

use super::filtering::{gaussian_kernel, smooth_f32};
use super::types::ThresholdedImageResult;
use crate::errors::PipelineError;

/// Applies Otsu's thresholding algorithm to convert an image to binary (black/white).
///
/// This function automatically determines the optimal threshold value using Otsu's method,
/// which maximizes the between-class variance. Pixels strictly above the threshold become
/// 255, all others 0.
///
/// # Arguments
///
/// * `gray` - The grayscale image to threshold
///
/// # Returns
///
/// Returns a `Result` containing the thresholded image and metadata, or a
/// `PipelineError::Geometry` when the image has no pixels
///
/// # Examples
///
/// ```no_run
/// use scanprep::preprocessing::apply_otsu_threshold;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let img = image::open("scan.jpg")?.to_luma8();
/// let thresholded = apply_otsu_threshold(&img)?;
/// println!("Optimal threshold: {}", thresholded.threshold);
/// # Ok(())
/// # }
/// ```
pub fn apply_otsu_threshold(gray: &GrayImage) -> Result<ThresholdedImageResult, PipelineError> {
    let start_time = std::time::Instant::now();

    let optimal_threshold = otsu_threshold(gray)?;

    let binary_img = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] > optimal_threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "scanprep::preprocessing",
        "Otsu thresholding completed in {}ms: threshold={}, dimensions={}x{}",
        processing_time.as_millis(),
        optimal_threshold,
        gray.width(),
        gray.height()
    );

    Ok(ThresholdedImageResult {
        image: binary_img,
        threshold: optimal_threshold,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}

/// Computes the Otsu threshold of a grayscale image.
///
/// # Errors
///
/// Returns `PipelineError::Geometry` when the image has no pixels.
pub fn otsu_threshold(gray: &GrayImage) -> Result<u8, PipelineError> {
    let total_pixels = gray.width() as u64 * gray.height() as u64;
    if total_pixels == 0 {
        return Err(PipelineError::Geometry(
            "Otsu threshold of an image with zero pixels".to_string(),
        ));
    }

    let mut histogram = [0u32; 256];
    for pixel in gray.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    Ok(find_otsu_threshold(&histogram, total_pixels as f64))
}

/// Finds the optimal threshold using Otsu's method by maximizing between-class variance.
///
/// Falls back to 128 when no split separates two non-empty classes.
fn find_otsu_threshold(histogram: &[u32; 256], total_pixels: f64) -> u8 {
    // Calculate cumulative sums for efficiency
    let mut cumulative_sum = 0f64;
    let mut cumulative_weighted_sum = 0f64;

    let mut cumulative_sums = [0f64; 256];
    let mut cumulative_weighted_sums = [0f64; 256];

    for i in 0..256 {
        let pixel_count = histogram[i] as f64;
        cumulative_sum += pixel_count;
        cumulative_weighted_sum += (i as f64) * pixel_count;

        cumulative_sums[i] = cumulative_sum;
        cumulative_weighted_sums[i] = cumulative_weighted_sum;
    }

    let mut max_variance = 0f64;
    let mut optimal_threshold = 128u8;

    let total_weighted_sum = cumulative_weighted_sums[255];

    for threshold in 0..255 {
        // Weight of background class (pixels <= threshold)
        let w0 = cumulative_sums[threshold] / total_pixels;
        // Weight of foreground class (pixels > threshold)
        let w1 = 1.0 - w0;

        if w0 == 0.0 || w1 <= 0.0 {
            continue;
        }

        let mu0 = cumulative_weighted_sums[threshold] / cumulative_sums[threshold];
        let mu1 = (total_weighted_sum - cumulative_weighted_sums[threshold])
            / (cumulative_sums[255] - cumulative_sums[threshold]);

        // Between-class variance
        let variance = w0 * w1 * (mu0 - mu1).powi(2);

        if variance > max_variance {
            max_variance = variance;
            optimal_threshold = threshold as u8;
        }
    }

    optimal_threshold
}

/// Adaptive threshold against a Gaussian-weighted local mean.
///
/// The local mean uses a `block_size`-sided Gaussian window (sigma derived from
/// the block size) with replicated borders, rounded to 8 bits. A pixel becomes
/// 255 when `src > mean - offset`, else 0.
///
/// # Errors
///
/// Returns `PipelineError::Config` unless `block_size` is odd and at least 3.
pub fn adaptive_gaussian_threshold(
    gray: &GrayImage,
    block_size: u32,
    offset: f32,
) -> Result<GrayImage, PipelineError> {
    if block_size < 3 || block_size % 2 == 0 {
        return Err(PipelineError::Config(format!(
            "block_size must be odd and at least 3 (got {})",
            block_size
        )));
    }

    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Ok(gray.clone());
    }

    let means = smooth_f32(gray, &gaussian_kernel(block_size, 0.0));

    Ok(GrayImage::from_fn(width, height, |x, y| {
        let mean = means.get_pixel(x, y)[0].round().clamp(0.0, 255.0);
        let src = gray.get_pixel(x, y)[0] as f32;
        if src > mean - offset {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    }))
}
