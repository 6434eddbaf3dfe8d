//! # Image Cropping Module
//!
//! Content-bounded auto-cropping: the crop is the padded union of the bounding
//! rectangles of every external contour found after a global Otsu threshold.

use std::time::Instant;

use image::DynamicImage;

use super::color::to_grayscale;
use super::thresholding::apply_otsu_threshold;
use super::types::{CropConfig, CropResult};
use crate::errors::PipelineError;
use crate::geometry::{external_contours, Rect};

/// Crops an image to its content plus a margin.
///
/// When no contour is found, the full frame is returned. The pixels are cut
/// from the *input* image, so its channel layout is preserved.
///
/// # Arguments
///
/// * `image` - The image to crop
/// * `config` - Crop padding
///
/// # Returns
///
/// Returns a `CropResult` with the cropped pixels and the crop rectangle in
/// input coordinates. The rectangle always lies inside the input frame.
///
/// # Errors
///
/// Returns `PipelineError::Geometry` for an image with zero pixels.
///
/// # Examples
///
/// ```no_run
/// use scanprep::preprocessing::{auto_crop, CropConfig};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let img = image::open("scan.png")?;
/// let result = auto_crop(&img, &CropConfig::default())?;
/// println!("Cropped to {:?}", result.rect);
/// # Ok(())
/// # }
/// ```
pub fn auto_crop(image: &DynamicImage, config: &CropConfig) -> Result<CropResult, PipelineError> {
    let start_time = Instant::now();

    let gray = to_grayscale(image);
    let thresholded = apply_otsu_threshold(&gray)?;
    let (width, height) = gray.dimensions();

    let rect = content_bounds(&thresholded.image)
        .map(|bounds| bounds.pad_and_clamp(config.padding, width, height))
        .unwrap_or_else(|| Rect::full_frame(width, height));

    let cropped = image.crop_imm(rect.x, rect.y, rect.width, rect.height);

    let processing_time_ms = start_time.elapsed().as_millis() as u32;

    tracing::debug!(
        target: "scanprep::preprocessing",
        "Auto-crop completed in {}ms: threshold={}, {}x{} image cropped to {:?}",
        processing_time_ms,
        thresholded.threshold,
        width,
        height,
        rect
    );

    Ok(CropResult {
        image: cropped,
        rect,
        processing_time_ms,
    })
}

/// Union of the bounding rectangles of all external contours, if any.
fn content_bounds(binary: &image::GrayImage) -> Option<Rect> {
    external_contours(binary)
        .iter()
        .map(|contour| contour.bounding_rect())
        .reduce(|acc, rect| acc.union(&rect))
}
