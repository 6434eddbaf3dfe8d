//! # Image Filtering Module
//!
//! Linear filters and morphological operations shared by the preprocessing
//! stages. Convolutions go through `imageproc::filter`, which pads by
//! replicating edge pixels.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::{filter3x3, separable_filter_equal};
use imageproc::map::map_subpixels;
use imageproc::morphology;

/// Single-channel image with float samples, used for unrounded filter output.
pub type FloatImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Center 9, neighbours -1.
const SHARPEN_KERNEL: [i32; 9] = [-1, -1, -1, -1, 9, -1, -1, -1, -1];

/// Types of morphological operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphologicalOperation {
    /// Erosion operation (shrinks bright regions)
    Erosion,
    /// Dilation operation (expands bright regions)
    Dilation,
    /// Opening operation (erosion followed by dilation - removes noise)
    Opening,
    /// Closing operation (dilation followed by erosion - fills gaps)
    Closing,
}

/// Applies a morphological operation with a 3x3 all-ones structuring element.
///
/// The square element is expressed as a chessboard (L-infinity) radius of 1.
///
/// # Arguments
///
/// * `image` - The binary or grayscale image to process
/// * `operation` - The morphological operation to apply
///
/// # Returns
///
/// A new image with the same dimensions as `image`
pub fn apply_morphological_operation(
    image: &GrayImage,
    operation: MorphologicalOperation,
) -> GrayImage {
    let start_time = std::time::Instant::now();

    let processed = match operation {
        MorphologicalOperation::Erosion => morphology::erode(image, Norm::LInf, 1),
        MorphologicalOperation::Dilation => morphology::dilate(image, Norm::LInf, 1),
        MorphologicalOperation::Opening => morphology::open(image, Norm::LInf, 1),
        MorphologicalOperation::Closing => morphology::close(image, Norm::LInf, 1),
    };

    tracing::debug!(
        target: "scanprep::preprocessing",
        "Morphological operation completed in {}ms: operation={:?}, dimensions={}x{}",
        start_time.elapsed().as_millis(),
        operation,
        processed.width(),
        processed.height()
    );

    processed
}

/// Sigma used for a Gaussian of side `ksize` when none is given.
pub fn default_sigma(ksize: u32) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1-D Gaussian kernel of odd length `ksize`.
///
/// A non-positive `sigma` is replaced by [`default_sigma`].
pub fn gaussian_kernel(ksize: u32, sigma: f32) -> Vec<f32> {
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        default_sigma(ksize)
    };
    let radius = (ksize / 2) as i32;
    let denom = 2.0 * sigma * sigma;

    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();

    let sum: f32 = kernel.iter().sum();
    for weight in &mut kernel {
        *weight /= sum;
    }
    kernel
}

/// 5-tap binomial kernel `[1, 4, 6, 4, 1] / 16`.
pub fn binomial_kernel_5() -> Vec<f32> {
    [1.0, 4.0, 6.0, 4.0, 1.0]
        .iter()
        .map(|w| w / 16.0)
        .collect()
}

/// Convolves with `kernel` horizontally then vertically at `f32` precision.
///
/// `imageproc` clamps intermediate rows to the pixel type, which truncates
/// `u8` samples, so filtering runs on a float copy and rounding happens once
/// in [`round_to_gray`].
pub fn smooth_f32(image: &GrayImage, kernel: &[f32]) -> FloatImage {
    let float: FloatImage = map_subpixels(image, |v: u8| v as f32);
    separable_filter_equal(&float, kernel)
}

/// Rounds a float image back to 8 bits, saturating at the ends.
pub fn round_to_gray(image: &FloatImage) -> GrayImage {
    map_subpixels(image, |v: f32| v.round().clamp(0.0, 255.0) as u8)
}

/// Blurs with the 5x5 binomial kernel.
pub fn blur_5x5(image: &GrayImage) -> GrayImage {
    round_to_gray(&smooth_f32(image, &binomial_kernel_5()))
}

/// Applies the 3x3 sharpen kernel with replicated borders, saturating to
/// `[0, 255]`.
pub fn sharpen(image: &GrayImage) -> GrayImage {
    filter3x3::<_, i32, u8>(image, &SHARPEN_KERNEL)
}
