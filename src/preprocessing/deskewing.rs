//! # Image Deskewing Module
//!
//! This module estimates document skew from the minimum-area rectangle around
//! the foreground and corrects it with an interpolated rotation about the image
//! center.
//!
//! Angles are measured in image coordinates (x to the right, y downward), so a
//! positive angle turns the +x axis toward +y, which is clockwise on screen.

use image::{DynamicImage, ImageBuffer, Pixel};
use imageproc::point::Point;

use super::color::{normalize_layout, to_grayscale};
use super::types::{DeskewConfig, DeskewResult, Interpolation};
use crate::errors::PipelineError;
use crate::geometry::min_area_rect;

/// How samples outside the source image are filled during a warp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderMode {
    /// Repeat the nearest edge pixel
    Replicate,
    /// Use a constant intensity for every channel
    Constant(u8),
}

/// Detects and corrects skew in a document image.
///
/// The skew angle comes from [`estimate_skew_angle`]; the image is then rotated
/// about its center by the negated angle with edge-replicating borders. Width,
/// height and channel layout are preserved.
///
/// An image without any foreground sample (every intensity is 0) is returned
/// as an identical copy with `skew_angle_degrees == None`.
///
/// # Arguments
///
/// * `image` - The input image to deskew
/// * `config` - Interpolation settings
///
/// # Examples
///
/// ```no_run
/// use scanprep::preprocessing::{deskew, DeskewConfig};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let img = image::open("rotated_scan.png")?;
/// let result = deskew(&img, &DeskewConfig::default())?;
/// println!("Detected skew: {:?}", result.skew_angle_degrees);
/// # Ok(())
/// # }
/// ```
pub fn deskew(image: &DynamicImage, config: &DeskewConfig) -> Result<DeskewResult, PipelineError> {
    let start_time = std::time::Instant::now();

    let Some(skew_angle) = estimate_skew_angle(image)? else {
        tracing::debug!(
            target: "scanprep::preprocessing",
            "No foreground samples, skipping deskewing"
        );

        return Ok(DeskewResult {
            image: image.clone(),
            skew_angle_degrees: None,
            rotated: false,
            processing_time_ms: start_time.elapsed().as_millis() as u32,
        });
    };

    let rotated = skew_angle != 0.0;
    let corrected = if rotated {
        rotate_about_center(image, -skew_angle, config.interpolation)
    } else {
        image.clone()
    };

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "scanprep::preprocessing",
        "Deskewing completed in {}ms: corrected {:.2}° skew, interpolation={:?}",
        processing_time.as_millis(),
        skew_angle,
        config.interpolation
    );

    Ok(DeskewResult {
        image: corrected,
        skew_angle_degrees: Some(skew_angle),
        rotated,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}

/// Estimates the skew angle of the foreground, in degrees within `[-45, 45)`.
///
/// Returns `Ok(None)` when no sample has a non-zero intensity.
pub fn estimate_skew_angle(image: &DynamicImage) -> Result<Option<f32>, PipelineError> {
    let gray = to_grayscale(image);
    let points = foreground_points(&gray);

    if points.is_empty() {
        return Ok(None);
    }

    let rect = min_area_rect(&points)?;
    Ok(Some(normalize_skew_angle(rect.angle as f32)))
}

/// Maps a minimum-area rectangle angle from `[-90, 0)` into `[-45, 45)`.
pub fn normalize_skew_angle(angle: f32) -> f32 {
    if angle < -45.0 {
        90.0 + angle
    } else {
        angle
    }
}

/// Coordinates of foreground samples (intensity > 0) that can lie on their
/// convex hull.
///
/// Only the leftmost and rightmost foreground sample of each row can be a hull
/// vertex, so interior samples are skipped. The hull, and therefore the
/// minimum-area rectangle, is the same as for the full sample set.
pub fn foreground_points(gray: &image::GrayImage) -> Vec<Point<i32>> {
    let width = gray.width() as usize;
    let mut points = Vec::new();

    if width == 0 {
        return points;
    }

    for (y, row) in gray.as_raw().chunks_exact(width).enumerate() {
        let first = row.iter().position(|&v| v > 0);
        let last = row.iter().rposition(|&v| v > 0);
        if let (Some(first), Some(last)) = (first, last) {
            points.push(Point::new(first as i32, y as i32));
            if last != first {
                points.push(Point::new(last as i32, y as i32));
            }
        }
    }

    points
}

/// Rotates an image about its center by `degrees`, replicating edge pixels.
///
/// Positive angles rotate clockwise on screen (see the module docs). The output
/// has the same dimensions as the input; `Luma8`, `LumaA8`, `Rgb8` and `Rgba8`
/// layouts are kept, other layouts are first normalized to `Luma8`/`Rgb8`.
pub fn rotate_about_center(
    image: &DynamicImage,
    degrees: f32,
    interpolation: Interpolation,
) -> DynamicImage {
    rotate_with_border(image, degrees, interpolation, BorderMode::Replicate)
}

/// Rotates an image about its center by `degrees` with an explicit border mode.
pub fn rotate_with_border(
    image: &DynamicImage,
    degrees: f32,
    interpolation: Interpolation,
    border: BorderMode,
) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(buf) => {
            DynamicImage::ImageLuma8(rotate_buffer(buf, degrees, interpolation, border))
        }
        DynamicImage::ImageLumaA8(buf) => {
            DynamicImage::ImageLumaA8(rotate_buffer(buf, degrees, interpolation, border))
        }
        DynamicImage::ImageRgb8(buf) => {
            DynamicImage::ImageRgb8(rotate_buffer(buf, degrees, interpolation, border))
        }
        DynamicImage::ImageRgba8(buf) => {
            DynamicImage::ImageRgba8(rotate_buffer(buf, degrees, interpolation, border))
        }
        other => rotate_with_border(
            &normalize_layout(other.clone()),
            degrees,
            interpolation,
            border,
        ),
    }
}

/// Inverse-mapped rotation of an 8-bit buffer.
fn rotate_buffer<P>(
    src: &ImageBuffer<P, Vec<u8>>,
    degrees: f32,
    interpolation: Interpolation,
    border: BorderMode,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = src.dimensions();
    let mut out = ImageBuffer::<P, Vec<u8>>::new(width, height);
    if width == 0 || height == 0 {
        return out;
    }

    let channels = P::CHANNEL_COUNT as usize;
    let sampler = Sampler {
        raw: src.as_raw(),
        width: width as i64,
        height: height as i64,
        channels,
        border,
    };

    let (sin, cos) = (degrees as f64).to_radians().sin_cos();
    let cx = (width as f64 - 1.0) / 2.0;
    let cy = (height as f64 - 1.0) / 2.0;

    let buffer: &mut [u8] = &mut out;
    for y in 0..height as usize {
        for x in 0..width as usize {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            // Source position under the inverse rotation
            let sx = cx + cos * dx + sin * dy;
            let sy = cy - sin * dx + cos * dy;

            let base = (y * width as usize + x) * channels;
            for c in 0..channels {
                let value = match interpolation {
                    Interpolation::Bilinear => sampler.bilinear(sx, sy, c),
                    Interpolation::Bicubic => sampler.bicubic(sx, sy, c),
                };
                buffer[base + c] = value.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    out
}

struct Sampler<'a> {
    raw: &'a [u8],
    width: i64,
    height: i64,
    channels: usize,
    border: BorderMode,
}

impl Sampler<'_> {
    fn fetch(&self, x: i64, y: i64, c: usize) -> f64 {
        let inside = x >= 0 && x < self.width && y >= 0 && y < self.height;
        let (x, y) = match self.border {
            BorderMode::Constant(value) if !inside => return value as f64,
            _ => (x.clamp(0, self.width - 1), y.clamp(0, self.height - 1)),
        };
        self.raw[(y * self.width + x) as usize * self.channels + c] as f64
    }

    fn bilinear(&self, sx: f64, sy: f64, c: usize) -> f64 {
        let x0 = sx.floor();
        let y0 = sy.floor();
        let fx = sx - x0;
        let fy = sy - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self.fetch(x0, y0, c) * (1.0 - fx) + self.fetch(x0 + 1, y0, c) * fx;
        let bottom = self.fetch(x0, y0 + 1, c) * (1.0 - fx) + self.fetch(x0 + 1, y0 + 1, c) * fx;
        top * (1.0 - fy) + bottom * fy
    }

    fn bicubic(&self, sx: f64, sy: f64, c: usize) -> f64 {
        let x0 = sx.floor();
        let y0 = sy.floor();
        let wx = cubic_weights(sx - x0);
        let wy = cubic_weights(sy - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let mut acc = 0.0;
        for (j, wyj) in wy.iter().enumerate() {
            let yy = y0 + j as i64 - 1;
            let mut row = 0.0;
            for (i, wxi) in wx.iter().enumerate() {
                row += wxi * self.fetch(x0 + i as i64 - 1, yy, c);
            }
            acc += wyj * row;
        }
        acc
    }
}

/// Weights of the taps at offsets -1, 0, 1, 2 for a fractional position `t`.
fn cubic_weights(t: f64) -> [f64; 4] {
    const A: f64 = -0.75;

    fn near(d: f64) -> f64 {
        ((A + 2.0) * d - (A + 3.0)) * d * d + 1.0
    }
    fn far(d: f64) -> f64 {
        ((A * d - 5.0 * A) * d + 8.0 * A) * d - 4.0 * A
    }

    [far(1.0 + t), near(t), near(1.0 - t), far(2.0 - t)]
}
