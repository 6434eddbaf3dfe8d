//! # Image Enhancement Module
//!
//! Contrast normalization, denoising and sharpening applied before skew
//! correction. The output is always a single-channel image with the input's
//! dimensions.

use image::{DynamicImage, GrayImage, Luma};

use super::color::{ensure_non_empty, to_grayscale};
use super::filtering::sharpen;
use super::types::EnhanceConfig;
use crate::errors::PipelineError;

/// Enhances a document image for downstream binarization.
///
/// Steps, in order:
/// 1. grayscale conversion
/// 2. CLAHE over `config.tile_grid` with `config.clip_limit`
/// 3. non-local-means denoising
/// 4. 3x3 sharpening (when `config.sharpen` is set)
///
/// # Arguments
///
/// * `image` - The input image (grayscale or color)
/// * `config` - Enhancement parameters
///
/// # Returns
///
/// Returns the enhanced grayscale image, or a `PipelineError` if the image is
/// empty or the configuration is invalid
///
/// # Examples
///
/// ```no_run
/// use scanprep::preprocessing::{enhance, EnhanceConfig};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let img = image::open("scan.jpg")?;
/// let enhanced = enhance(&img, &EnhanceConfig::default())?;
/// assert_eq!(enhanced.dimensions(), (img.width(), img.height()));
/// # Ok(())
/// # }
/// ```
pub fn enhance(image: &DynamicImage, config: &EnhanceConfig) -> Result<GrayImage, PipelineError> {
    config.validate()?;
    ensure_non_empty(image, "enhance")?;

    let start_time = std::time::Instant::now();

    let gray = to_grayscale(image);
    let equalized = apply_clahe(&gray, config.clip_limit, config.tile_grid);
    let denoised = denoise_nl_means(
        &equalized,
        config.denoise_strength,
        config.template_window,
        config.search_window,
    );
    let enhanced = if config.sharpen {
        sharpen(&denoised)
    } else {
        denoised
    };

    tracing::debug!(
        target: "scanprep::preprocessing",
        "Enhancement completed in {}ms: clip_limit={}, tile_grid={:?}, h={}, dimensions={}x{}",
        start_time.elapsed().as_millis(),
        config.clip_limit,
        config.tile_grid,
        config.denoise_strength,
        enhanced.width(),
        enhanced.height()
    );

    Ok(enhanced)
}

/// Applies Contrast Limited Adaptive Histogram Equalization (CLAHE).
///
/// The image is split into a `tile_grid` of cells. Each cell gets its own
/// equalization table built from a clipped histogram (the clip is relative:
/// `clip_limit * cell_area / 256`, excess redistributed uniformly). Every
/// output pixel is bilinearly interpolated between the tables of the four
/// nearest cell centers, so cell seams do not show.
///
/// # Arguments
///
/// * `image` - Grayscale input
/// * `clip_limit` - Relative histogram clip limit (2.0 is a good default)
/// * `tile_grid` - Number of cells as (columns, rows)
pub fn apply_clahe(image: &GrayImage, clip_limit: f32, tile_grid: (u32, u32)) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let grid_x = tile_grid.0.clamp(1, width) as usize;
    let grid_y = tile_grid.1.clamp(1, height) as usize;

    let x_bounds = partition(width, grid_x);
    let y_bounds = partition(height, grid_y);

    let mut luts = vec![[0u8; 256]; grid_x * grid_y];
    for ty in 0..grid_y {
        for tx in 0..grid_x {
            luts[ty * grid_x + tx] = tile_lut(
                image,
                (x_bounds[tx], x_bounds[tx + 1]),
                (y_bounds[ty], y_bounds[ty + 1]),
                clip_limit,
            );
        }
    }

    let tile_w = width as f32 / grid_x as f32;
    let tile_h = height as f32 / grid_y as f32;

    // Neighbouring tile indices and weights depend only on the column/row
    let columns: Vec<(usize, usize, f32)> = (0..width)
        .map(|x| interpolation_coords(x, tile_w, grid_x))
        .collect();
    let rows: Vec<(usize, usize, f32)> = (0..height)
        .map(|y| interpolation_coords(y, tile_h, grid_y))
        .collect();

    GrayImage::from_fn(width, height, |x, y| {
        let value = image.get_pixel(x, y)[0] as usize;
        let (x1, x2, xa) = columns[x as usize];
        let (y1, y2, ya) = rows[y as usize];

        let top = luts[y1 * grid_x + x1][value] as f32 * (1.0 - xa)
            + luts[y1 * grid_x + x2][value] as f32 * xa;
        let bottom = luts[y2 * grid_x + x1][value] as f32 * (1.0 - xa)
            + luts[y2 * grid_x + x2][value] as f32 * xa;
        let blended = top * (1.0 - ya) + bottom * ya;

        Luma([blended.round().clamp(0.0, 255.0) as u8])
    })
}

/// Splits `len` into `parts` contiguous spans; returns `parts + 1` boundaries.
fn partition(len: u32, parts: usize) -> Vec<u32> {
    (0..=parts)
        .map(|i| (len as u64 * i as u64 / parts as u64) as u32)
        .collect()
}

fn interpolation_coords(pos: u32, tile_size: f32, tiles: usize) -> (usize, usize, f32) {
    let t = (pos as f32 + 0.5) / tile_size - 0.5;
    let lower = t.floor();
    let alpha = t - lower;
    let last = tiles as i64 - 1;
    let t1 = (lower as i64).clamp(0, last) as usize;
    let t2 = (lower as i64 + 1).clamp(0, last) as usize;
    (t1, t2, alpha)
}

/// Builds the clipped-histogram equalization table of one tile.
fn tile_lut(
    image: &GrayImage,
    (x0, x1): (u32, u32),
    (y0, y1): (u32, u32),
    clip_limit: f32,
) -> [u8; 256] {
    let mut histogram = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            histogram[image.get_pixel(x, y)[0] as usize] += 1;
        }
    }

    let total_pixels = (x1 - x0) * (y1 - y0);
    let mut lut = [0u8; 256];
    if total_pixels == 0 {
        for (i, entry) in lut.iter_mut().enumerate() {
            *entry = i as u8;
        }
        return lut;
    }

    // Apply clip limit
    let clip_limit_pixels = ((clip_limit * total_pixels as f32 / 256.0) as u32).max(1);
    let mut excess_pixels = 0u32;
    for count in &mut histogram {
        if *count > clip_limit_pixels {
            excess_pixels += *count - clip_limit_pixels;
            *count = clip_limit_pixels;
        }
    }

    // Redistribute excess pixels uniformly, spreading the remainder evenly
    let uniform_increment = excess_pixels / 256;
    let mut remainder = excess_pixels % 256;
    for count in &mut histogram {
        *count += uniform_increment;
    }
    if remainder > 0 {
        let step = (256 / remainder as usize).max(1);
        for count in histogram.iter_mut().step_by(step) {
            if remainder == 0 {
                break;
            }
            *count += 1;
            remainder -= 1;
        }
    }

    let scale = 255.0 / total_pixels as f32;
    let mut cumulative = 0u32;
    for (i, count) in histogram.iter().enumerate() {
        cumulative += count;
        lut[i] = (cumulative as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Non-local-means denoising of a grayscale image.
///
/// Every pixel becomes the weighted mean of the pixels in a
/// `search_window`-sided neighbourhood, each weighted by
/// `exp(-(mean squared patch difference) / h^2)` where patches are
/// `template_window`-sided squares. Borders are replicated.
///
/// Patch distances are evaluated one search offset at a time through an
/// integral image of squared differences, so the cost grows with
/// `pixels * search_window^2` and not with the template size.
pub fn denoise_nl_means(
    image: &GrayImage,
    h: f32,
    template_window: u32,
    search_window: u32,
) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let w = width as usize;
    let ht = height as usize;
    let tr = (template_window / 2) as usize;
    let sr = (search_window / 2) as usize;
    let pad = tr + sr;

    let padded_w = w + 2 * pad;
    let padded_h = ht + 2 * pad;
    let src = image.as_raw();
    let padded: Vec<i32> = (0..padded_h)
        .flat_map(|py| {
            let sy = py.saturating_sub(pad).min(ht - 1);
            (0..padded_w).map(move |px| {
                let sx = px.saturating_sub(pad).min(w - 1);
                src[sy * w + sx] as i32
            })
        })
        .collect();

    // Squared differences are needed on the image grown by the template radius
    let region_w = w + 2 * tr;
    let region_h = ht + 2 * tr;
    let integral_w = region_w + 1;
    let mut integral = vec![0u64; integral_w * (region_h + 1)];

    let template_area = ((2 * tr + 1) * (2 * tr + 1)) as f32;
    let inv_h2 = 1.0 / (h * h).max(f32::EPSILON);

    let mut weight_sum = vec![0f32; w * ht];
    let mut value_sum = vec![0f32; w * ht];

    for dy in -(sr as isize)..=(sr as isize) {
        for dx in -(sr as isize)..=(sr as isize) {
            // Integral image of (I(p) - I(p + d))^2 over the region
            for ry in 0..region_h {
                let py = ry + sr;
                let qy = (py as isize + dy) as usize;
                let mut row_sum = 0u64;
                for rx in 0..region_w {
                    let px = rx + sr;
                    let qx = (px as isize + dx) as usize;
                    let diff = padded[py * padded_w + px] - padded[qy * padded_w + qx];
                    row_sum += (diff * diff) as u64;
                    integral[(ry + 1) * integral_w + rx + 1] =
                        integral[ry * integral_w + rx + 1] + row_sum;
                }
            }

            let side = 2 * tr + 1;
            for y in 0..ht {
                for x in 0..w {
                    let top = y * integral_w;
                    let bottom = (y + side) * integral_w;
                    let ssd = integral[bottom + x + side] + integral[top + x]
                        - integral[top + x + side]
                        - integral[bottom + x];

                    let weight = (-(ssd as f32 / template_area) * inv_h2).exp();
                    let qy = (y + pad) as isize + dy;
                    let qx = (x + pad) as isize + dx;
                    let value = padded[qy as usize * padded_w + qx as usize] as f32;

                    weight_sum[y * w + x] += weight;
                    value_sum[y * w + x] += weight * value;
                }
            }
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let i = y as usize * w + x as usize;
        Luma([(value_sum[i] / weight_sum[i]).round().clamp(0.0, 255.0) as u8])
    })
}
