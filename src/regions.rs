//! # Region Detection Module
//!
//! Contour-based segmentation of a document into rectangular regions of
//! interest: edges, then external contours filtered by area, then
//! axis-aligned crops of the source image.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::PipelineError;
use crate::geometry::{external_contours, Contour, Rect};
use crate::input::load_image;
use crate::preprocessing::color::{ensure_non_empty, to_grayscale};
use crate::preprocessing::filtering::blur_5x5;

/// Overlay color of [`annotate_regions`].
pub const ANNOTATION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Region detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Contours must enclose strictly more than this area
    pub min_area: f64,
    /// Contours must enclose strictly less than this area, when set
    pub max_area: Option<f64>,
    /// Canny hysteresis low threshold
    pub canny_low: f32,
    /// Canny hysteresis high threshold
    pub canny_high: f32,
    /// Edge map values strictly above this level count as edges
    pub binarize_level: u8,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            min_area: 1000.0,
            max_area: None,
            canny_low: 50.0,
            canny_high: 150.0,
            binarize_level: 128,
        }
    }
}

impl RegionConfig {
    /// Validate region detector parameters
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.min_area >= 0.0) {
            return Err(PipelineError::Config(format!(
                "min_area must be a non-negative number (got {})",
                self.min_area
            )));
        }
        if let Some(max_area) = self.max_area {
            if !(max_area > self.min_area) {
                return Err(PipelineError::Config(format!(
                    "max_area ({}) must be greater than min_area ({})",
                    max_area, self.min_area
                )));
            }
        }
        if self.canny_low < 0.0 || self.canny_low > self.canny_high {
            return Err(PipelineError::Config(format!(
                "canny thresholds must satisfy 0 <= low <= high (got {} / {})",
                self.canny_low, self.canny_high
            )));
        }
        Ok(())
    }
}

/// An extracted region: its rectangle and an owned copy of its pixels.
#[derive(Debug, Clone)]
pub struct Roi {
    pub rect: Rect,
    pub image: DynamicImage,
}

/// Detects rectangular regions of interest from edge contours.
#[derive(Debug, Clone)]
pub struct ContourDetector {
    min_area: f64,
    max_area: Option<f64>,
    canny_low: f32,
    canny_high: f32,
    binarize_level: u8,
}

impl Default for ContourDetector {
    fn default() -> Self {
        Self::new(1000.0, None)
    }
}

impl ContourDetector {
    /// Creates a detector with the default edge thresholds.
    pub fn new(min_area: f64, max_area: Option<f64>) -> Self {
        let defaults = RegionConfig::default();
        Self {
            min_area,
            max_area,
            canny_low: defaults.canny_low,
            canny_high: defaults.canny_high,
            binarize_level: defaults.binarize_level,
        }
    }

    /// Creates a detector from a validated configuration.
    pub fn from_config(config: &RegionConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            min_area: config.min_area,
            max_area: config.max_area,
            canny_low: config.canny_low,
            canny_high: config.canny_high,
            binarize_level: config.binarize_level,
        })
    }

    pub fn min_area(&self) -> f64 {
        self.min_area
    }

    pub fn max_area(&self) -> Option<f64> {
        self.max_area
    }

    /// Grayscale conversion, 5x5 binomial blur, then Canny edge detection.
    pub fn detect_edges(&self, image: &DynamicImage) -> GrayImage {
        let gray = to_grayscale(image);
        let blurred = blur_5x5(&gray);
        imageproc::edges::canny(&blurred, self.canny_low, self.canny_high)
    }

    /// Traces external contours of an edge map and keeps those whose area is
    /// within the configured bounds. Order follows tracing order.
    pub fn find_contours(&self, edges: &GrayImage) -> Vec<Contour> {
        let level = self.binarize_level;
        let binary = GrayImage::from_fn(edges.width(), edges.height(), |x, y| {
            if edges.get_pixel(x, y)[0] > level {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });

        let traced = external_contours(&binary);
        let total = traced.len();
        let kept: Vec<Contour> = traced
            .into_iter()
            .filter(|contour| self.accepts_area(contour.area()))
            .collect();

        debug!(
            target: "scanprep::regions",
            traced = total,
            kept = kept.len(),
            min_area = self.min_area,
            max_area = ?self.max_area,
            "Filtered contours by area"
        );

        kept
    }

    /// Whether a contour area passes the strict min/max bounds.
    pub fn accepts_area(&self, area: f64) -> bool {
        area > self.min_area && self.max_area.map_or(true, |max| area < max)
    }

    /// Crops the axis-aligned bounding rectangle of a contour from `image`.
    pub fn extract_roi(&self, image: &DynamicImage, contour: &Contour) -> Roi {
        let rect = contour.bounding_rect();
        let rect = Rect::new(
            rect.x.min(image.width()),
            rect.y.min(image.height()),
            rect.width.min(image.width().saturating_sub(rect.x)),
            rect.height.min(image.height().saturating_sub(rect.y)),
        );
        Roi {
            rect,
            image: image.crop_imm(rect.x, rect.y, rect.width, rect.height),
        }
    }

    /// Runs edge detection, contour filtering and extraction on an image.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Input` for an image with no pixels.
    pub fn detect_regions(&self, image: &DynamicImage) -> Result<Vec<Roi>, PipelineError> {
        ensure_non_empty(image, "region detection")?;
        let start_time = std::time::Instant::now();

        let edges = self.detect_edges(image);
        let contours = self.find_contours(&edges);
        let rois: Vec<Roi> = contours
            .iter()
            .map(|contour| self.extract_roi(image, contour))
            .collect();

        debug!(
            target: "scanprep::regions",
            regions = rois.len(),
            duration_ms = start_time.elapsed().as_millis() as u64,
            "Region detection completed"
        );

        Ok(rois)
    }

    /// Loads an image file and detects its regions.
    ///
    /// # Errors
    ///
    /// Missing or unreadable files fail with `PipelineError::Input` before any
    /// stage runs.
    pub fn process_image(&self, path: &Path) -> Result<Vec<Roi>, PipelineError> {
        info!(path = %path.display(), "Processing image");
        let image = load_image(path)?;
        let rois = self.detect_regions(&image)?;
        info!(path = %path.display(), regions = rois.len(), "Found regions of interest");
        Ok(rois)
    }
}

/// Writes every region as `roi_{index}.png` into `output_dir`, creating it if needed.
pub fn save_regions(rois: &[Roi], output_dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    std::fs::create_dir_all(output_dir)?;

    rois.iter()
        .enumerate()
        .map(|(i, roi)| {
            let path = output_dir.join(format!("roi_{}.png", i));
            roi.image.save(&path).map_err(|e| {
                PipelineError::Input(format!("failed to write {}: {}", path.display(), e))
            })?;
            Ok::<PathBuf, PipelineError>(path)
        })
        .collect()
}

/// Draws a 2 px green outline around every region on a color copy of `image`.
pub fn annotate_regions(image: &DynamicImage, rois: &[Roi]) -> RgbImage {
    let mut canvas = image.to_rgb8();

    for roi in rois {
        if let Some(outer) = roi.rect.to_imageproc() {
            draw_hollow_rect_mut(&mut canvas, outer, ANNOTATION_COLOR);
        }
        if roi.rect.width > 2 && roi.rect.height > 2 {
            let inner = Rect::new(
                roi.rect.x + 1,
                roi.rect.y + 1,
                roi.rect.width - 2,
                roi.rect.height - 2,
            );
            if let Some(inner) = inner.to_imageproc() {
                draw_hollow_rect_mut(&mut canvas, inner, ANNOTATION_COLOR);
            }
        }
    }

    canvas
}
