//! # Shared Types for Image Preprocessing
//!
//! This module contains the stage configurations and result structs used across
//! the preprocessing sub-modules.

use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;
use crate::geometry::Rect;

/// Parameters of the enhancement stage (CLAHE, non-local-means, sharpen).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    /// CLAHE clip limit, relative to a uniform histogram
    pub clip_limit: f32,
    /// CLAHE tile grid as (columns, rows)
    pub tile_grid: (u32, u32),
    /// Non-local-means filter strength `h`
    pub denoise_strength: f32,
    /// Side of the square patch compared by non-local means (odd)
    pub template_window: u32,
    /// Side of the square search area of non-local means (odd)
    pub search_window: u32,
    /// Apply the 3x3 sharpen kernel after denoising
    pub sharpen: bool,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tile_grid: (8, 8),
            denoise_strength: 3.0,
            template_window: 7,
            search_window: 21,
            sharpen: true,
        }
    }
}

impl EnhanceConfig {
    /// Validate enhancement parameters
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.clip_limit > 0.0) {
            return Err(PipelineError::Config(format!(
                "clip_limit must be greater than 0 (got {})",
                self.clip_limit
            )));
        }
        if self.tile_grid.0 == 0 || self.tile_grid.1 == 0 {
            return Err(PipelineError::Config(
                "tile_grid dimensions must be greater than 0".to_string(),
            ));
        }
        if !(self.denoise_strength > 0.0) {
            return Err(PipelineError::Config(format!(
                "denoise_strength must be greater than 0 (got {})",
                self.denoise_strength
            )));
        }
        if self.template_window == 0 || self.template_window % 2 == 0 {
            return Err(PipelineError::Config(format!(
                "template_window must be a positive odd number (got {})",
                self.template_window
            )));
        }
        if self.search_window % 2 == 0 || self.search_window < self.template_window {
            return Err(PipelineError::Config(format!(
                "search_window must be odd and >= template_window (got {})",
                self.search_window
            )));
        }
        Ok(())
    }
}

/// Resampling kernel used by rotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Bilinear,
    #[default]
    Bicubic,
}

/// Parameters of the skew correction stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskewConfig {
    pub interpolation: Interpolation,
}

/// Parameters of the background removal stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Side of the Gaussian neighbourhood used for the local mean (odd, >= 3)
    pub block_size: u32,
    /// Constant subtracted from the local mean
    pub offset: f32,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            block_size: 11,
            offset: 2.0,
        }
    }
}

impl BackgroundConfig {
    /// Validate background removal parameters
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.block_size < 3 || self.block_size % 2 == 0 {
            return Err(PipelineError::Config(format!(
                "block_size must be odd and at least 3 (got {})",
                self.block_size
            )));
        }
        if !self.offset.is_finite() {
            return Err(PipelineError::Config(
                "offset must be a finite number".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters of the auto-crop stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    /// Margin added around the content bounding box, in pixels
    pub padding: u32,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self { padding: 10 }
    }
}

/// Result of Otsu thresholding.
#[derive(Debug, Clone)]
pub struct ThresholdedImageResult {
    /// The thresholded binary image
    pub image: GrayImage,
    /// Optimal threshold value found by Otsu's method
    pub threshold: u8,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of deskewing operation.
#[derive(Debug, Clone)]
pub struct DeskewResult {
    /// The deskewed image, same size and channel layout as the input
    pub image: DynamicImage,
    /// Corrected skew angle in degrees, `None` when the image had no foreground
    pub skew_angle_degrees: Option<f32>,
    /// Whether a rotation was actually applied
    pub rotated: bool,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of the auto-crop stage.
#[derive(Debug, Clone)]
pub struct CropResult {
    /// Cropped pixels of the input image
    pub image: DynamicImage,
    /// Crop rectangle in input coordinates
    pub rect: Rect,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}
