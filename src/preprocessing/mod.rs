//! # Image Preprocessing Module
//!
//! This module provides the document preprocessing stages run before text
//! recognition. Every stage is a synchronous function taking an image and an
//! explicit configuration value and returning a new image.
//!
//! The module is organized into focused sub-modules:
//! - `color`: Grayscale conversion and channel-layout normalization
//! - `enhancement`: CLAHE, non-local-means denoising and sharpening
//! - `deskewing`: Skew estimation and rotation correction
//! - `thresholding`: Otsu and adaptive Gaussian thresholding
//! - `background`: Adaptive binarization with morphological cleanup
//! - `cropping`: Content-bounded auto-cropping
//! - `filtering`: Convolution kernels and morphological operations
//! - `types`: Stage configurations and result types

pub mod background;
pub mod color;
pub mod cropping;
pub mod deskewing;
pub mod enhancement;
pub mod filtering;
pub mod thresholding;
pub mod types;

// Re-export commonly used types and functions for convenience
pub use types::{
    BackgroundConfig, CropConfig, CropResult, DeskewConfig, DeskewResult, EnhanceConfig,
    Interpolation, ThresholdedImageResult,
};

pub use background::remove_background;
pub use color::{image_from_raw, normalize_layout, to_grayscale};
pub use cropping::auto_crop;
pub use deskewing::{deskew, estimate_skew_angle, rotate_about_center, BorderMode};
pub use enhancement::enhance;
pub use filtering::{apply_morphological_operation, MorphologicalOperation};
pub use thresholding::{adaptive_gaussian_threshold, apply_otsu_threshold, otsu_threshold};
