//! # OCR Configuration Module
//!
//! This module defines configuration structures for the OCR hand-off and for
//! input validation, including per-format file size limits.

use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;

// Constants for OCR configuration
pub const DEFAULT_LANGUAGES: &str = "eng";
pub const FORMAT_DETECTION_BUFFER_SIZE: usize = 32;
pub const MIN_FORMAT_BYTES: usize = 8;
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB limit for image files

/// Format-specific file size limits for different image formats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatSizeLimits {
    /// PNG format limit (higher due to better compression)
    pub png_max: u64,
    /// JPEG format limit (moderate due to lossy compression)
    pub jpeg_max: u64,
    /// BMP format limit (lower due to uncompressed nature)
    pub bmp_max: u64,
    /// TIFF format limit (scanner output is often large)
    pub tiff_max: u64,
    /// Any file above this size is rejected before format detection
    pub quick_reject: u64,
}

impl Default for FormatSizeLimits {
    fn default() -> Self {
        Self {
            png_max: 15 * 1024 * 1024,      // 15MB for PNG
            jpeg_max: 10 * 1024 * 1024,     // 10MB for JPEG
            bmp_max: 5 * 1024 * 1024,       // 5MB for BMP
            tiff_max: 20 * 1024 * 1024,     // 20MB for TIFF
            quick_reject: 50 * 1024 * 1024, // 50MB quick reject
        }
    }
}

impl FormatSizeLimits {
    /// Validate format size limits
    pub fn validate(&self) -> Result<(), PipelineError> {
        for (name, value) in [
            ("png_max", self.png_max),
            ("jpeg_max", self.jpeg_max),
            ("bmp_max", self.bmp_max),
            ("tiff_max", self.tiff_max),
            ("quick_reject", self.quick_reject),
        ] {
            if value == 0 {
                return Err(PipelineError::Config(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }

        // Ensure format limits are reasonable compared to each other
        if self.bmp_max > self.png_max {
            return Err(PipelineError::Config(format!(
                "bmp_max ({}) should not exceed png_max ({})",
                self.bmp_max, self.png_max
            )));
        }
        if self.jpeg_max > self.png_max {
            return Err(PipelineError::Config(format!(
                "jpeg_max ({}) should not exceed png_max ({})",
                self.jpeg_max, self.png_max
            )));
        }

        Ok(())
    }

    /// Limit that applies to a detected format, if it has a dedicated one.
    pub fn limit_for(&self, format: image::ImageFormat) -> Option<u64> {
        match format {
            image::ImageFormat::Png => Some(self.png_max),
            image::ImageFormat::Jpeg => Some(self.jpeg_max),
            image::ImageFormat::Bmp => Some(self.bmp_max),
            image::ImageFormat::Tiff => Some(self.tiff_max),
            _ => None,
        }
    }
}

/// Page Segmentation Mode for Tesseract OCR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSegMode {
    /// Fully automatic page segmentation
    #[default]
    Auto,
    /// Assume a single column of text
    SingleColumn,
    /// Assume a single uniform block of text
    SingleBlock,
    /// Treat the image as a single text line
    SingleLine,
    /// Find as much text as possible in no particular order
    SparseText,
}

impl PageSegMode {
    /// Convert PSM mode to string value for Tesseract
    pub fn as_str(&self) -> &'static str {
        match self {
            PageSegMode::Auto => "3",
            PageSegMode::SingleColumn => "4",
            PageSegMode::SingleBlock => "6",
            PageSegMode::SingleLine => "7",
            PageSegMode::SparseText => "11",
        }
    }
}

/// Configuration structure for OCR processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// OCR language codes (e.g., "eng", "eng+fra", "deu")
    pub languages: String,
    /// Explicit tessdata directory; the engine default is used when unset
    pub tessdata_path: Option<String>,
    /// Page segmentation mode
    pub psm_mode: PageSegMode,
    /// Buffer size for format detection in bytes
    pub buffer_size: usize,
    /// Minimum bytes required for format detection
    pub min_format_bytes: usize,
    /// Maximum allowed file size in bytes (general limit)
    pub max_file_size: u64,
    /// Format-specific size limits
    pub format_limits: FormatSizeLimits,
    /// Character whitelist passed to the engine
    pub character_whitelist: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: DEFAULT_LANGUAGES.to_string(),
            tessdata_path: None,
            psm_mode: PageSegMode::default(),
            buffer_size: FORMAT_DETECTION_BUFFER_SIZE,
            min_format_bytes: MIN_FORMAT_BYTES,
            max_file_size: MAX_FILE_SIZE,
            format_limits: FormatSizeLimits::default(),
            character_whitelist: None,
        }
    }
}

impl OcrConfig {
    /// Validate OCR configuration parameters
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.languages.trim().is_empty() {
            return Err(PipelineError::Config(
                "languages cannot be empty".to_string(),
            ));
        }

        // Validate buffer sizes
        if self.buffer_size == 0 {
            return Err(PipelineError::Config(
                "buffer_size must be greater than 0".to_string(),
            ));
        }
        if self.min_format_bytes == 0 {
            return Err(PipelineError::Config(
                "min_format_bytes must be greater than 0".to_string(),
            ));
        }
        if self.min_format_bytes > self.buffer_size {
            return Err(PipelineError::Config(format!(
                "min_format_bytes ({}) cannot exceed buffer_size ({})",
                self.min_format_bytes, self.buffer_size
            )));
        }

        if self.max_file_size == 0 {
            return Err(PipelineError::Config(
                "max_file_size must be greater than 0".to_string(),
            ));
        }

        self.format_limits.validate()?;

        Ok(())
    }
}
