//! # Input Loading and Validation
//!
//! Checks image files before decoding (existence, size, detected format) and
//! loads them into the normalized `Luma8`/`Rgb8` layouts used by the stages.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use image::DynamicImage;
use tracing::debug;

use crate::errors::PipelineError;
use crate::ocr_config::OcrConfig;
use crate::preprocessing::normalize_layout;

/// File extensions accepted when scanning directories.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

/// Whether a path has one of the [`SUPPORTED_EXTENSIONS`] (case-insensitive).
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Validates an image file with format-specific size limits.
///
/// Checks, in order: the path exists and is a regular file, it is not empty,
/// it is below the quick-reject threshold, and its size is within the limit
/// of the format detected from its leading bytes (or the general
/// `max_file_size` when the format is unknown).
///
/// # Errors
///
/// Every failure is a `PipelineError::Input`.
pub fn validate_image_file(path: &Path, config: &OcrConfig) -> Result<(), PipelineError> {
    let shown = path.display();

    if !path.exists() {
        return Err(PipelineError::Input(format!(
            "file does not exist ({})",
            shown
        )));
    }

    if !path.is_file() {
        return Err(PipelineError::Input(format!(
            "path is not a file ({})",
            shown
        )));
    }

    let file_size = path
        .metadata()
        .map_err(|e| {
            PipelineError::Input(format!("cannot read file metadata ({}) - {}", shown, e))
        })?
        .len();

    if file_size == 0 {
        return Err(PipelineError::Input(format!("file is empty ({})", shown)));
    }

    // Quick rejection for extremely large files
    if file_size > config.format_limits.quick_reject {
        return Err(PipelineError::Input(format!(
            "file too large for processing: {} bytes (exceeds quick reject threshold of {} bytes)",
            file_size, config.format_limits.quick_reject
        )));
    }

    let file = File::open(path)
        .map_err(|e| PipelineError::Input(format!("cannot open {}: {}", shown, e)))?;
    let mut reader = BufReader::new(file);
    let mut buffer = vec![0; config.buffer_size];
    let bytes_read = reader
        .read(&mut buffer)
        .map_err(|e| PipelineError::Input(format!("cannot read {}: {}", shown, e)))?;
    buffer.truncate(bytes_read);

    let detected = if bytes_read >= config.min_format_bytes {
        image::guess_format(&buffer).ok()
    } else {
        None
    };

    let limit = match detected.and_then(|format| config.format_limits.limit_for(format)) {
        Some(limit) => {
            debug!(
                path = %shown,
                format = ?detected,
                limit_bytes = limit,
                "Applying format-specific size limit"
            );
            limit
        }
        None => {
            debug!(path = %shown, "Format not detected, using general size limit");
            config.max_file_size
        }
    };

    if file_size > limit {
        return Err(PipelineError::Input(format!(
            "image file too large: {} bytes (maximum allowed for {:?}: {} bytes)",
            file_size, detected, limit
        )));
    }

    Ok(())
}

/// Loads an image and normalizes its layout to `Luma8` or `Rgb8`.
///
/// # Errors
///
/// Missing, unreadable or undecodable files are `PipelineError::Input`.
pub fn load_image(path: &Path) -> Result<DynamicImage, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::Input(format!(
            "image file not found: {}",
            path.display()
        )));
    }

    let image = image::open(path).map_err(|e| {
        PipelineError::Input(format!("failed to load image {}: {}", path.display(), e))
    })?;

    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::Input(format!(
            "image {} has no pixels",
            path.display()
        )));
    }

    Ok(normalize_layout(image))
}

/// Validates then loads an image file.
pub fn load_validated_image(path: &Path, config: &OcrConfig) -> Result<DynamicImage, PipelineError> {
    validate_image_file(path, config)?;
    load_image(path)
}
