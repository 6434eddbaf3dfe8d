//! # OCR Hand-off Module
//!
//! The pipeline treats text recognition as an external collaborator behind the
//! [`OcrEngine`] trait. Two engines ship with the crate:
//!
//! - [`StaticTextEngine`]: deterministic, in-process, used for dry runs and tests
//! - `TesseractEngine` (feature `tesseract`): Tesseract through `leptess`

use std::sync::atomic::{AtomicU32, Ordering};

use image::GrayImage;

use crate::errors::PipelineError;

/// Text recognition engine consuming a preprocessed single-channel image.
pub trait OcrEngine: Send + Sync {
    /// Short engine identifier used in logs and reports.
    fn name(&self) -> &str;

    /// Recognizes the text of an image.
    ///
    /// Engine-specific failures are reported as `PipelineError::Engine`.
    fn recognize(&self, image: &GrayImage) -> Result<String, PipelineError>;
}

/// Normalizes raw engine output: trims every line and drops blank lines.
pub fn clean_ocr_text(raw: &str) -> String {
    raw.trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Engine that always returns the same text and counts its invocations.
#[derive(Debug, Default)]
pub struct StaticTextEngine {
    text: String,
    calls: AtomicU32,
}

impl StaticTextEngine {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            calls: AtomicU32::new(0),
        }
    }

    /// Number of `recognize` calls so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for StaticTextEngine {
    fn name(&self) -> &str {
        "static"
    }

    fn recognize(&self, image: &GrayImage) -> Result<String, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if image.width() == 0 || image.height() == 0 {
            return Err(PipelineError::Engine(
                "cannot recognize an empty image".to_string(),
            ));
        }
        Ok(clean_ocr_text(&self.text))
    }
}

#[cfg(feature = "tesseract")]
pub use tesseract::TesseractEngine;

#[cfg(feature = "tesseract")]
mod tesseract {
    use std::io::Cursor;

    use image::GrayImage;
    use leptess::{LepTess, Variable};
    use parking_lot::Mutex;
    use tracing::info;

    use super::{clean_ocr_text, OcrEngine};
    use crate::errors::PipelineError;
    use crate::ocr_config::OcrConfig;

    /// Tesseract-backed engine. The underlying instance is not thread-safe,
    /// so calls are serialized through a mutex.
    pub struct TesseractEngine {
        tess: Mutex<LepTess>,
    }

    impl TesseractEngine {
        /// Initializes Tesseract with the configured languages, page
        /// segmentation mode and optional character whitelist.
        pub fn new(config: &OcrConfig) -> Result<Self, PipelineError> {
            let mut tess = LepTess::new(config.tessdata_path.as_deref(), &config.languages)
                .map_err(|e| {
                    PipelineError::Engine(format!(
                        "Failed to initialize Tesseract OCR instance: {}",
                        e
                    ))
                })?;

            tess.set_variable(Variable::TesseditPagesegMode, config.psm_mode.as_str())
                .map_err(|e| PipelineError::Engine(format!("Failed to set PSM mode: {}", e)))?;

            if let Some(whitelist) = &config.character_whitelist {
                tess.set_variable(Variable::TesseditCharWhitelist, whitelist)
                    .map_err(|e| {
                        PipelineError::Engine(format!("Failed to set character whitelist: {}", e))
                    })?;
            }

            info!(
                languages = %config.languages,
                psm = config.psm_mode.as_str(),
                "Created Tesseract OCR instance"
            );

            Ok(Self {
                tess: Mutex::new(tess),
            })
        }
    }

    impl OcrEngine for TesseractEngine {
        fn name(&self) -> &str {
            "tesseract"
        }

        fn recognize(&self, image: &GrayImage) -> Result<String, PipelineError> {
            // leptess expects encoded image data
            let mut png = Cursor::new(Vec::new());
            image
                .write_to(&mut png, image::ImageFormat::Png)
                .map_err(|e| {
                    PipelineError::Engine(format!("Failed to encode image to PNG: {}", e))
                })?;

            let mut tess = self.tess.lock();
            tess.set_image_from_mem(png.get_ref()).map_err(|e| {
                PipelineError::Engine(format!("Failed to load image for OCR: {}", e))
            })?;

            let text = tess.get_utf8_text().map_err(|e| {
                PipelineError::Engine(format!("Failed to extract text from image: {}", e))
            })?;

            Ok(clean_ocr_text(&text))
        }
    }
}
