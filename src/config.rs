//! # Pipeline Configuration
//!
//! This module gathers the configuration of every stage into a single
//! serializable [`PipelineConfig`]. It can be built from defaults, loaded from
//! a JSON file, or overridden from environment variables.

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;
use crate::ocr_config::OcrConfig;
use crate::preprocessing::{BackgroundConfig, CropConfig, DeskewConfig, EnhanceConfig};
use crate::regions::RegionConfig;

/// Unified pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Contrast, denoise and sharpen settings
    pub enhance: EnhanceConfig,
    /// Skew correction settings
    pub deskew: DeskewConfig,
    /// Adaptive binarization settings
    pub background: BackgroundConfig,
    /// Auto-crop padding
    pub crop: CropConfig,
    /// Region detector settings
    pub regions: RegionConfig,
    /// OCR hand-off and input validation settings
    pub ocr: OcrConfig,
    /// Per-document time budget in seconds, checked between stages
    pub deadline_secs: Option<u64>,
    /// Upper bound on concurrently processed documents
    pub max_workers: Option<usize>,
}

impl PipelineConfig {
    /// Load configuration from environment variables on top of the defaults.
    ///
    /// A `.env` file in the working directory is read first when present.
    pub fn from_env() -> Result<Self, PipelineError> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, PipelineError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            PipelineError::Config(format!("invalid config file {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from a key lookup (environment variables in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SCANPREP_MIN_AREA") {
            self.regions.min_area = parse_var("SCANPREP_MIN_AREA", &value)?;
        }
        if let Some(value) = lookup("SCANPREP_MAX_AREA") {
            self.regions.max_area = Some(parse_var("SCANPREP_MAX_AREA", &value)?);
        }
        if let Some(value) = lookup("SCANPREP_CROP_PADDING") {
            self.crop.padding = parse_var("SCANPREP_CROP_PADDING", &value)?;
        }
        if let Some(value) = lookup("SCANPREP_DEADLINE_SECS") {
            self.deadline_secs = Some(parse_var("SCANPREP_DEADLINE_SECS", &value)?);
        }
        if let Some(value) = lookup("SCANPREP_MAX_WORKERS") {
            self.max_workers = Some(parse_var("SCANPREP_MAX_WORKERS", &value)?);
        }
        if let Some(value) = lookup("OCR_LANGUAGES") {
            self.ocr.languages = value;
        }
        if let Some(value) = lookup("OCR_MAX_FILE_SIZE") {
            self.ocr.max_file_size = parse_var("OCR_MAX_FILE_SIZE", &value)?;
        }
        Ok(())
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.enhance.validate()?;
        self.background.validate()?;
        self.regions.validate()?;
        self.ocr.validate()?;

        if self.deadline_secs == Some(0) {
            return Err(PipelineError::Config(
                "deadline_secs must be greater than 0 when set".to_string(),
            ));
        }
        if self.max_workers == Some(0) {
            return Err(PipelineError::Config(
                "max_workers must be greater than 0 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: min_area={}, max_area={:?}, crop_padding={}, block_size={}, ocr_languages={}, deadline_secs={:?}, max_workers={:?}",
            self.regions.min_area,
            self.regions.max_area,
            self.crop.padding,
            self.background.block_size,
            self.ocr.languages,
            self.deadline_secs,
            self.max_workers
        )
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, PipelineError> {
    value
        .trim()
        .parse()
        .map_err(|_| PipelineError::Config(format!("{} must be a valid number (got '{}')", key, value)))
}
