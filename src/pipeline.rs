//! # Document Pipeline
//!
//! Composes the preprocessing stages in their fixed order and hands the
//! result to an [`OcrEngine`]. Region detection runs on the original image as
//! an independent capability; its regions are reported but not fed to OCR.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use image::{DynamicImage, GrayImage};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::errors::{error_logging, PipelineError};
use crate::geometry::Rect;
use crate::input::load_validated_image;
use crate::observability;
use crate::ocr::OcrEngine;
use crate::preprocessing::{auto_crop, deskew, enhance, remove_background};
use crate::regions::{ContourDetector, Roi};

/// Identifier used for in-memory images in error context.
const IN_MEMORY_DOCUMENT: &str = "<memory>";

/// Summary of one processed document, written as JSON by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentReport {
    pub source: PathBuf,
    /// Regions detected on the original image
    pub regions: Vec<Rect>,
    /// Recognized text, one entry per non-empty OCR pass joined by `\n`
    pub text: String,
    /// Number of whole-image OCR passes run (1 or 2)
    pub ocr_passes: u32,
    pub processing_time_ms: u32,
}

/// Everything produced for a document, for callers that persist artifacts.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub report: DocumentReport,
    pub original: DynamicImage,
    pub preprocessed: GrayImage,
    pub regions: Vec<Roi>,
}

/// Tracks the optional per-document deadline.
struct Deadline {
    start: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    fn new(limit_secs: Option<u64>) -> Self {
        Self {
            start: Instant::now(),
            limit: limit_secs.map(Duration::from_secs),
        }
    }

    /// Fails when the deadline elapsed before `stage` could start.
    fn check(&self, stage: &'static str) -> Result<(), PipelineError> {
        let Some(limit) = self.limit else {
            return Ok(());
        };
        let elapsed = self.start.elapsed();
        if elapsed > limit {
            return Err(PipelineError::DeadlineExceeded {
                stage,
                elapsed_ms: elapsed.as_millis() as u64,
                limit_ms: limit.as_millis() as u64,
            });
        }
        Ok(())
    }
}

/// Runs a stage, recording its duration and annotating failures.
fn run_stage<T>(
    stage: &'static str,
    document: &str,
    deadline: &Deadline,
    f: impl FnOnce() -> Result<T, PipelineError>,
) -> Result<T, PipelineError> {
    deadline.check(stage)?;
    let _span = observability::stage_span(stage).entered();
    let started = Instant::now();
    let result = f().map_err(|e| e.in_stage(stage, document));
    observability::record_stage_duration(stage, started.elapsed());
    result
}

/// Document preprocessing and OCR orchestrator.
pub struct DocumentPipeline {
    config: PipelineConfig,
    detector: ContourDetector,
    engine: Box<dyn OcrEngine>,
    preprocess_runs: AtomicU32,
}

impl DocumentPipeline {
    /// Creates a pipeline after validating the configuration.
    pub fn new(config: PipelineConfig, engine: Box<dyn OcrEngine>) -> Result<Self, PipelineError> {
        config.validate()?;
        let detector = ContourDetector::from_config(&config.regions)?;
        info!(engine = engine.name(), "{}", config.summary());
        Ok(Self {
            config,
            detector,
            engine,
            preprocess_runs: AtomicU32::new(0),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn detector(&self) -> &ContourDetector {
        &self.detector
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Number of preprocessing chains started since the pipeline was built.
    pub fn preprocess_runs(&self) -> u32 {
        self.preprocess_runs.load(Ordering::Relaxed)
    }

    /// enhance → deskew → auto-crop → background removal.
    pub fn preprocess(&self, image: &DynamicImage) -> Result<GrayImage, PipelineError> {
        let deadline = Deadline::new(self.config.deadline_secs);
        self.preprocess_with(image, IN_MEMORY_DOCUMENT, &deadline)
    }

    fn preprocess_with(
        &self,
        image: &DynamicImage,
        document: &str,
        deadline: &Deadline,
    ) -> Result<GrayImage, PipelineError> {
        self.preprocess_runs.fetch_add(1, Ordering::Relaxed);
        let enhanced = run_stage("enhance", document, deadline, || {
            enhance(image, &self.config.enhance)
        })?;
        let enhanced = DynamicImage::ImageLuma8(enhanced);

        let deskewed = run_stage("deskew", document, deadline, || {
            deskew(&enhanced, &self.config.deskew)
        })?;
        debug!(
            document = %document,
            skew_angle = ?deskewed.skew_angle_degrees,
            rotated = deskewed.rotated,
            "Deskew stage finished"
        );

        let cropped = run_stage("crop", document, deadline, || {
            auto_crop(&deskewed.image, &self.config.crop)
        })?;

        run_stage("background", document, deadline, || {
            remove_background(&cropped.image, &self.config.background)
        })
    }

    /// Loads a document, preprocesses it and returns the recognized text.
    pub fn recognize(&self, path: &Path) -> Result<String, PipelineError> {
        let document = path.display().to_string();
        let deadline = Deadline::new(self.config.deadline_secs);
        let image = run_stage("load", &document, &deadline, || {
            load_validated_image(path, &self.config.ocr)
        })?;
        let preprocessed = self.preprocess_with(&image, &document, &deadline)?;
        self.ocr_pass(&preprocessed, &document, &deadline, 1)
    }

    fn ocr_pass(
        &self,
        image: &GrayImage,
        document: &str,
        deadline: &Deadline,
        pass: u32,
    ) -> Result<String, PipelineError> {
        let result = run_stage("ocr", document, deadline, || self.engine.recognize(image));
        observability::record_ocr_pass(self.engine.name(), result.is_ok());
        if let Err(e) = &result {
            error_logging::log_engine_error(e, self.engine.name(), document, pass);
        }
        result
    }

    /// Recognizes each region separately using the same preprocessing.
    pub fn recognize_regions(&self, rois: &[Roi]) -> Result<Vec<String>, PipelineError> {
        let deadline = Deadline::new(self.config.deadline_secs);
        rois.iter()
            .enumerate()
            .map(|(i, roi)| {
                let document = format!("region {} at {:?}", i, roi.rect);
                let preprocessed = self.preprocess_with(&roi.image, &document, &deadline)?;
                self.ocr_pass(&preprocessed, &document, &deadline, 1)
            })
            .collect()
    }

    /// Runs the full document flow and returns the report.
    pub fn process_document(&self, path: &Path) -> Result<DocumentReport, PipelineError> {
        self.process(path).map(|processed| processed.report)
    }

    /// Runs the full document flow and keeps the intermediate images.
    ///
    /// Region detection runs on the original image. The whole image is then
    /// preprocessed and recognized; an empty result triggers one more full
    /// pass that reloads, preprocesses and recognizes the file again.
    pub fn process(&self, path: &Path) -> Result<ProcessedDocument, PipelineError> {
        let span = observability::document_span(path);
        let _guard = span.enter();
        let start_time = Instant::now();
        let document = path.display().to_string();

        let result = self.process_inner(path, &document, start_time);
        let elapsed = start_time.elapsed();
        observability::record_document(result.is_ok(), elapsed);

        if let Err(e) = &result {
            error_logging::log_stage_error(e, e.stage().unwrap_or("unknown"), &document, Some(elapsed));
        }
        result
    }

    fn process_inner(
        &self,
        path: &Path,
        document: &str,
        start_time: Instant,
    ) -> Result<ProcessedDocument, PipelineError> {
        let deadline = Deadline {
            start: start_time,
            limit: self.config.deadline_secs.map(Duration::from_secs),
        };

        let original = run_stage("load", document, &deadline, || {
            load_validated_image(path, &self.config.ocr)
        })?;

        let regions = run_stage("regions", document, &deadline, || {
            self.detector.detect_regions(&original)
        })?;
        observability::record_regions(regions.len());
        info!(document = %document, regions = regions.len(), "Found regions of interest");

        let mut preprocessed = self.preprocess_with(&original, document, &deadline)?;

        let mut texts = Vec::new();
        let mut ocr_passes = 1;
        let text = self.ocr_pass(&preprocessed, document, &deadline, ocr_passes)?;
        if !text.is_empty() {
            texts.push(text);
        }

        if texts.is_empty() {
            warn!(document = %document, "No text recognized, running a second pass");
            ocr_passes += 1;
            let reloaded = run_stage("load", document, &deadline, || {
                load_validated_image(path, &self.config.ocr)
            })?;
            preprocessed = self.preprocess_with(&reloaded, document, &deadline)?;
            texts.push(self.ocr_pass(&preprocessed, document, &deadline, ocr_passes)?);
        }

        let processing_time_ms = start_time.elapsed().as_millis() as u32;
        let report = DocumentReport {
            source: path.to_path_buf(),
            regions: regions.iter().map(|roi| roi.rect).collect(),
            text: texts.join("\n"),
            ocr_passes,
            processing_time_ms,
        };

        info!(
            document = %document,
            ocr_passes,
            text_chars = report.text.chars().count(),
            duration_ms = processing_time_ms,
            "Document processing completed"
        );

        Ok(ProcessedDocument {
            report,
            original,
            preprocessed,
            regions,
        })
    }
}
