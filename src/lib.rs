//! # scanprep
//!
//! Preprocessing and region segmentation of scanned or photographed document
//! images ahead of text recognition: contrast enhancement, skew correction,
//! content-bounded cropping, adaptive binarization and contour-based region
//! detection, composed by a pipeline that hands the result to an OCR engine.

pub mod batch;
pub mod config;
pub mod errors;
pub mod geometry;
pub mod input;
pub mod observability;
pub mod observability_config;
pub mod ocr;
pub mod ocr_config;
pub mod output;
pub mod pipeline;
pub mod preprocessing;
pub mod regions;
pub mod viewer;

// Re-export types for easier access
pub use config::PipelineConfig;
pub use errors::{PipelineError, PipelineResult};
pub use geometry::{Contour, Rect};
pub use ocr::{OcrEngine, StaticTextEngine};
pub use pipeline::{DocumentPipeline, DocumentReport, ProcessedDocument};
pub use regions::{ContourDetector, RegionConfig, Roi};
pub use viewer::{ViewerCommand, ViewerState};
