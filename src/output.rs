//! Writes per-document artifacts: the JSON report, the preprocessed image and
//! optionally the region crops and an annotated overlay.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::PipelineError;
use crate::pipeline::ProcessedDocument;
use crate::regions::{annotate_regions, save_regions};

/// Which artifacts to write and where.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub output_dir: PathBuf,
    /// Write every region as `<stem>_regions/roi_{i}.png`
    pub save_regions: bool,
    /// Write `<stem>_annotated.png` with region outlines
    pub annotate: bool,
}

impl OutputOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            save_regions: false,
            annotate: false,
        }
    }
}

fn document_stem(source: &Path) -> String {
    source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// Writes the artifacts of one document and returns the written paths.
pub fn write_document_outputs(
    processed: &ProcessedDocument,
    options: &OutputOptions,
) -> Result<Vec<PathBuf>, PipelineError> {
    std::fs::create_dir_all(&options.output_dir)?;
    let stem = document_stem(&processed.report.source);
    let mut written = Vec::new();

    let report_path = options.output_dir.join(format!("{}.json", stem));
    let json = serde_json::to_string_pretty(&processed.report)
        .map_err(|e| PipelineError::Input(format!("cannot serialize report: {}", e)))?;
    std::fs::write(&report_path, json)?;
    written.push(report_path);

    let preprocessed_path = options.output_dir.join(format!("{}_preprocessed.png", stem));
    processed.preprocessed.save(&preprocessed_path)?;
    written.push(preprocessed_path);

    if options.save_regions {
        let regions_dir = options.output_dir.join(format!("{}_regions", stem));
        written.extend(save_regions(&processed.regions, &regions_dir)?);
    }

    if options.annotate {
        let annotated_path = options.output_dir.join(format!("{}_annotated.png", stem));
        annotate_regions(&processed.original, &processed.regions).save(&annotated_path)?;
        written.push(annotated_path);
    }

    info!(
        document = %processed.report.source.display(),
        files = written.len(),
        "Wrote document outputs"
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::pipeline::DocumentReport;
    use crate::regions::Roi;
    use image::{DynamicImage, GrayImage, Luma};

    fn processed() -> ProcessedDocument {
        let original = DynamicImage::ImageLuma8(GrayImage::from_pixel(20, 10, Luma([200])));
        let roi = Roi {
            rect: Rect::new(2, 2, 5, 5),
            image: original.crop_imm(2, 2, 5, 5),
        };
        ProcessedDocument {
            report: DocumentReport {
                source: PathBuf::from("scans/page_1.png"),
                regions: vec![roi.rect],
                text: "Total 12".to_string(),
                ocr_passes: 1,
                processing_time_ms: 3,
            },
            preprocessed: GrayImage::from_pixel(20, 10, Luma([255])),
            original,
            regions: vec![roi],
        }
    }

    #[test]
    fn test_document_stem() {
        assert_eq!(document_stem(Path::new("a/b/scan.tiff")), "scan");
        assert_eq!(document_stem(Path::new("")), "document");
    }

    #[test]
    fn test_writes_report_and_preprocessed_image() {
        let dir = tempfile::TempDir::new().unwrap();
        let written = write_document_outputs(&processed(), &OutputOptions::new(dir.path())).unwrap();

        assert_eq!(written.len(), 2);
        let report = std::fs::read_to_string(dir.path().join("page_1.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(value["text"], "Total 12");
        assert_eq!(value["regions"][0]["width"], 5);
        assert!(dir.path().join("page_1_preprocessed.png").exists());
    }

    #[test]
    fn test_optional_artifacts() {
        let dir = tempfile::TempDir::new().unwrap();
        let options = OutputOptions {
            save_regions: true,
            annotate: true,
            ..OutputOptions::new(dir.path())
        };
        let written = write_document_outputs(&processed(), &options).unwrap();

        assert_eq!(written.len(), 4);
        assert!(dir.path().join("page_1_regions").join("roi_0.png").exists());
        assert!(dir.path().join("page_1_annotated.png").exists());
    }
}
