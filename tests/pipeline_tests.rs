//! # Pipeline Tests
//!
//! Whole-document flow: region detection, preprocessing, the OCR hand-off
//! and the second pass on empty results.

mod test_helpers;

#[cfg(test)]
mod tests {
    use crate::test_helpers::{
        assert_near, canvas_with_square, write_image, FailingEngine, SharedEngine,
    };
    use scanprep::output::{write_document_outputs, OutputOptions};
    use scanprep::{DocumentPipeline, PipelineConfig, StaticTextEngine};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Small page keeps the denoising stage fast in debug builds
    fn page_on_disk(dir: &TempDir) -> PathBuf {
        write_image(dir.path(), "page.png", &canvas_with_square(200, 150, (50, 40, 60)))
    }

    #[test]
    fn test_process_document_single_pass() {
        let dir = TempDir::new().unwrap();
        let path = page_on_disk(&dir);
        let (engine, handle) = SharedEngine::new("  Invoice 42 \n\n Total 10.00 ");
        let pipeline = DocumentPipeline::new(PipelineConfig::default(), Box::new(engine)).unwrap();

        let report = pipeline.process_document(&path).unwrap();

        assert_eq!(report.text, "Invoice 42\nTotal 10.00");
        assert_eq!(report.ocr_passes, 1);
        assert_eq!(handle.calls(), 1);
        assert_eq!(pipeline.preprocess_runs(), 1);
        assert_eq!(report.source, path);
        assert_eq!(report.regions.len(), 1);
        assert_near(report.regions[0].x, 50, 2, "region x");
        assert_near(report.regions[0].width, 60, 2, "region width");
    }

    #[test]
    fn test_empty_text_triggers_second_pass() {
        let dir = TempDir::new().unwrap();
        let path = page_on_disk(&dir);
        let (engine, handle) = SharedEngine::new("   ");
        let pipeline = DocumentPipeline::new(PipelineConfig::default(), Box::new(engine)).unwrap();

        let report = pipeline.process_document(&path).unwrap();

        assert_eq!(report.ocr_passes, 2);
        assert_eq!(handle.calls(), 2);
        // The retry reloads and preprocesses the file from scratch
        assert_eq!(pipeline.preprocess_runs(), 2);
        assert_eq!(report.text, "");
    }

    #[test]
    fn test_missing_file_fails_before_ocr() {
        let (engine, handle) = SharedEngine::new("text");
        let pipeline = DocumentPipeline::new(PipelineConfig::default(), Box::new(engine)).unwrap();

        let err = pipeline
            .process_document(Path::new("/no/such/scan.png"))
            .unwrap_err();

        assert!(err.is_input());
        assert_eq!(err.stage(), Some("load"));
        assert!(err.to_string().contains("/no/such/scan.png"));
        assert_eq!(handle.calls(), 0);
    }

    #[test]
    fn test_engine_failure_is_reported_with_stage() {
        let dir = TempDir::new().unwrap();
        let path = page_on_disk(&dir);
        let pipeline = DocumentPipeline::new(PipelineConfig::default(), Box::new(FailingEngine)).unwrap();

        let err = pipeline.process_document(&path).unwrap_err();
        assert!(err.is_engine());
        assert_eq!(err.stage(), Some("ocr"));
    }

    #[test]
    fn test_recognize_and_regions() {
        let dir = TempDir::new().unwrap();
        let path = page_on_disk(&dir);
        let (engine, handle) = SharedEngine::new("hello");
        let pipeline = DocumentPipeline::new(PipelineConfig::default(), Box::new(engine)).unwrap();

        assert_eq!(pipeline.recognize(&path).unwrap(), "hello");
        assert_eq!(handle.calls(), 1);

        let image = image::open(&path).unwrap();
        let rois = pipeline.detector().detect_regions(&image).unwrap();
        let texts = pipeline.recognize_regions(&rois).unwrap();
        assert_eq!(texts, vec!["hello".to_string(); rois.len()]);
        assert_eq!(handle.calls(), 1 + rois.len() as u32);
    }

    #[test]
    fn test_outputs_written_for_processed_document() {
        let dir = TempDir::new().unwrap();
        let path = page_on_disk(&dir);
        let pipeline = DocumentPipeline::new(
            PipelineConfig::default(),
            Box::new(StaticTextEngine::new("Total 3")),
        )
        .unwrap();

        let processed = pipeline.process(&path).unwrap();
        assert!(processed
            .preprocessed
            .pixels()
            .all(|p| p[0] == 0 || p[0] == 255));

        let out_dir = dir.path().join("output");
        let options = OutputOptions {
            annotate: true,
            ..OutputOptions::new(&out_dir)
        };
        write_document_outputs(&processed, &options).unwrap();

        let json = std::fs::read_to_string(out_dir.join("page.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["text"], "Total 3");
        assert_eq!(value["ocr_passes"], 1);
        assert!(out_dir.join("page_preprocessed.png").exists());
        assert!(out_dir.join("page_annotated.png").exists());
    }

    #[test]
    fn test_env_style_overrides_reach_detector() {
        let mut config = PipelineConfig::default();
        config
            .apply_overrides(|key| match key {
                "SCANPREP_MIN_AREA" => Some("5000".to_string()),
                _ => None,
            })
            .unwrap();
        let pipeline = DocumentPipeline::new(config, Box::new(StaticTextEngine::new(""))).unwrap();
        assert_eq!(pipeline.detector().min_area(), 5000.0);
    }
}
