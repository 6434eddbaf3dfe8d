//! # Batch Tests
//!
//! Concurrent processing of a directory with mixed good and bad inputs.

mod test_helpers;

#[cfg(test)]
mod tests {
    use crate::test_helpers::{canvas_with_square, write_image, SharedEngine};
    use parking_lot::Mutex;
    use scanprep::batch::{process_directory, process_paths};
    use scanprep::{DocumentPipeline, PipelineConfig};
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn pipeline_with(text: &str, max_workers: usize) -> (Arc<DocumentPipeline>, Arc<scanprep::StaticTextEngine>) {
        let (engine, handle) = SharedEngine::new(text);
        let config = PipelineConfig {
            max_workers: Some(max_workers),
            ..Default::default()
        };
        let pipeline = DocumentPipeline::new(config, Box::new(engine)).unwrap();
        (Arc::new(pipeline), handle)
    }

    #[tokio::test]
    async fn test_directory_with_one_broken_file() {
        let dir = TempDir::new().unwrap();
        for (i, name) in ["a.png", "b.png"].iter().enumerate() {
            let square = canvas_with_square(120, 90, (20 + i as u32 * 10, 20, 40));
            write_image(dir.path(), name, &square);
        }
        std::fs::File::create(dir.path().join("c.png"))
            .unwrap()
            .write_all(b"not an image")
            .unwrap();
        std::fs::File::create(dir.path().join("readme.txt")).unwrap();

        let (pipeline, handle) = pipeline_with("line", 2);
        let seen = Arc::new(Mutex::new(Vec::<PathBuf>::new()));
        let seen_in_callback = seen.clone();

        let summary = process_directory(pipeline, dir.path(), move |processed| {
            seen_in_callback.lock().push(processed.report.source.clone());
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(summary.total(), 3);
        assert_eq!(summary.succeeded.len(), 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].path, dir.path().join("c.png"));
        assert!(summary.failed[0].error.contains("[INPUT]"));
        assert_eq!(summary.succeeded[0].source, dir.path().join("a.png"));
        assert_eq!(handle.calls(), 2);
        assert_eq!(seen.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_callback_error_marks_document_failed() {
        let dir = TempDir::new().unwrap();
        let path = write_image(dir.path(), "page.png", &canvas_with_square(100, 80, (30, 20, 40)));

        let (pipeline, _handle) = pipeline_with("text", 1);
        let summary = process_paths(pipeline, vec![path.clone()], |_| {
            Err(scanprep::PipelineError::Input("disk full".to_string()))
        })
        .await;

        assert!(summary.succeeded.is_empty());
        assert_eq!(summary.failed[0].path, path);
        assert!(summary.failed[0].error.contains("disk full"));
    }

    #[tokio::test]
    async fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let (pipeline, handle) = pipeline_with("text", 4);
        let summary = process_directory(pipeline, dir.path(), |_| Ok(())).await.unwrap();
        assert_eq!(summary.total(), 0);
        assert!(summary.all_succeeded());
        assert_eq!(handle.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_directory_is_error() {
        let (pipeline, _handle) = pipeline_with("text", 1);
        let result = process_directory(pipeline, std::path::Path::new("/no/such/dir"), |_| Ok(())).await;
        assert!(result.unwrap_err().is_input());
    }
}
