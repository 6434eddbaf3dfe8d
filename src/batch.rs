//! # Batch Processing
//!
//! Runs many documents concurrently. Each document is processed on the
//! blocking thread pool; a semaphore bounds how many run at once. A failing
//! document is logged and recorded without affecting the others.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::errors::PipelineError;
use crate::input::is_supported_image;
use crate::pipeline::{DocumentPipeline, DocumentReport, ProcessedDocument};

/// A document that could not be processed.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of a batch run, sorted by path.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<DocumentReport>,
    pub failed: Vec<BatchFailure>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Number of concurrent documents: `max_workers` or the available parallelism.
pub fn worker_count(max_workers: Option<usize>) -> usize {
    max_workers
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
        .max(1)
}

/// Lists the supported image files directly inside `dir`, sorted by path.
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        PipelineError::Input(format!("cannot read directory {}: {}", dir.display(), e))
    })?;

    let mut images = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && is_supported_image(&path) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// Processes every supported image in a directory.
pub async fn process_directory<F>(
    pipeline: Arc<DocumentPipeline>,
    dir: &Path,
    on_document: F,
) -> Result<BatchSummary, PipelineError>
where
    F: Fn(&ProcessedDocument) -> Result<(), PipelineError> + Send + Sync + 'static,
{
    let paths = collect_images(dir)?;
    info!(directory = %dir.display(), documents = paths.len(), "Starting batch");
    Ok(process_paths(pipeline, paths, on_document).await)
}

/// Processes the given documents concurrently.
///
/// `on_document` runs on the worker thread after a document succeeds; its
/// error marks the document as failed.
pub async fn process_paths<F>(
    pipeline: Arc<DocumentPipeline>,
    paths: Vec<PathBuf>,
    on_document: F,
) -> BatchSummary
where
    F: Fn(&ProcessedDocument) -> Result<(), PipelineError> + Send + Sync + 'static,
{
    let workers = worker_count(pipeline.config().max_workers);
    let semaphore = Arc::new(Semaphore::new(workers));
    let summary = Arc::new(Mutex::new(BatchSummary::default()));
    let on_document = Arc::new(on_document);
    let mut handles = Vec::with_capacity(paths.len());

    for path in paths {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!(error = %e, "Worker semaphore closed");
                break;
            }
        };

        let pipeline = pipeline.clone();
        let summary = summary.clone();
        let on_document = on_document.clone();
        let task_path = path.clone();

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let outcome = pipeline.process(&task_path).and_then(|processed| {
                on_document(&processed)?;
                Ok(processed.report)
            });

            let mut summary = summary.lock();
            match outcome {
                Ok(report) => summary.succeeded.push(report),
                Err(e) => {
                    warn!(document = %task_path.display(), error = %e, "Document failed");
                    summary.failed.push(BatchFailure {
                        path: task_path,
                        error: e.to_string(),
                    });
                }
            }
        });
        handles.push((path, handle));
    }

    for (path, handle) in handles {
        if let Err(e) = handle.await {
            error!(document = %path.display(), error = %e, "Worker task did not complete");
            summary.lock().failed.push(BatchFailure {
                path,
                error: format!("worker task did not complete: {}", e),
            });
        }
    }

    let mut summary = std::mem::take(&mut *summary.lock());
    summary.succeeded.sort_by(|a, b| a.source.cmp(&b.source));
    summary.failed.sort_by(|a, b| a.path.cmp(&b.path));

    info!(
        workers,
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        "Batch completed"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_worker_count() {
        assert_eq!(worker_count(Some(3)), 3);
        assert_eq!(worker_count(Some(0)), 1);
        assert!(worker_count(None) >= 1);
    }

    #[test]
    fn test_collect_images_filters_and_sorts() {
        let dir = tempfile::TempDir::new().unwrap();
        for name in ["b.png", "a.JPG", "notes.txt", "c.tiff"] {
            File::create(dir.path().join(name)).unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let images = collect_images(dir.path()).unwrap();
        let names: Vec<String> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.png", "c.tiff"]);
    }

    #[test]
    fn test_collect_images_missing_directory() {
        assert!(collect_images(Path::new("/no/such/dir"))
            .unwrap_err()
            .is_input());
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = BatchSummary::default();
        assert!(summary.all_succeeded());
        summary.failed.push(BatchFailure {
            path: PathBuf::from("x.png"),
            error: "[INPUT] broken".to_string(),
        });
        assert_eq!(summary.total(), 1);
        assert!(!summary.all_succeeded());
    }
}
