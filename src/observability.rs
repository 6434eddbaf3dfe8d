//! Observability setup for the pipeline.
//!
//! This module provides:
//! - Structured logging with configurable levels and formats
//! - An optional per-run log file
//! - Tracing span helpers for documents and stages
//! - Metric recording helpers (the caller installs any exporter)

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::{Mutex, MutexGuard};
use tracing_subscriber::fmt::writer::MakeWriter;
use tracing_subscriber::fmt::{self, format};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use crate::observability_config::{LogFormat, ObservabilityConfig};

/// Name of the per-run log file for a given local timestamp.
pub fn log_file_name(timestamp: chrono::DateTime<chrono::Local>) -> String {
    format!("processing_{}.log", timestamp.format("%Y%m%d_%H%M%S"))
}

/// Creates the log directory and opens a fresh timestamped log file in it.
pub fn create_log_file(log_dir: &Path) -> Result<(PathBuf, File)> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("cannot create log directory {}", log_dir.display()))?;
    let path = log_dir.join(log_file_name(chrono::Local::now()));
    let file = File::create(&path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    Ok((path, file))
}

/// Shared log file handed to the file layer.
pub struct LogFileWriter(Mutex<File>);

impl LogFileWriter {
    pub fn new(file: File) -> Self {
        Self(Mutex::new(file))
    }
}

/// Holds the file lock while one event is written.
pub struct LogFileGuard<'a>(MutexGuard<'a, File>);

impl Write for LogFileGuard<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<'a> MakeWriter<'a> for LogFileWriter {
    type Writer = LogFileGuard<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LogFileGuard(self.0.lock())
    }
}

fn file_layer<S>(
    file: Option<File>,
) -> Option<fmt::Layer<S, format::DefaultFields, format::Format, LogFileWriter>>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    file.map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(LogFileWriter::new(file))
    })
}

/// Filter directives for the subscriber.
///
/// A non-empty `RUST_LOG` is used as given. Otherwise the crate logs at the
/// configured level and every other target at `error`.
pub fn filter_directives(rust_log: Option<&str>, log_level: &str) -> String {
    match rust_log.map(str::trim).filter(|directives| !directives.is_empty()) {
        Some(directives) => directives.to_string(),
        None => format!("error,scanprep={}", log_level),
    }
}

/// Initialize structured logging with tracing and configuration.
///
/// Returns the path of the log file when `log_dir` is configured.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<Option<PathBuf>> {
    config.validate().map_err(anyhow::Error::msg)?;

    let rust_log = std::env::var("RUST_LOG").ok();
    let directives = filter_directives(rust_log.as_deref(), &config.log_level);
    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("invalid log filter: {}", directives))?;

    let (log_path, log_file) = match &config.log_dir {
        Some(dir) => {
            let (path, file) = create_log_file(dir)?;
            (Some(path), Some(file))
        }
        None => (None, None),
    };

    match config.effective_format() {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_thread_names(false),
                )
                .with(file_layer(log_file))
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_thread_names(true),
                )
                .with(file_layer(log_file))
                .try_init()?;
        }
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        log_file = ?log_path,
        "Tracing initialized with structured logging"
    );
    Ok(log_path)
}

/// Create a span covering the processing of one document
pub fn document_span(path: &Path) -> tracing::Span {
    tracing::info_span!("document", path = %path.display(), component = "pipeline")
}

/// Create a span for a single preprocessing stage
pub fn stage_span(stage: &'static str) -> tracing::Span {
    tracing::debug_span!("stage", stage = stage, component = "preprocessing")
}

/// Record the duration of a pipeline stage
pub fn record_stage_duration(stage: &'static str, duration: Duration) {
    metrics::histogram!("scanprep_stage_duration_seconds", "stage" => stage)
        .record(duration.as_secs_f64());
}

/// Record a finished document and its total processing time
pub fn record_document(success: bool, duration: Duration) {
    metrics::counter!("scanprep_documents_total", "result" => if success { "success" } else { "failure" })
        .increment(1);
    metrics::histogram!("scanprep_document_duration_seconds").record(duration.as_secs_f64());
}

/// Record one OCR hand-off
pub fn record_ocr_pass(engine: &str, success: bool) {
    metrics::counter!(
        "scanprep_ocr_passes_total",
        "engine" => engine.to_string(),
        "result" => if success { "success" } else { "failure" }
    )
    .increment(1);
}

/// Record the number of regions found in a document
pub fn record_regions(count: usize) {
    metrics::histogram!("scanprep_regions_per_document").record(count as f64);
}
