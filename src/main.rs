use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use scanprep::batch;
use scanprep::config::PipelineConfig;
use scanprep::errors::error_logging;
use scanprep::observability;
use scanprep::observability_config::ObservabilityConfig;
use scanprep::ocr::{OcrEngine, StaticTextEngine};
use scanprep::output::{write_document_outputs, OutputOptions};
use scanprep::pipeline::DocumentPipeline;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EngineKind {
    /// Returns `--static-text` for every document (dry run)
    Static,
    /// Tesseract OCR (requires the `tesseract` feature)
    Tesseract,
}

#[derive(Parser)]
#[command(name = "scanprep")]
#[command(about = "Document image preprocessing and region segmentation ahead of OCR")]
#[command(version)]
struct Args {
    /// Image file or directory of images
    input: PathBuf,

    /// Directory for reports and processed images
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// OCR engine
    #[arg(long, value_enum, default_value_t = EngineKind::Static)]
    engine: EngineKind,

    /// Text returned by the static engine
    #[arg(long, default_value = "")]
    static_text: String,

    /// JSON configuration file; environment overrides still apply
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write every detected region as a separate image
    #[arg(long)]
    save_regions: bool,

    /// Write an overlay with detected regions outlined
    #[arg(long)]
    annotate: bool,

    /// Directory for the per-run log file
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

/// Load the pipeline configuration from a file or the defaults, then apply
/// environment overrides
fn load_pipeline_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    config.apply_overrides(|key| env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

fn build_engine(kind: EngineKind, config: &PipelineConfig, static_text: &str) -> Result<Box<dyn OcrEngine>> {
    match kind {
        EngineKind::Static => Ok(Box::new(StaticTextEngine::new(static_text))),
        #[cfg(feature = "tesseract")]
        EngineKind::Tesseract => Ok(Box::new(scanprep::ocr::TesseractEngine::new(&config.ocr)?)),
        #[cfg(not(feature = "tesseract"))]
        EngineKind::Tesseract => {
            let _ = config;
            Err(anyhow::anyhow!(
                "the tesseract engine is not available; rebuild with --features tesseract"
            ))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut observability_config = ObservabilityConfig::from_env();
    if args.log_dir.is_some() {
        observability_config.log_dir = args.log_dir.clone();
    }
    let log_file = observability::init_tracing(&observability_config)?;
    if let Some(log_file) = &log_file {
        info!(path = %log_file.display(), "Writing log file");
    }

    let config = load_pipeline_config(args.config.as_deref()).inspect_err(|e| {
        error_logging::log_config_error(e, "pipeline");
    })?;
    let engine = build_engine(args.engine, &config, &args.static_text)?;
    let pipeline = Arc::new(DocumentPipeline::new(config, engine)?);

    let options = OutputOptions {
        save_regions: args.save_regions,
        annotate: args.annotate,
        ..OutputOptions::new(&args.output_dir)
    };

    if args.input.is_dir() {
        let batch_options = options.clone();
        let summary = batch::process_directory(pipeline, &args.input, move |processed| {
            write_document_outputs(processed, &batch_options).map(|_| ())
        })
        .await?;

        println!(
            "Processed {} document(s): {} succeeded, {} failed",
            summary.total(),
            summary.succeeded.len(),
            summary.failed.len()
        );
        for failure in &summary.failed {
            warn!(document = %failure.path.display(), error = %failure.error, "Document failed");
        }
        if !summary.all_succeeded() {
            anyhow::bail!("{} document(s) failed", summary.failed.len());
        }
    } else {
        let input = args.input.clone();
        let processed = tokio::task::spawn_blocking(move || pipeline.process(&input))
            .await
            .context("document worker did not complete")??;
        let written = write_document_outputs(&processed, &options)?;

        println!(
            "{}: {} region(s), {} OCR pass(es), {}ms",
            processed.report.source.display(),
            processed.report.regions.len(),
            processed.report.ocr_passes,
            processed.report.processing_time_ms
        );
        for path in written {
            println!("  wrote {}", path.display());
        }
    }

    Ok(())
}
