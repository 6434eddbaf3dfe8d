//! # Pipeline Error Types
//!
//! This module defines the error type shared by every preprocessing stage,
//! the region detector, the OCR hand-off and the orchestrator.

use std::fmt;

/// Error raised by a pipeline stage or collaborator.
#[derive(Debug, Clone)]
pub enum PipelineError {
    /// Missing or unreadable file, empty image, malformed raw buffer
    Input(String),
    /// Degenerate input to a geometric computation (minimum-area rectangle, Otsu)
    Geometry(String),
    /// Opaque failure surfaced by the OCR collaborator
    Engine(String),
    /// Invalid configuration values
    Config(String),
    /// The orchestrator deadline elapsed before a stage could start
    DeadlineExceeded {
        stage: &'static str,
        elapsed_ms: u64,
        limit_ms: u64,
    },
    /// An error annotated with the stage and document it occurred in
    Staged {
        stage: &'static str,
        document: String,
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Wraps the error with the stage name and document identifier.
    ///
    /// Already-staged errors are returned unchanged so the innermost stage wins.
    pub fn in_stage(self, stage: &'static str, document: impl Into<String>) -> Self {
        match self {
            PipelineError::Staged { .. } => self,
            other => PipelineError::Staged {
                stage,
                document: document.into(),
                source: Box::new(other),
            },
        }
    }

    /// Returns the underlying error with any stage annotation removed.
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::Staged { source, .. } => source.root(),
            other => other,
        }
    }

    /// Stage name, if the error was annotated by the orchestrator.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            PipelineError::Staged { stage, .. } => Some(stage),
            PipelineError::DeadlineExceeded { stage, .. } => Some(stage),
            _ => None,
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(self.root(), PipelineError::Input(_))
    }

    pub fn is_geometry(&self) -> bool {
        matches!(self.root(), PipelineError::Geometry(_))
    }

    pub fn is_engine(&self) -> bool {
        matches!(self.root(), PipelineError::Engine(_))
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Input(msg) => write!(f, "[INPUT] {}", msg),
            PipelineError::Geometry(msg) => write!(f, "[GEOMETRY] {}", msg),
            PipelineError::Engine(msg) => write!(f, "[ENGINE] {}", msg),
            PipelineError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            PipelineError::DeadlineExceeded {
                stage,
                elapsed_ms,
                limit_ms,
            } => write!(
                f,
                "[DEADLINE] deadline of {}ms exceeded after {}ms before stage '{}'",
                limit_ms, elapsed_ms, stage
            ),
            PipelineError::Staged {
                stage,
                document,
                source,
            } => write!(f, "{} (stage '{}', document '{}')", source, stage, document),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Staged { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<image::ImageError> for PipelineError {
    fn from(err: image::ImageError) -> Self {
        PipelineError::Input(err.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Input(err.to_string())
    }
}

/// Result type alias for convenience
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Standardized error logging so every document failure carries the same fields
pub mod error_logging {
    use tracing::error;

    /// Log a stage failure with document context
    pub fn log_stage_error(
        error: &impl std::fmt::Display,
        stage: &str,
        document: &str,
        processing_duration: Option<std::time::Duration>,
    ) {
        error!(
            error = %error,
            stage = %stage,
            document = %document,
            processing_duration_ms = ?processing_duration.map(|d| d.as_millis()),
            "Pipeline stage failed"
        );
    }

    /// Log OCR engine failures with the engine name and attempt number
    pub fn log_engine_error(
        error: &impl std::fmt::Display,
        engine: &str,
        document: &str,
        pass: u32,
    ) {
        error!(
            error = %error,
            engine = %engine,
            document = %document,
            pass = pass,
            "OCR engine failed"
        );
    }

    /// Log configuration errors during startup
    pub fn log_config_error(error: &impl std::fmt::Display, config_key: &str) {
        error!(
            error = %error,
            config_key = %config_key,
            "Configuration error"
        );
    }
}
