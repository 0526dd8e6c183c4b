//! Pipeline types: errors, options and run outcomes

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::detect::DetectError;
use crate::inpaint::{InpaintError, DEFAULT_INPAINT_RADIUS};

// ============================================================
// Constants
// ============================================================

/// Default JPEG quality for written pages
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

// ============================================================
// Error Types
// ============================================================

/// Batch pipeline error types
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Source directory not found: {0}")]
    SourceDirMissing(PathBuf),

    #[error("Source directory has no images: {0}")]
    SourceDirEmpty(PathBuf),

    #[error("Filename does not follow <number>_<name>-<number>: {0}")]
    InvalidFilename(String),

    #[error("Failed to load image {path}: {message}")]
    ImageLoad { path: PathBuf, message: String },

    #[error("Failed to write image {path}: {message}")]
    ImageWrite { path: PathBuf, message: String },

    #[error("Detection failed: {0}")]
    Detect(#[from] DetectError),

    #[error("Inpainting failed: {0}")]
    Inpaint(#[from] InpaintError),

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(String),

    #[error("Worker panicked: {0}")]
    WorkerPanic(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

// ============================================================
// Options
// ============================================================

/// Batch pipeline options
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Worker threads; `None` uses every CPU
    pub threads: Option<usize>,
    /// Quality of JPEG output (1-100)
    pub jpeg_quality: u8,
    /// Inpainting neighbourhood radius
    pub inpaint_radius: f64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            threads: None,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            inpaint_radius: DEFAULT_INPAINT_RADIUS,
        }
    }
}

impl PipelineOptions {
    /// Create a new options builder
    pub fn builder() -> PipelineOptionsBuilder {
        PipelineOptionsBuilder::default()
    }

    /// Resolved worker count
    pub fn thread_count(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// Builder for PipelineOptions
#[derive(Debug, Default)]
pub struct PipelineOptionsBuilder {
    options: PipelineOptions,
}

impl PipelineOptionsBuilder {
    /// Set the worker thread count
    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.options.threads = Some(threads.max(1));
        self
    }

    /// Set the JPEG quality (clamped to 1-100)
    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.options.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Set the inpainting radius
    #[must_use]
    pub fn inpaint_radius(mut self, radius: f64) -> Self {
        self.options.inpaint_radius = radius;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> PipelineOptions {
        self.options
    }
}

// ============================================================
// Outcomes
// ============================================================

/// Totals of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Files written to `output/`
    pub files: usize,
    /// Files that had regions removed
    pub inpainted: usize,
    /// Files with no regions
    pub unchanged: usize,
    pub elapsed: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} files ({} inpainted, {} unchanged) in {:.2}s",
            self.files,
            self.inpainted,
            self.unchanged,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Terminal state of a call to `BatchPipeline::run`
#[derive(Debug)]
pub enum RunOutcome {
    /// Another run held the lock; nothing was done
    AlreadyRunning,
    Succeeded(RunSummary),
    /// Stopped on request after `written` of `total` files were written
    Cancelled { written: usize, total: usize },
    Failed(PipelineError),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded(_))
    }

    /// Name of the terminal state for logs
    pub fn name(&self) -> &'static str {
        match self {
            RunOutcome::AlreadyRunning => "already running",
            RunOutcome::Succeeded(_) => "succeeded",
            RunOutcome::Cancelled { .. } => "cancelled",
            RunOutcome::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::AlreadyRunning => write!(f, "A run is already in progress"),
            RunOutcome::Succeeded(summary) => write!(f, "{}", summary),
            RunOutcome::Cancelled { written, total } => {
                write!(f, "Cancelled after writing {}/{} files", written, total)
            }
            RunOutcome::Failed(err) => write!(f, "Failed: {}", err),
        }
    }
}
