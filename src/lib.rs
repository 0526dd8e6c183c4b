//! page-cleaner - batch removal of recurring artifacts from scanned pages
//!
//! Regions to remove (watermarks, page furniture, stamps) are found by a
//! pluggable [`RegionDetector`], reconstructed by the [`Inpainter`], and the
//! cleaned pages are written to the working directory's `output/` folder,
//! optionally with page numbers.
//!
//! # Modules
//!
//! - [`annotation`] - `pos.txt` / `neg.txt` annotation store
//! - [`detect`] - annotation-backed and OpenCV cascade-classifier detectors
//! - [`inpaint`] - OpenCV Telea inpainting
//! - [`page_number`] - page number stamping
//! - [`pipeline`] - the parallel batch run
//! - [`progress`] - progress observers
//! - [`config`] / [`cli`] - settings and command line
//! - [`cv`] - `image` buffer and OpenCV matrix conversions

pub mod annotation;
pub mod cli;
pub mod config;
pub mod cv;
pub mod detect;
pub mod inpaint;
pub mod page_number;
pub mod pipeline;
pub mod progress;
pub mod region;
pub mod workdir;

pub use annotation::{AnnotationError, AnnotationStore};
pub use cli::{
    exit_codes, AnnotateArgs, CleanArgs, Cli, Commands, DetectArgs, DetectorArgs, InitArgs,
    OrderArgs,
};
pub use config::{CliOverrides, Config, ConfigError, PipelineConfig};
pub use detect::{
    AnnotationDetector, CascadeDetector, ClassifierOptions, DetectError, Detector, DetectorKind,
    RegionDetector,
};
pub use inpaint::{InpaintError, Inpainter};
pub use page_number::{NumberBox, NumberCorner, PageNumberError, PageNumberOptions, PageNumberer};
pub use pipeline::{
    discover_sources, BatchPipeline, CancelToken, PipelineError, PipelineOptions, RunOutcome,
    RunSummary, SingleFlight, StageCounters,
};
pub use progress::{NoopObserver, ProgressObserver, Stage, TextProgress};
pub use region::{DetectedRegion, PixelRect, Region};
pub use workdir::WorkingDirectory;
