//! Command-line interface definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::detect::DetectorKind;
use crate::region::Region;

/// Process exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_ARGS: i32 = 2;
    pub const INPUT_NOT_FOUND: i32 = 3;
    pub const MODEL_ERROR: i32 = 4;
    pub const CANCELLED: i32 = 130;
}

/// Remove recurring artifacts from scanned pages
#[derive(Debug, Parser)]
#[command(name = "page-cleaner", version, about, long_about = None)]
pub struct Cli {
    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors and hide the progress bar
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Detect and inpaint every page of source/ into output/
    Clean(CleanArgs),
    /// Run a detector over one source image and print the regions
    Detect(DetectArgs),
    /// Save annotations for one source image
    Annotate(AnnotateArgs),
    /// Create the working directory layout
    Init(InitArgs),
    /// Print source files in page order
    Order(OrderArgs),
}

/// Detector selection shared by `clean` and `detect`
#[derive(Debug, Clone, Args)]
pub struct DetectorArgs {
    /// Detection strategy: annotation or classifier
    #[arg(long)]
    pub detector: Option<DetectorKind>,

    /// Object width the cascade was trained with
    #[arg(long)]
    pub trained_width: Option<u32>,

    /// Object height the cascade was trained with
    #[arg(long)]
    pub trained_height: Option<u32>,

    /// Window growth between detection scales
    #[arg(long)]
    pub scale_factor: Option<f64>,

    /// Neighbours required for a detection to survive
    #[arg(long)]
    pub min_neighbors: Option<usize>,

    /// Config file (default: <workdir>/page-cleaner.toml, then user config)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Working directory
    pub workdir: PathBuf,

    #[command(flatten)]
    pub detection: DetectorArgs,

    /// Stamp page numbers onto the output
    #[arg(long)]
    pub page_numbers: bool,

    /// Worker threads (default: all CPUs)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// JPEG quality of written pages
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub jpeg_quality: Option<u8>,

    /// Inpainting radius in pixels
    #[arg(long)]
    pub inpaint_radius: Option<f64>,

    /// Plain text progress instead of a progress bar
    #[arg(long)]
    pub plain: bool,
}

#[derive(Debug, Args)]
pub struct DetectArgs {
    /// Working directory
    pub workdir: PathBuf,

    /// Source image filename
    pub image: String,

    #[command(flatten)]
    pub detection: DetectorArgs,

    /// Print JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct AnnotateArgs {
    /// Working directory
    pub workdir: PathBuf,

    /// Source image filename
    pub image: String,

    /// Regions to remove, as x,y,w,h (flag alone clears)
    #[arg(long, num_args = 0..)]
    pub positive: Option<Vec<Region>>,

    /// Regions to keep, cropped into negative/ (flag alone clears)
    #[arg(long, num_args = 0..)]
    pub negative: Option<Vec<Region>>,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Working directory
    pub workdir: PathBuf,

    /// Also write a page-cleaner.toml with the default settings
    #[arg(long)]
    pub write_config: bool,
}

#[derive(Debug, Args)]
pub struct OrderArgs {
    /// Working directory
    pub workdir: PathBuf,
}
