//! page-cleaner - batch cleaning of scanned pages
//!
//! CLI entry point

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn, Level};

use page_cleaner::{
    exit_codes,
    // CLI
    AnnotateArgs, CleanArgs, Cli, Commands, DetectArgs, DetectorArgs, InitArgs, OrderArgs,
    // Config
    CliOverrides, Config, PipelineConfig,
    // Detection
    AnnotationStore, CascadeDetector, DetectedRegion, Detector, DetectorKind, RegionDetector,
    // Pipeline
    discover_sources, BatchPipeline, NoopObserver, ProgressObserver, RunOutcome, TextProgress,
    WorkingDirectory,
};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Clean(args) => run_clean(args, cli.quiet),
        Commands::Detect(args) => run_detect(args),
        Commands::Annotate(args) => run_annotate(args),
        Commands::Init(args) => run_init(args),
        Commands::Order(args) => run_order(args),
    };

    std::process::exit(match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_codes::GENERAL_ERROR
        }
    });
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ============ Progress Observer Implementation ============

/// Progress bar for interactive runs
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] [{bar:40}] {percent:>3}% ({pos}/{len})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");
        bar.set_style(style);
        Self { bar }
    }
}

impl ProgressObserver for BarProgress {
    fn on_progress(&self, done: u64, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(done);
    }

    fn on_finished(&self, _outcome: &RunOutcome) {
        self.bar.finish_and_clear();
    }
}

// ============ Clean Command ============

fn run_clean(args: &CleanArgs, quiet: bool) -> anyhow::Result<i32> {
    let workdir = open_workdir(&args.workdir)?;

    let file_config = load_config(&workdir, &args.detection);
    let mut overrides = detector_overrides(&args.detection);
    overrides.threads = args.threads;
    overrides.jpeg_quality = args.jpeg_quality;
    overrides.inpaint_radius = args.inpaint_radius;
    if args.page_numbers {
        overrides.add_page_numbers = Some(true);
    }
    let config = file_config.merge_with_cli(&overrides);

    let detector = match build_detector(&workdir, &config) {
        Ok(detector) => detector,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return Ok(exit_codes::MODEL_ERROR);
        }
    };

    let observer: Arc<dyn ProgressObserver> = if quiet {
        Arc::new(NoopObserver)
    } else if args.plain {
        Arc::new(TextProgress::new())
    } else {
        Arc::new(BarProgress::new())
    };

    let pipeline = BatchPipeline::new(config.options.clone())?.with_observer(observer);
    info!(
        threads = pipeline.options().thread_count(),
        detector = %config.detector,
        "cleaning {}",
        workdir.root().display()
    );

    match pipeline.run(&workdir, &detector, config.add_page_numbers) {
        RunOutcome::Succeeded(summary) => {
            if !quiet {
                println!("{}", summary);
                println!("Output: {}", workdir.output_dir().display());
            }
            Ok(exit_codes::SUCCESS)
        }
        RunOutcome::Cancelled { written, total } => {
            eprintln!("Cancelled after {}/{} files", written, total);
            Ok(exit_codes::CANCELLED)
        }
        RunOutcome::Failed(err) => Err(err.into()),
        RunOutcome::AlreadyRunning => bail!("a run is already in progress"),
    }
}

// ============ Detect Command ============

#[derive(Serialize)]
struct DetectionReport<'a> {
    image: &'a str,
    detector: DetectorKind,
    regions: Vec<DetectedRegion>,
}

fn run_detect(args: &DetectArgs) -> anyhow::Result<i32> {
    let workdir = open_workdir(&args.workdir)?;
    let config =
        load_config(&workdir, &args.detection).merge_with_cli(&detector_overrides(&args.detection));

    let path = workdir.source_image(&args.image);
    if !path.is_file() {
        eprintln!("Error: Source image not found: {}", path.display());
        return Ok(exit_codes::INPUT_NOT_FOUND);
    }
    let image =
        image::open(&path).with_context(|| format!("failed to load {}", path.display()))?;

    let regions = match config.detector {
        DetectorKind::Classifier => {
            let detector =
                match CascadeDetector::load(&workdir.model_path(), config.classifier.clone()) {
                    Ok(detector) => detector,
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        return Ok(exit_codes::MODEL_ERROR);
                    }
                };
            detector.detect_scored(&image)?
        }
        DetectorKind::Annotation => build_detector(&workdir, &config)?
            .detect(&path, &image)?
            .into_iter()
            .map(|region| DetectedRegion {
                region,
                reject_level: 0,
                weight: 0.0,
            })
            .collect(),
    };

    if args.json {
        let report = DetectionReport {
            image: &args.image,
            detector: config.detector,
            regions,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if regions.is_empty() {
        println!("No regions in {}", args.image);
    } else {
        for detected in &regions {
            match config.detector {
                DetectorKind::Classifier => println!(
                    "{}  level={} weight={:.3}",
                    detected.region, detected.reject_level, detected.weight
                ),
                DetectorKind::Annotation => println!("{}", detected.region),
            }
        }
    }
    Ok(exit_codes::SUCCESS)
}

// ============ Annotate Command ============

fn run_annotate(args: &AnnotateArgs) -> anyhow::Result<i32> {
    let workdir = open_workdir(&args.workdir)?;
    if args.positive.is_none() && args.negative.is_none() {
        eprintln!("Error: nothing to do, pass --positive and/or --negative");
        return Ok(exit_codes::INVALID_ARGS);
    }

    let store = AnnotationStore::new(workdir.clone());

    if let Some(regions) = &args.positive {
        store.write_positive(&args.image, regions)?;
        println!(
            "Saved {} positive region(s) for {}",
            regions.len(),
            args.image
        );
    }

    if let Some(regions) = &args.negative {
        let path = workdir.source_image(&args.image);
        let image =
            image::open(&path).with_context(|| format!("failed to load {}", path.display()))?;
        let crops = store.write_negative(&args.image, &image, regions)?;
        println!("Saved {} negative crop(s) for {}", crops.len(), args.image);
    }

    Ok(exit_codes::SUCCESS)
}

// ============ Init Command ============

fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    let workdir = WorkingDirectory::new(&args.workdir);
    workdir
        .ensure_layout()
        .with_context(|| format!("failed to create {}", workdir.root().display()))?;

    if args.write_config {
        let path = workdir.local_config();
        if path.exists() {
            warn!("{} already exists, leaving it untouched", path.display());
        } else {
            std::fs::write(&path, Config::default().to_toml()?)?;
            println!("Wrote {}", path.display());
        }
    }

    println!("Initialized {}", workdir.root().display());
    Ok(exit_codes::SUCCESS)
}

// ============ Order Command ============

fn run_order(args: &OrderArgs) -> anyhow::Result<i32> {
    let workdir = open_workdir(&args.workdir)?;
    let files = discover_sources(&workdir)?;
    for (page_index, name) in files.iter().enumerate() {
        println!("{:>5}  {}", page_index + 1, name);
    }
    Ok(exit_codes::SUCCESS)
}

// ============ Helper Functions ============

fn open_workdir(path: &Path) -> anyhow::Result<WorkingDirectory> {
    if !path.is_dir() {
        eprintln!("Error: Working directory does not exist: {}", path.display());
        std::process::exit(exit_codes::INPUT_NOT_FOUND);
    }
    Ok(WorkingDirectory::new(path))
}

/// Load the config file, falling back to defaults with a warning
fn load_config(workdir: &WorkingDirectory, args: &DetectorArgs) -> Config {
    match Config::load_for(workdir.root(), args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config file: {}", e);
            Config::default()
        }
    }
}

/// Only values given on the command line override the config file
fn detector_overrides(args: &DetectorArgs) -> CliOverrides {
    CliOverrides {
        detector: args.detector,
        trained_width: args.trained_width,
        trained_height: args.trained_height,
        scale_factor: args.scale_factor,
        min_neighbors: args.min_neighbors,
        ..CliOverrides::new()
    }
}

fn build_detector(workdir: &WorkingDirectory, config: &PipelineConfig) -> anyhow::Result<Detector> {
    Detector::build(config.detector, workdir, config.classifier.clone())
        .with_context(|| format!("failed to set up the {} detector", config.detector))
}
