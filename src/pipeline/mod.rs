//! Batch Pipeline module
//!
//! Cleans every page of a working directory's `source/` folder into
//! `output/`.
//!
//! # Stages
//!
//! Each image goes through, in order:
//!
//! 1. **Load** - decode the source file
//! 2. **Detect & inpaint** - ask the [`RegionDetector`] for regions and
//!    inpaint them; images without regions pass through untouched
//! 3. **Number & write** - optionally stamp the page number, then write to
//!    `output/<filename>`
//!
//! Images run in parallel on a rayon pool. Only one run per pipeline may be
//! active at a time; a second call returns [`RunOutcome::AlreadyRunning`].
//!
//! # Example
//!
//! ```rust,no_run
//! use page_cleaner::{
//!     AnnotationDetector, BatchPipeline, PipelineOptions, RunOutcome, WorkingDirectory,
//! };
//!
//! let workdir = WorkingDirectory::new("project");
//! let detector = AnnotationDetector::new(workdir.clone());
//! let pipeline = BatchPipeline::new(PipelineOptions::default()).unwrap();
//!
//! match pipeline.run(&workdir, &detector, true) {
//!     RunOutcome::Succeeded(summary) => println!("{}", summary),
//!     other => eprintln!("{}", other),
//! }
//! ```

mod control;
pub mod ordering;
mod output;
mod types;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::detect::RegionDetector;
use crate::inpaint::Inpainter;
use crate::page_number::PageNumberer;
use crate::progress::{NoopObserver, ProgressObserver, Stage};
use crate::workdir::{is_hidden_file, WorkingDirectory};

pub use control::{CancelToken, SingleFlight, SingleFlightGuard, StageCounters};
pub use ordering::{sort_filenames, sort_key};
pub use output::{copy_unchanged, save_image};
pub use types::{
    PipelineError, PipelineOptions, PipelineOptionsBuilder, Result, RunOutcome, RunSummary,
    DEFAULT_JPEG_QUALITY,
};

/// Why a run stopped before finishing every image
enum Halt {
    Cancelled,
    Failed(PipelineError),
}

impl From<PipelineError> for Halt {
    fn from(err: PipelineError) -> Self {
        Halt::Failed(err)
    }
}

/// What happened to one image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageResult {
    Inpainted,
    Unchanged,
}

/// Detect-and-inpaint batch runner
pub struct BatchPipeline {
    options: PipelineOptions,
    inpainter: Inpainter,
    numberer: PageNumberer,
    lock: SingleFlight,
    cancel: CancelToken,
    counters: StageCounters,
    observer: Arc<dyn ProgressObserver>,
}

impl std::fmt::Debug for BatchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchPipeline")
            .field("options", &self.options)
            .field("running", &self.lock.is_held())
            .finish_non_exhaustive()
    }
}

impl BatchPipeline {
    /// Create a pipeline; fails on an invalid inpaint radius
    pub fn new(options: PipelineOptions) -> Result<Self> {
        let inpainter = Inpainter::new(options.inpaint_radius)?;
        Ok(Self {
            options,
            inpainter,
            numberer: PageNumberer::default(),
            lock: SingleFlight::new(),
            cancel: CancelToken::new(),
            counters: StageCounters::new(),
            observer: Arc::new(NoopObserver),
        })
    }

    /// Report progress and the final outcome to `observer`
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Use a custom page numberer
    #[must_use]
    pub fn with_numberer(mut self, numberer: PageNumberer) -> Self {
        self.numberer = numberer;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Token that cancels the active run
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// The run lock, for callers that want to check or hold it themselves
    pub fn lock(&self) -> &SingleFlight {
        &self.lock
    }

    pub fn is_running(&self) -> bool {
        self.lock.is_held()
    }

    /// Progress of the current or last run in `[0, 1]`
    pub fn progress(&self) -> f64 {
        self.counters.fraction()
    }

    pub fn counters(&self) -> &StageCounters {
        &self.counters
    }

    /// Clean every image of `workdir`'s `source/` into `output/`.
    ///
    /// Returns immediately with [`RunOutcome::AlreadyRunning`] if another
    /// run holds the lock. Otherwise the lock is released before the
    /// observer's `on_finished` is called with the outcome.
    pub fn run(
        &self,
        workdir: &WorkingDirectory,
        detector: &dyn RegionDetector,
        add_page_numbers: bool,
    ) -> RunOutcome {
        let Some(guard) = self.lock.try_acquire() else {
            warn!(workdir = %workdir.root().display(), "batch run already in progress, ignoring");
            return RunOutcome::AlreadyRunning;
        };

        self.cancel.reset();
        self.counters.reset(0);
        info!(
            workdir = %workdir.root().display(),
            detector = detector.name(),
            add_page_numbers,
            "starting batch run"
        );

        let start = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.execute(workdir, detector, add_page_numbers)
        }))
        .unwrap_or_else(|payload| {
            Err(Halt::Failed(PipelineError::WorkerPanic(panic_message(
                payload.as_ref(),
            ))))
        });
        let outcome = match result {
            Ok((files, inpainted)) => RunOutcome::Succeeded(RunSummary {
                files,
                inpainted,
                unchanged: files - inpainted,
                elapsed: start.elapsed(),
            }),
            Err(Halt::Cancelled) => RunOutcome::Cancelled {
                written: self.counters.get(Stage::Writing) as usize,
                total: (self.counters.total() / Stage::COUNT) as usize,
            },
            Err(Halt::Failed(err)) => RunOutcome::Failed(err),
        };

        drop(guard);

        match &outcome {
            RunOutcome::Failed(err) => error!("batch run failed: {}", err),
            other => info!("batch run {}: {}", other.name(), other),
        }
        self.observer.on_finished(&outcome);
        outcome
    }

    /// Returns `(files, inpainted)` on success
    fn execute(
        &self,
        workdir: &WorkingDirectory,
        detector: &dyn RegionDetector,
        add_page_numbers: bool,
    ) -> std::result::Result<(usize, usize), Halt> {
        let files = discover_sources(workdir)?;
        debug!(count = files.len(), "source files to inpaint");

        let output_dir = workdir.output_dir();
        std::fs::create_dir_all(&output_dir).map_err(PipelineError::Io)?;

        self.counters.reset(files.len());
        self.observer.on_progress(0, self.counters.total());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.thread_count())
            .build()
            .map_err(|e| PipelineError::ThreadPool(e.to_string()))?;

        let inpainted = AtomicUsize::new(0);
        pool.install(|| {
            files
                .par_iter()
                .enumerate()
                .try_for_each(|(page_index, filename)| {
                    if self.cancel.is_cancelled() {
                        return Err(Halt::Cancelled);
                    }
                    let result = self.process_page(
                        workdir,
                        &output_dir,
                        filename,
                        page_index,
                        detector,
                        add_page_numbers,
                    )?;
                    if result == PageResult::Inpainted {
                        inpainted.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(())
                })
        })?;

        Ok((files.len(), inpainted.into_inner()))
    }

    fn advance(&self, stage: Stage) {
        let done = self.counters.advance(stage);
        self.observer.on_progress(done, self.counters.total());
    }

    fn process_page(
        &self,
        workdir: &WorkingDirectory,
        output_dir: &Path,
        filename: &str,
        page_index: usize,
        detector: &dyn RegionDetector,
        add_page_numbers: bool,
    ) -> Result<PageResult> {
        let source = workdir.source_image(filename);
        let destination = output_dir.join(filename);

        debug!(path = %source.display(), "loading source image");
        let image = image::open(&source).map_err(|e| PipelineError::ImageLoad {
            path: source.clone(),
            message: e.to_string(),
        })?;
        self.advance(Stage::Loading);

        let regions = detector.detect(&source, &image)?;
        let cleaned = if regions.is_empty() {
            debug!(file = filename, "no regions, skipping inpaint");
            None
        } else {
            debug!(file = filename, count = regions.len(), "inpainting regions");
            Some(self.inpainter.inpaint(&image, &regions)?)
        };
        self.advance(Stage::Inpainting);

        let result = if cleaned.is_some() {
            PageResult::Inpainted
        } else {
            PageResult::Unchanged
        };

        match (cleaned, add_page_numbers) {
            (None, false) => copy_unchanged(&source, &destination)?,
            (cleaned, false) => {
                let page = cleaned.unwrap_or(image);
                save_image(&page, &destination, self.options.jpeg_quality)?;
            }
            (cleaned, true) => {
                let page = self.number_page(cleaned.unwrap_or(image), page_index, filename);
                save_image(&page, &destination, self.options.jpeg_quality)?;
            }
        }
        debug!(path = %destination.display(), "wrote output image");
        self.advance(Stage::Writing);

        Ok(result)
    }

    /// Stamp the page number; a failure leaves the page unnumbered
    fn number_page(&self, page: DynamicImage, page_index: usize, filename: &str) -> DynamicImage {
        let mut rgb = page.to_rgb8();
        if let Err(e) = self.numberer.stamp(&mut rgb, page_index) {
            warn!(file = filename, "skipping page number: {}", e);
        }
        DynamicImage::ImageRgb8(rgb)
    }
}

/// List the non-hidden files of `source/` in document order
pub fn discover_sources(workdir: &WorkingDirectory) -> Result<Vec<String>> {
    let source_dir = workdir.source_dir();
    if !source_dir.is_dir() {
        return Err(PipelineError::SourceDirMissing(source_dir));
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(&source_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry
            .file_name()
            .into_string()
            .map_err(|raw| PipelineError::InvalidFilename(raw.to_string_lossy().into_owned()))?;
        if !is_hidden_file(&name) {
            names.push(name);
        }
    }

    if names.is_empty() {
        return Err(PipelineError::SourceDirEmpty(source_dir));
    }
    sort_filenames(names)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::DetectError;
    use crate::region::Region;
    use image::{Rgb, RgbImage};
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FixedDetector {
        regions: Vec<(String, Region)>,
    }

    impl RegionDetector for FixedDetector {
        fn detect(
            &self,
            image_path: &Path,
            _image: &DynamicImage,
        ) -> crate::detect::Result<Vec<Region>> {
            let name = image_path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            Ok(self
                .regions
                .iter()
                .filter(|(file, _)| file == name)
                .map(|(_, region)| *region)
                .collect())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct FailingDetector;

    impl RegionDetector for FailingDetector {
        fn detect(&self, image_path: &Path, _image: &DynamicImage) -> crate::detect::Result<Vec<Region>> {
            Err(DetectError::InvalidImage {
                path: image_path.to_path_buf(),
                message: "broken".to_string(),
            })
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    struct PanickingDetector;

    impl RegionDetector for PanickingDetector {
        fn detect(&self, _image_path: &Path, _image: &DynamicImage) -> crate::detect::Result<Vec<Region>> {
            panic!("detector exploded");
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        progress: Mutex<Vec<(u64, u64)>>,
        finished: Mutex<Vec<String>>,
    }

    impl ProgressObserver for RecordingObserver {
        fn on_progress(&self, done: u64, total: u64) {
            self.progress.lock().unwrap().push((done, total));
        }

        fn on_finished(&self, outcome: &RunOutcome) {
            self.finished.lock().unwrap().push(outcome.name().to_string());
        }
    }

    fn workdir_with(names: &[&str]) -> (TempDir, WorkingDirectory) {
        let temp = TempDir::new().unwrap();
        let workdir = WorkingDirectory::new(temp.path());
        workdir.ensure_layout().unwrap();
        for (i, name) in names.iter().enumerate() {
            let image = RgbImage::from_fn(120, 160, |x, y| {
                Rgb([((x + i as u32 * 40) % 256) as u8, (y % 256) as u8, 90])
            });
            image.save(workdir.source_image(name)).unwrap();
        }
        (temp, workdir)
    }

    fn pipeline() -> BatchPipeline {
        BatchPipeline::new(PipelineOptions::builder().threads(2).build()).unwrap()
    }

    #[test]
    fn test_discover_sorts_and_skips_hidden() {
        let (_temp, workdir) = workdir_with(&["2_a-10.png", "10_a-2.png", "2_a-9.png"]);
        std::fs::write(workdir.source_dir().join(".DS_Store"), b"x").unwrap();
        std::fs::create_dir(workdir.source_dir().join("3_sub-1")).unwrap();

        let files = discover_sources(&workdir).unwrap();
        assert_eq!(files, vec!["2_a-9.png", "2_a-10.png", "10_a-2.png"]);
    }

    #[test]
    fn test_discover_missing_and_empty() {
        let temp = TempDir::new().unwrap();
        let workdir = WorkingDirectory::new(temp.path());
        assert!(matches!(
            discover_sources(&workdir),
            Err(PipelineError::SourceDirMissing(_))
        ));

        workdir.ensure_layout().unwrap();
        std::fs::write(workdir.source_dir().join(".hidden"), b"x").unwrap();
        assert!(matches!(
            discover_sources(&workdir),
            Err(PipelineError::SourceDirEmpty(_))
        ));
    }

    #[test]
    fn test_run_reports_progress_per_stage() {
        let (_temp, workdir) = workdir_with(&["1_a-1.png", "1_a-2.png"]);
        let observer = Arc::new(RecordingObserver::default());
        let pipeline = pipeline().with_observer(observer.clone());
        let detector = FixedDetector { regions: Vec::new() };

        let outcome = pipeline.run(&workdir, &detector, false);

        assert!(outcome.is_success());
        let progress = observer.progress.lock().unwrap();
        // initial report plus one per stage per file
        assert_eq!(progress.len(), 1 + 6);
        assert!(progress.iter().all(|&(_, total)| total == 6));
        assert_eq!(progress.iter().map(|&(done, _)| done).max(), Some(6));
        assert_eq!(pipeline.progress(), 1.0);
        assert_eq!(*observer.finished.lock().unwrap(), vec!["succeeded"]);
    }

    #[test]
    fn test_run_summary_counts() {
        let (_temp, workdir) = workdir_with(&["1_a-1.png", "1_a-2.png", "1_a-3.png"]);
        let detector = FixedDetector {
            regions: vec![("1_a-2.png".to_string(), Region::new(10.0, 10.0, 20.0, 20.0))],
        };

        match pipeline().run(&workdir, &detector, false) {
            RunOutcome::Succeeded(summary) => {
                assert_eq!(summary.files, 3);
                assert_eq!(summary.inpainted, 1);
                assert_eq!(summary.unchanged, 2);
            }
            other => panic!("unexpected outcome: {other}"),
        }
    }

    #[test]
    fn test_detector_failure_fails_run_and_releases_lock() {
        let (_temp, workdir) = workdir_with(&["1_a-1.png"]);
        let observer = Arc::new(RecordingObserver::default());
        let pipeline = pipeline().with_observer(observer.clone());

        let outcome = pipeline.run(&workdir, &FailingDetector, false);

        assert!(matches!(outcome, RunOutcome::Failed(PipelineError::Detect(_))));
        assert!(!pipeline.is_running());
        assert_eq!(*observer.finished.lock().unwrap(), vec!["failed"]);
    }

    #[test]
    fn test_worker_panic_fails_run_and_notifies() {
        let (_temp, workdir) = workdir_with(&["1_a-1.png", "1_a-2.png"]);
        let observer = Arc::new(RecordingObserver::default());
        let pipeline = pipeline().with_observer(observer.clone());

        let outcome = pipeline.run(&workdir, &PanickingDetector, false);

        match outcome {
            RunOutcome::Failed(PipelineError::WorkerPanic(message)) => {
                assert!(message.contains("detector exploded"), "{message}");
            }
            other => panic!("unexpected outcome: {other}"),
        }
        assert!(!pipeline.is_running());
        assert_eq!(*observer.finished.lock().unwrap(), vec!["failed"]);

        let retry = pipeline.run(&workdir, &FixedDetector { regions: Vec::new() }, false);
        assert!(retry.is_success(), "{retry}");
    }

    #[test]
    fn test_unreadable_image_fails_run() {
        let (_temp, workdir) = workdir_with(&["1_a-1.png"]);
        std::fs::write(workdir.source_image("1_a-2.png"), b"garbage").unwrap();

        let outcome = pipeline().run(&workdir, &FixedDetector { regions: Vec::new() }, false);
        assert!(matches!(
            outcome,
            RunOutcome::Failed(PipelineError::ImageLoad { .. })
        ));
    }

    #[test]
    fn test_run_while_locked_is_noop() {
        let (_temp, workdir) = workdir_with(&["1_a-1.png"]);
        let observer = Arc::new(RecordingObserver::default());
        let pipeline = pipeline().with_observer(observer.clone());

        let guard = pipeline.lock().try_acquire();
        let outcome = pipeline.run(&workdir, &FixedDetector { regions: Vec::new() }, false);
        assert!(matches!(outcome, RunOutcome::AlreadyRunning));
        assert!(!workdir.output_dir().exists());
        assert!(observer.finished.lock().unwrap().is_empty());

        drop(guard);
        assert!(pipeline
            .run(&workdir, &FixedDetector { regions: Vec::new() }, false)
            .is_success());
    }

    #[test]
    fn test_page_number_failure_is_cosmetic() {
        // far too small for a page number box
        let temp = TempDir::new().unwrap();
        let workdir = WorkingDirectory::new(temp.path());
        workdir.ensure_layout().unwrap();
        RgbImage::from_pixel(20, 20, Rgb([10, 20, 30]))
            .save(workdir.source_image("1_a-1.png"))
            .unwrap();

        let outcome = pipeline().run(&workdir, &FixedDetector { regions: Vec::new() }, true);

        assert!(outcome.is_success());
        let written = image::open(workdir.output_dir().join("1_a-1.png")).unwrap();
        assert_eq!(written.to_rgb8().get_pixel(5, 5), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_invalid_radius_rejected() {
        let options = PipelineOptions::builder().inpaint_radius(-2.0).build();
        assert!(matches!(
            BatchPipeline::new(options),
            Err(PipelineError::Inpaint(_))
        ));
    }
}
