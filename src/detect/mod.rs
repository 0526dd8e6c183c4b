//! Region detection
//!
//! Strategies producing the regions to remove from one page image.
//!
//! # Features
//!
//! - **Annotation-backed** ([`AnnotationDetector`]) - regions saved by hand in `pos.txt`
//! - **Classifier-backed** ([`CascadeDetector`]) - multi-scale OpenCV cascade search
//!
//! The pipeline only sees the [`RegionDetector`] trait. New strategies are
//! added as new [`Detector`] variants.
//!
//! # Example
//!
//! ```rust,no_run
//! use page_cleaner::{ClassifierOptions, Detector, DetectorKind, RegionDetector, WorkingDirectory};
//!
//! let workdir = WorkingDirectory::new("project");
//! let detector = Detector::build(DetectorKind::Classifier, &workdir, ClassifierOptions::default())
//!     .unwrap();
//! let path = workdir.source_image("1_a-1.jpg");
//! let image = image::open(&path).unwrap();
//! let regions = detector.detect(&path, &image).unwrap();
//! ```

mod annotation;
mod classifier;
mod types;

use std::path::Path;

use image::DynamicImage;

use crate::region::Region;
use crate::workdir::WorkingDirectory;

pub use annotation::AnnotationDetector;
pub use classifier::{
    CascadeDetector, ClassifierOptions, ClassifierOptionsBuilder, DEFAULT_MIN_NEIGHBORS,
    DEFAULT_SCALE_FACTOR, DEFAULT_TRAINED_SIZE,
};
pub use types::{DetectError, DetectorKind, RegionDetector, Result};

/// Configured detection strategy
#[derive(Debug)]
pub enum Detector {
    Annotation(AnnotationDetector),
    Classifier(CascadeDetector),
}

impl Detector {
    /// Build the detector for `kind`.
    ///
    /// The classifier variant loads `model/cascade.xml` here, so a broken
    /// model is reported before any image is touched.
    pub fn build(
        kind: DetectorKind,
        workdir: &WorkingDirectory,
        options: ClassifierOptions,
    ) -> Result<Self> {
        match kind {
            DetectorKind::Annotation => Ok(Detector::Annotation(AnnotationDetector::new(
                workdir.clone(),
            ))),
            DetectorKind::Classifier => Ok(Detector::Classifier(CascadeDetector::load(
                &workdir.model_path(),
                options,
            )?)),
        }
    }

    pub fn kind(&self) -> DetectorKind {
        match self {
            Detector::Annotation(_) => DetectorKind::Annotation,
            Detector::Classifier(_) => DetectorKind::Classifier,
        }
    }
}

impl RegionDetector for Detector {
    fn detect(&self, image_path: &Path, image: &DynamicImage) -> Result<Vec<Region>> {
        match self {
            Detector::Annotation(detector) => detector.detect(image_path, image),
            Detector::Classifier(detector) => detector.detect(image_path, image),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Detector::Annotation(detector) => detector.name(),
            Detector::Classifier(detector) => detector.name(),
        }
    }
}
