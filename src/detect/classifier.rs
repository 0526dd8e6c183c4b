//! Detector backed by a trained cascade classifier
//!
//! Runs an `opencv_traincascade` model through OpenCV's
//! `CascadeClassifier::detectMultiScale3`, which also reports the reject
//! level and weight of every detection.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use image::DynamicImage;
use opencv::core::{Rect, Size, Vector};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;
use tracing::debug;

use crate::cv;
use crate::region::{DetectedRegion, Region};

use super::types::{DetectError, RegionDetector, Result};

/// Default growth of the search window between scales
pub const DEFAULT_SCALE_FACTOR: f64 = 1.1;

/// Default number of merged neighbours a detection needs
pub const DEFAULT_MIN_NEIGHBORS: usize = 6;

/// Default object size the model was trained on
pub const DEFAULT_TRAINED_SIZE: u32 = 24;

/// Options for classifier-backed detection
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierOptions {
    /// Object width used when training (`-w` of the training tools)
    pub trained_width: u32,
    /// Object height used when training (`-h` of the training tools)
    pub trained_height: u32,
    pub scale_factor: f64,
    pub min_neighbors: usize,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            trained_width: DEFAULT_TRAINED_SIZE,
            trained_height: DEFAULT_TRAINED_SIZE,
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
        }
    }
}

impl ClassifierOptions {
    /// Create a builder
    pub fn builder() -> ClassifierOptionsBuilder {
        ClassifierOptionsBuilder::default()
    }

    /// Smallest object searched: half the trained size
    pub fn min_size(&self) -> (u32, u32) {
        (self.trained_width / 2, self.trained_height / 2)
    }

    /// Largest object searched: double the trained size
    pub fn max_size(&self) -> (u32, u32) {
        (self.trained_width * 2, self.trained_height * 2)
    }
}

/// Builder for ClassifierOptions
#[derive(Debug, Default)]
pub struct ClassifierOptionsBuilder {
    options: ClassifierOptions,
}

impl ClassifierOptionsBuilder {
    /// Set the trained object size
    #[must_use]
    pub fn trained_size(mut self, width: u32, height: u32) -> Self {
        self.options.trained_width = width.max(1);
        self.options.trained_height = height.max(1);
        self
    }

    /// Set the scale factor (clamped above 1.0)
    #[must_use]
    pub fn scale_factor(mut self, factor: f64) -> Self {
        self.options.scale_factor = factor.max(1.01);
        self
    }

    /// Set the neighbour threshold
    #[must_use]
    pub fn min_neighbors(mut self, neighbors: usize) -> Self {
        self.options.min_neighbors = neighbors;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> ClassifierOptions {
        self.options
    }
}

/// Runs a cascade over each image at multiple scales
pub struct CascadeDetector {
    // detection mutates OpenCV's per-call buffers
    classifier: Mutex<CascadeClassifier>,
    model_path: PathBuf,
    options: ClassifierOptions,
}

impl std::fmt::Debug for CascadeDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CascadeDetector")
            .field("model_path", &self.model_path)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl CascadeDetector {
    /// Load the model eagerly so a broken file fails before any image is
    /// processed.
    pub fn load(model_path: &Path, options: ClassifierOptions) -> Result<Self> {
        let model_error = |message: String| DetectError::Model {
            path: model_path.to_path_buf(),
            message,
        };

        if !model_path.is_file() {
            return Err(model_error("file not found".to_string()));
        }
        let path_str = model_path
            .to_str()
            .ok_or_else(|| model_error("path is not valid UTF-8".to_string()))?;

        let classifier =
            CascadeClassifier::new(path_str).map_err(|e| model_error(e.to_string()))?;
        if classifier.empty().map_err(|e| model_error(e.to_string()))? {
            return Err(model_error(
                "not a cascade OpenCV can read (expected opencv_traincascade XML)".to_string(),
            ));
        }

        debug!(path = %model_path.display(), "loaded cascade model");
        Ok(Self {
            classifier: Mutex::new(classifier),
            model_path: model_path.to_path_buf(),
            options,
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn options(&self) -> &ClassifierOptions {
        &self.options
    }

    /// Detect with diagnostics, in detector output order.
    ///
    /// The image is converted to grayscale first.
    pub fn detect_scored(&self, image: &DynamicImage) -> Result<Vec<DetectedRegion>> {
        let gray = cv::rgb_to_gray_mat(&image.to_rgb8())?;
        let (min_w, min_h) = self.options.min_size();
        let (max_w, max_h) = self.options.max_size();

        let mut objects = Vector::<Rect>::new();
        let mut reject_levels = Vector::<i32>::new();
        let mut level_weights = Vector::<f64>::new();

        self.classifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .detect_multi_scale3(
                &gray,
                &mut objects,
                &mut reject_levels,
                &mut level_weights,
                self.options.scale_factor,
                self.options.min_neighbors as i32,
                // ignored by new-format cascades
                0,
                Size::new(min_w as i32, min_h as i32),
                Size::new(max_w as i32, max_h as i32),
                true,
            )?;

        Ok(objects
            .iter()
            .zip(reject_levels.iter())
            .zip(level_weights.iter())
            .map(|((rect, reject_level), weight)| DetectedRegion {
                region: Region::new(
                    rect.x as f64,
                    rect.y as f64,
                    rect.width as f64,
                    rect.height as f64,
                ),
                reject_level,
                weight,
            })
            .collect())
    }
}

impl RegionDetector for CascadeDetector {
    fn detect(&self, image_path: &Path, image: &DynamicImage) -> Result<Vec<Region>> {
        let found = self.detect_scored(image)?;
        debug!(path = %image_path.display(), count = found.len(), "cascade detections");
        Ok(found.into_iter().map(Region::from).collect())
    }

    fn name(&self) -> &'static str {
        "classifier"
    }
}
