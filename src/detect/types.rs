//! Detector trait and error types

use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::annotation::AnnotationError;
use crate::region::Region;

/// Region detection error types
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Failed to load cascade model {path}: {message}")]
    Model { path: PathBuf, message: String },

    #[error("Annotation error: {0}")]
    Annotation(#[from] AnnotationError),

    #[error("Invalid image {path}: {message}")]
    InvalidImage { path: PathBuf, message: String },

    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DetectError>;

/// Strategy producing the regions to remove from one image.
///
/// `detect` must not modify the image; it may read model or annotation files.
pub trait RegionDetector: Send + Sync {
    /// Detect regions in `image`, which was loaded from `image_path`
    fn detect(&self, image_path: &Path, image: &DynamicImage) -> Result<Vec<Region>>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Selectable detection strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    /// Regions saved by hand in `pos.txt`
    #[default]
    Annotation,
    /// Trained cascade classifier in `model/cascade.xml`
    Classifier,
}

impl DetectorKind {
    pub fn name(&self) -> &'static str {
        match self {
            DetectorKind::Annotation => "annotation",
            DetectorKind::Classifier => "classifier",
        }
    }
}

impl std::fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for DetectorKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "annotation" | "manual" => Ok(DetectorKind::Annotation),
            "classifier" | "cascade" | "haar" => Ok(DetectorKind::Classifier),
            other => Err(format!(
                "unknown detector '{}' (expected annotation or classifier)",
                other
            )),
        }
    }
}
