//! Detector backed by hand-made positive annotations

use std::path::Path;

use image::DynamicImage;

use crate::annotation::AnnotationStore;
use crate::region::Region;
use crate::workdir::WorkingDirectory;

use super::types::{DetectError, RegionDetector, Result};

/// Returns the regions saved for an image in `pos.txt`.
///
/// Lets a human mark regions ahead of a run instead of relying on the
/// classifier, e.g. for ground truth or guaranteed-correct cleaning.
#[derive(Debug, Clone)]
pub struct AnnotationDetector {
    store: AnnotationStore,
}

impl AnnotationDetector {
    pub fn new(workdir: WorkingDirectory) -> Self {
        Self {
            store: AnnotationStore::new(workdir),
        }
    }
}

impl RegionDetector for AnnotationDetector {
    fn detect(&self, image_path: &Path, _image: &DynamicImage) -> Result<Vec<Region>> {
        let image_id = image_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| DetectError::InvalidImage {
                path: image_path.to_path_buf(),
                message: "path has no UTF-8 file name".to_string(),
            })?;

        Ok(self.store.read_positive(image_id)?)
    }

    fn name(&self) -> &'static str {
        "annotation"
    }
}
