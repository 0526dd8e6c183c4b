//! Annotation store
//!
//! Durable, mergeable persistence of per-image sample regions in the
//! formats consumed by the OpenCV cascade training tools:
//!
//! - **Positive** ([`positive`]) - one line per image in `pos.txt`
//! - **Negative** ([`negative`]) - crop images in `negative/`, listed in `neg.txt`
//!
//! Every write is a read-modify-write of a file shared by all images. Writes
//! for different images may be interleaved as long as they are serialized;
//! callers must never write the same image concurrently.
//!
//! # Example
//!
//! ```rust,no_run
//! use page_cleaner::{AnnotationStore, Region, WorkingDirectory};
//!
//! let store = AnnotationStore::new(WorkingDirectory::new("project"));
//! store
//!     .write_positive("1_a-1.jpg", &[Region::new(10.0, 10.0, 50.0, 20.0)])
//!     .unwrap();
//! let regions = store.read_positive("1_a-1.jpg").unwrap();
//! assert_eq!(regions.len(), 1);
//! ```

mod manifest;
pub mod negative;
pub mod positive;
mod types;

use std::collections::HashSet;
use std::path::Path;

use image::DynamicImage;
use tracing::{debug, warn};

use crate::region::Region;
use crate::workdir::{annotation_key, WorkingDirectory};

pub use manifest::{read_lines, rewrite_manifest};
pub use types::{AnnotationError, Result};

/// Reads and writes the annotation manifests of one working directory
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    workdir: WorkingDirectory,
}

impl AnnotationStore {
    pub fn new(workdir: WorkingDirectory) -> Self {
        Self { workdir }
    }

    pub fn workdir(&self) -> &WorkingDirectory {
        &self.workdir
    }

    /// Replace the positive annotations of one image.
    ///
    /// Lines of other images keep their order; the new line is appended.
    /// An empty `regions` removes the image's line entirely.
    pub fn write_positive(&self, image_id: &str, regions: &[Region]) -> Result<()> {
        let key = annotation_key(image_id);
        let lines_to_add = if regions.is_empty() {
            Vec::new()
        } else {
            vec![positive::format_line(image_id, regions)]
        };

        rewrite_manifest(&self.workdir.positive_manifest(), &lines_to_add, |line| {
            positive::line_key(line) != key
        })?;

        debug!(image = image_id, count = regions.len(), "wrote positive annotations");
        Ok(())
    }

    /// Read the positive annotations of one image.
    ///
    /// Returns an empty list when `pos.txt` is absent or has no line for the
    /// image. A count mismatch on the image's line is an error.
    pub fn read_positive(&self, image_id: &str) -> Result<Vec<Region>> {
        let key = annotation_key(image_id);
        let lines = read_lines(&self.workdir.positive_manifest())?;

        match lines.iter().find(|line| positive::line_key(line) == key) {
            Some(line) => positive::parse_line(image_id, line),
            None => Ok(Vec::new()),
        }
    }

    /// Regenerate the negative crops of one image.
    ///
    /// Each region is cut out of `image` and written to `negative/`, the
    /// image's entries in `neg.txt` are replaced by the new filenames, and
    /// only then are the image's previous crops deleted. The new filenames
    /// are returned. If a crop or the manifest cannot be written, the crops
    /// written so far are removed and `neg.txt` keeps its previous entries.
    pub fn write_negative(
        &self,
        image_id: &str,
        image: &DynamicImage,
        regions: &[Region],
    ) -> Result<Vec<String>> {
        let base_millis = chrono::Utc::now().timestamp_millis();
        self.write_negative_at(image_id, image, regions, base_millis)
    }

    fn write_negative_at(
        &self,
        image_id: &str,
        image: &DynamicImage,
        regions: &[Region],
        base_millis: i64,
    ) -> Result<Vec<String>> {
        let (width, height) = (image.width(), image.height());

        // Validate before touching anything on disk
        let rects = regions
            .iter()
            .map(|region| {
                region
                    .to_pixel_rect()
                    .clamp_to(width, height)
                    .ok_or_else(|| AnnotationError::RegionOutOfBounds {
                        image: image_id.to_string(),
                        region: *region,
                        width,
                        height,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let negative_dir = self.workdir.negative_dir();
        std::fs::create_dir_all(&negative_dir)?;

        let mut previous = HashSet::new();
        for entry in std::fs::read_dir(&negative_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_file() && negative::is_crop_of(image_id, &name) {
                previous.insert(name);
            }
        }

        let mut new_names = Vec::with_capacity(rects.len());
        for (offset, rect) in rects.iter().enumerate() {
            let name = negative::crop_filename(image_id, base_millis + offset as i64);
            let path = negative_dir.join(&name);
            let saved = image
                .crop_imm(rect.x, rect.y, rect.width, rect.height)
                .to_rgb8()
                .save(&path)
                .map_err(|e| AnnotationError::CropWrite {
                    path: path.clone(),
                    message: e.to_string(),
                });
            if let Err(e) = saved {
                discard_crops(&negative_dir, &new_names, &previous);
                return Err(e);
            }
            new_names.push(name);
        }

        let rewritten = rewrite_manifest(&self.workdir.negative_manifest(), &new_names, |line| {
            !previous.contains(line) && !negative::is_crop_of(image_id, line)
        });
        if let Err(e) = rewritten {
            discard_crops(&negative_dir, &new_names, &previous);
            return Err(e);
        }

        // neg.txt no longer lists the old crops
        let mut removed = 0;
        for name in previous.iter().filter(|name| !new_names.contains(name)) {
            match std::fs::remove_file(negative_dir.join(name)) {
                Ok(()) => removed += 1,
                Err(e) => warn!(crop = %name, error = %e, "failed to delete stale negative crop"),
            }
        }

        debug!(
            image = image_id,
            removed,
            written = new_names.len(),
            "regenerated negative crops"
        );
        Ok(new_names)
    }
}

/// Remove freshly written crops, sparing any that replaced a previous crop
/// of the same name.
fn discard_crops(dir: &Path, written: &[String], previous: &HashSet<String>) {
    for name in written.iter().filter(|name| !previous.contains(*name)) {
        if let Err(e) = std::fs::remove_file(dir.join(name)) {
            warn!(crop = %name, error = %e, "failed to remove partial negative crop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn store() -> (TempDir, AnnotationStore) {
        let temp = TempDir::new().unwrap();
        let store = AnnotationStore::new(WorkingDirectory::new(temp.path()));
        (temp, store)
    }

    fn page() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 80, Rgb([200, 200, 200])))
    }

    #[test]
    fn test_read_positive_without_file() {
        let (_temp, store) = store();
        assert!(store.read_positive("1_a-1.jpg").unwrap().is_empty());
    }

    #[test]
    fn test_positive_round_trip() {
        let (_temp, store) = store();
        let regions = vec![
            Region::new(10.0, 20.0, 30.0, 40.0),
            Region::new(50.2, 5.7, 10.0, 12.4),
        ];

        store.write_positive("1_a-1.jpg", &regions).unwrap();
        let read = store.read_positive("1_a-1.jpg").unwrap();

        let expected: Vec<_> = regions.iter().map(Region::to_pixel_rect).collect();
        let actual: Vec<_> = read.iter().map(Region::to_pixel_rect).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_write_positive_preserves_other_images() {
        let (_temp, store) = store();
        store
            .write_positive("1_a-1.jpg", &[Region::new(1.0, 1.0, 5.0, 5.0)])
            .unwrap();
        store
            .write_positive("2_a-1.jpg", &[Region::new(2.0, 2.0, 6.0, 6.0)])
            .unwrap();

        // overwrite the first image
        store
            .write_positive("1_a-1.jpg", &[Region::new(3.0, 3.0, 7.0, 7.0)])
            .unwrap();

        let content = std::fs::read_to_string(store.workdir().positive_manifest()).unwrap();
        assert_eq!(
            content,
            "source/2_a-1.jpg  1  2 2 6 6\nsource/1_a-1.jpg  1  3 3 7 7\n"
        );
        assert_eq!(
            store.read_positive("2_a-1.jpg").unwrap(),
            vec![Region::new(2.0, 2.0, 6.0, 6.0)]
        );
    }

    #[test]
    fn test_write_empty_removes_line() {
        let (_temp, store) = store();
        store
            .write_positive("1_a-1.jpg", &[Region::new(1.0, 1.0, 5.0, 5.0)])
            .unwrap();
        store
            .write_positive("10_a-1.jpg", &[Region::new(1.0, 1.0, 5.0, 5.0)])
            .unwrap();

        store.write_positive("1_a-1.jpg", &[]).unwrap();

        assert!(store.read_positive("1_a-1.jpg").unwrap().is_empty());
        assert_eq!(store.read_positive("10_a-1.jpg").unwrap().len(), 1);
    }

    #[test]
    fn test_read_positive_count_mismatch() {
        let (_temp, store) = store();
        std::fs::write(
            store.workdir().positive_manifest(),
            "source/1_a-1.jpg  2  1 2 3 4\n",
        )
        .unwrap();

        let err = store.read_positive("1_a-1.jpg").unwrap_err();
        assert!(matches!(err, AnnotationError::Parse { ref image, .. } if image == "1_a-1.jpg"));
        assert!(err.to_string().contains("1_a-1.jpg"));
    }

    #[test]
    fn test_read_positive_ignores_broken_lines_of_other_images() {
        let (_temp, store) = store();
        std::fs::write(
            store.workdir().positive_manifest(),
            "source/2_a-1.jpg  9  1 2 3 4\nsource/1_a-1.jpg  1  1 2 3 4\n",
        )
        .unwrap();

        assert_eq!(store.read_positive("1_a-1.jpg").unwrap().len(), 1);
    }

    #[test]
    fn test_write_negative_creates_crops_and_manifest() {
        let (_temp, store) = store();
        let regions = vec![
            Region::new(0.0, 0.0, 10.0, 10.0),
            Region::new(20.0, 20.0, 30.0, 15.0),
        ];

        let names = store.write_negative("1_a-1.jpg", &page(), &regions).unwrap();

        assert_eq!(names.len(), 2);
        assert_ne!(names[0], names[1]);
        for name in &names {
            assert!(name.starts_with("1_a-1.jpg_"));
            assert!(store.workdir().negative_dir().join(name).is_file());
        }

        let crop = image::open(store.workdir().negative_dir().join(&names[1])).unwrap();
        assert_eq!((crop.width(), crop.height()), (30, 15));

        let manifest = read_lines(&store.workdir().negative_manifest()).unwrap();
        assert_eq!(manifest, names);
    }

    #[test]
    fn test_write_negative_replaces_previous_crops() {
        let (_temp, store) = store();
        let first = store
            .write_negative("1_a-1.jpg", &page(), &[Region::new(0.0, 0.0, 5.0, 5.0)])
            .unwrap();
        let other = store
            .write_negative("1_a-10.jpg", &page(), &[Region::new(0.0, 0.0, 5.0, 5.0)])
            .unwrap();

        // crop names carry millisecond timestamps
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = store
            .write_negative("1_a-1.jpg", &page(), &[Region::new(1.0, 1.0, 6.0, 6.0)])
            .unwrap();

        assert!(!store.workdir().negative_dir().join(&first[0]).exists());
        assert!(store.workdir().negative_dir().join(&other[0]).exists());
        assert!(store.workdir().negative_dir().join(&second[0]).exists());

        let manifest = read_lines(&store.workdir().negative_manifest()).unwrap();
        assert_eq!(manifest, vec![other[0].clone(), second[0].clone()]);
    }

    #[test]
    fn test_write_negative_empty_clears_image() {
        let (_temp, store) = store();
        store
            .write_negative("1_a-1.jpg", &page(), &[Region::new(0.0, 0.0, 5.0, 5.0)])
            .unwrap();

        let names = store.write_negative("1_a-1.jpg", &page(), &[]).unwrap();

        assert!(names.is_empty());
        assert!(read_lines(&store.workdir().negative_manifest())
            .unwrap()
            .is_empty());
        assert_eq!(
            std::fs::read_dir(store.workdir().negative_dir())
                .unwrap()
                .count(),
            0
        );
    }

    #[test]
    fn test_write_negative_rejects_out_of_bounds() {
        let (_temp, store) = store();
        let result =
            store.write_negative("1_a-1.jpg", &page(), &[Region::new(500.0, 0.0, 5.0, 5.0)]);
        assert!(matches!(
            result,
            Err(AnnotationError::RegionOutOfBounds { .. })
        ));
        assert!(!store.workdir().negative_manifest().exists());
    }

    #[test]
    fn test_failed_negative_write_keeps_listed_crops() {
        let (_temp, store) = store();
        let first = store
            .write_negative("1_a-1.jpg", &page(), &[Region::new(0.0, 0.0, 5.0, 5.0)])
            .unwrap();

        // a directory squatting on the second crop name makes its save fail
        let negative_dir = store.workdir().negative_dir();
        let base = 1_000;
        std::fs::create_dir(negative_dir.join(negative::crop_filename("1_a-1.jpg", base + 1)))
            .unwrap();

        let regions = [
            Region::new(0.0, 0.0, 10.0, 10.0),
            Region::new(20.0, 20.0, 10.0, 10.0),
        ];
        let result = store.write_negative_at("1_a-1.jpg", &page(), &regions, base);
        assert!(matches!(result, Err(AnnotationError::CropWrite { .. })));

        let manifest = read_lines(&store.workdir().negative_manifest()).unwrap();
        assert_eq!(manifest, first);
        for name in &manifest {
            assert!(negative_dir.join(name).is_file(), "{name} is listed but missing");
        }
        assert!(!negative_dir
            .join(negative::crop_filename("1_a-1.jpg", base))
            .exists());
    }
}
