//! Negative crops (`negative/` + `neg.txt`)

use std::path::Path;

/// Extension of every crop written
pub const CROP_EXTENSION: &str = "jpg";

/// Filename for the crop of `image_id` taken at `timestamp_millis`
pub fn crop_filename(image_id: &str, timestamp_millis: i64) -> String {
    format!("{}_{}.{}", image_id, timestamp_millis, CROP_EXTENSION)
}

/// Whether `name` is a crop file belonging to `image_id`.
///
/// Matches on the stem followed by `.` or `_`, so `1_a-1.jpg` owns
/// `1_a-1.jpg_1700000000000.jpg` but not the crops of `1_a-10.jpg`.
pub fn is_crop_of(image_id: &str, name: &str) -> bool {
    let stem = Path::new(image_id)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(image_id);

    match name.strip_prefix(stem) {
        Some(rest) => rest.starts_with('.') || rest.starts_with('_'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_filename() {
        assert_eq!(
            crop_filename("1_a-1.jpg", 1_700_000_000_000),
            "1_a-1.jpg_1700000000000.jpg"
        );
    }

    #[test]
    fn test_is_crop_of() {
        assert!(is_crop_of("1_a-1.jpg", "1_a-1.jpg_1700000000000.jpg"));
        assert!(is_crop_of("1_a-1.jpg", "1_a-1_legacy.jpg"));
        assert!(!is_crop_of("1_a-1.jpg", "1_a-10.jpg_1700000000000.jpg"));
        assert!(!is_crop_of("1_a-1.jpg", "2_a-1.jpg_1700000000000.jpg"));
    }
}
