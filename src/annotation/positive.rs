//! Positive annotation lines (`pos.txt`)
//!
//! One line per annotated image, in the layout expected by
//! `opencv_createsamples -info`:
//!
//! ```text
//! source/<filename>  <N>  <x> <y> <w> <h>  <x> <y> <w> <h>
//! ```
//!
//! Fields are separated by two spaces; numbers inside a tuple by one.

use crate::region::Region;
use crate::workdir::annotation_key;

use super::types::{AnnotationError, Result};

/// Separator between the path, the count and each region tuple
pub const FIELD_SEPARATOR: &str = "  ";

/// Numbers per region tuple
const REGION_PART_COUNT: usize = 4;

/// Format the line for one image. Coordinates are rounded to integers.
pub fn format_line(image_id: &str, regions: &[Region]) -> String {
    let mut line = format!(
        "{}{}{}",
        annotation_key(image_id),
        FIELD_SEPARATOR,
        regions.len()
    );
    for region in regions {
        let rect = region.to_pixel_rect();
        line.push_str(FIELD_SEPARATOR);
        line.push_str(&format!(
            "{} {} {} {}",
            rect.x, rect.y, rect.width, rect.height
        ));
    }
    line
}

/// The path field of a line: everything before the first separator
pub fn line_key(line: &str) -> &str {
    match line.split_once(FIELD_SEPARATOR) {
        Some((key, _)) => key,
        None => line.trim_end(),
    }
}

/// Parse the regions of a line belonging to `image_id`.
///
/// The declared count must match the number of tuples that follow.
pub fn parse_line(image_id: &str, line: &str) -> Result<Vec<Region>> {
    let parse_error = |message: String| AnnotationError::Parse {
        image: image_id.to_string(),
        message,
    };

    let (_, rest) = line
        .split_once(FIELD_SEPARATOR)
        .ok_or_else(|| parse_error("line has no annotation count".to_string()))?;

    let mut tokens = rest.split_whitespace();
    let count_token = tokens
        .next()
        .ok_or_else(|| parse_error("line has no annotation count".to_string()))?;
    let declared: usize = count_token
        .parse()
        .map_err(|_| parse_error(format!("invalid annotation count '{}'", count_token)))?;

    let values = tokens
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| parse_error(format!("invalid coordinate '{}'", token)))
        })
        .collect::<Result<Vec<f64>>>()?;

    if values.len() % REGION_PART_COUNT != 0 {
        return Err(parse_error(format!(
            "incomplete region tuple ({} trailing values)",
            values.len() % REGION_PART_COUNT
        )));
    }

    let found = values.len() / REGION_PART_COUNT;
    if found != declared {
        return Err(parse_error(format!(
            "file declared {} annotations but {} were found",
            declared, found
        )));
    }

    Ok(values
        .chunks_exact(REGION_PART_COUNT)
        .map(|chunk| Region::new(chunk[0], chunk[1], chunk[2], chunk[3]))
        .collect())
}
