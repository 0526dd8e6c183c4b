//! Inpainting of detected regions
//!
//! Paints over rectangular regions using the surrounding image content.
//!
//! # Algorithm
//!
//! 1. Build a binary mask the size of the image with every region filled in
//!    at its integer-rounded bounds
//! 2. Run OpenCV's Telea fast-marching inpainting over the mask
//!
//! Pixels outside the mask are copied from the source unchanged.

mod types;

use image::DynamicImage;
use opencv::core::{self, Mat, Rect, Scalar, CV_8UC1};
use opencv::prelude::*;
use opencv::{imgproc, photo};
use tracing::trace;

use crate::cv;
use crate::region::Region;

pub use types::{InpaintError, Result};

/// Default neighbourhood radius in pixels
pub const DEFAULT_INPAINT_RADIUS: f64 = 1.0;

/// Mask value marking pixels to reconstruct
pub const MASK_REMOVE: u8 = 255;

/// Telea inpainter with a fixed neighbourhood radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inpainter {
    radius: f64,
}

impl Default for Inpainter {
    fn default() -> Self {
        Self {
            radius: DEFAULT_INPAINT_RADIUS,
        }
    }
}

impl Inpainter {
    /// Create an inpainter; the radius must be positive and finite
    pub fn new(radius: f64) -> Result<Self> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(InpaintError::InvalidRadius(radius));
        }
        Ok(Self { radius })
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Reconstruct `regions` of `image` from their surroundings.
    ///
    /// With no regions the image is returned as is. Otherwise the result is
    /// an RGB image of the same size.
    pub fn inpaint(&self, image: &DynamicImage, regions: &[Region]) -> Result<DynamicImage> {
        if regions.is_empty() {
            return Ok(image.clone());
        }

        let (width, height) = (image.width(), image.height());
        let mask = build_mask(width, height, regions)?;
        if core::count_non_zero(&mask)? as u64 == width as u64 * height as u64 {
            return Err(InpaintError::NoKnownPixels { width, height });
        }

        let source = cv::rgb_to_mat(&image.to_rgb8())?;
        trace!(regions = regions.len(), width, height, "inpainting");

        let mut output = Mat::default();
        photo::inpaint(&source, &mask, &mut output, self.radius, photo::INPAINT_TELEA)?;
        Ok(DynamicImage::ImageRgb8(cv::mat_to_rgb(&output)?))
    }
}

/// Binary mask with every region filled with [`MASK_REMOVE`].
///
/// Regions are clipped to the image; overlapping regions simply overlap.
pub fn build_mask(width: u32, height: u32, regions: &[Region]) -> opencv::Result<Mat> {
    let mut mask =
        Mat::new_rows_cols_with_default(height as i32, width as i32, CV_8UC1, Scalar::all(0.0))?;
    for region in regions {
        let rect = region.to_pixel_rect();
        if rect.width == 0 || rect.height == 0 {
            continue;
        }
        imgproc::rectangle(
            &mut mask,
            Rect::new(
                rect.x as i32,
                rect.y as i32,
                rect.width as i32,
                rect.height as i32,
            ),
            Scalar::all(MASK_REMOVE as f64),
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )?;
    }
    Ok(mask)
}
