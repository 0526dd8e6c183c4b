//! Page Numbering module
//!
//! Stamps a human-facing page number onto a cleaned page.
//!
//! # Features
//!
//! - Book-style placement: even page indexes bottom-right, odd bottom-left
//! - White rounded box with black digits, sized to fit the number
//! - Digits drawn with OpenCV's Hershey simplex font, no font files required
//!
//! # Example
//!
//! ```rust,no_run
//! use page_cleaner::{NumberCorner, PageNumberer};
//! use image::RgbImage;
//!
//! let mut page = RgbImage::new(800, 1200);
//! let placed = PageNumberer::default().stamp(&mut page, 0).unwrap();
//! assert_eq!(placed.corner, NumberCorner::BottomRight);
//! assert_eq!(placed.number, 1);
//! ```

mod types;

use image::{Rgb, RgbImage};
use opencv::core::{Mat, Point, Rect, Scalar, Size};
use opencv::imgproc;

use crate::cv;

pub use types::{
    NumberBox, NumberCorner, PageNumberError, PageNumberOptions, PageNumberOptionsBuilder,
    Result, DEFAULT_BOTTOM_OFFSET, DEFAULT_BOX_INSET, DEFAULT_CORNER_RADIUS,
    DEFAULT_DIGIT_HEIGHT, DEFAULT_SIDE_OFFSET, DEFAULT_TEXT_THICKNESS,
};

const BOX_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const FONT: i32 = imgproc::FONT_HERSHEY_SIMPLEX;

fn scalar(color: Rgb<u8>) -> Scalar {
    let [r, g, b] = color.0;
    Scalar::new(r as f64, g as f64, b as f64, 0.0)
}

/// Draws page numbers
#[derive(Debug, Clone, Default)]
pub struct PageNumberer {
    options: PageNumberOptions,
}

impl PageNumberer {
    pub fn new(options: PageNumberOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PageNumberOptions {
        &self.options
    }

    fn thickness(&self) -> i32 {
        self.options.text_thickness.max(1) as i32
    }

    /// Font scale and rendered size of `text`
    fn measure(&self, text: &str) -> Result<(f64, Size)> {
        let thickness = self.thickness();
        let scale =
            imgproc::get_font_scale_from_height(FONT, self.options.digit_height as i32, thickness)?;
        let mut baseline = 0;
        let size = imgproc::get_text_size(text, FONT, scale, thickness, &mut baseline)?;
        Ok((scale, size))
    }

    /// Compute where the number for `page_index` goes on a page of the
    /// given size, without drawing anything.
    pub fn layout(&self, width: u32, height: u32, page_index: usize) -> Result<NumberBox> {
        let number = page_index + 1;
        let (_, text) = self.measure(&number.to_string())?;

        let box_width = text.width.max(0) as u32 + 2 * self.options.box_inset;
        let box_height = text.height.max(0) as u32 + 2 * self.options.box_inset;

        let too_small = PageNumberError::ImageTooSmall {
            width,
            height,
            box_width,
            box_height,
        };
        if box_width + self.options.side_offset > width {
            return Err(too_small);
        }
        let y = height
            .checked_sub(self.options.bottom_offset + box_height)
            .ok_or(too_small)?;

        let corner = NumberCorner::for_page(page_index);
        let x = match corner {
            NumberCorner::BottomRight => width - self.options.side_offset - box_width,
            NumberCorner::BottomLeft => self.options.side_offset,
        };

        Ok(NumberBox {
            x,
            y,
            width: box_width,
            height: box_height,
            corner,
            number,
        })
    }

    /// Draw the number for zero-based `page_index` onto `image`.
    ///
    /// The image is left untouched when the box does not fit or drawing fails.
    pub fn stamp(&self, image: &mut RgbImage, page_index: usize) -> Result<NumberBox> {
        let placed = self.layout(image.width(), image.height(), page_index)?;
        let text = placed.number.to_string();
        let (scale, size) = self.measure(&text)?;

        let mut mat = cv::rgb_to_mat(image)?;
        self.draw_box(&mut mat, &placed)?;

        // put_text anchors at the bottom-left of the text
        let origin = Point::new(
            placed.x as i32 + (placed.width as i32 - size.width) / 2,
            placed.y as i32 + (placed.height as i32 + size.height) / 2,
        );
        imgproc::put_text(
            &mut mat,
            &text,
            origin,
            FONT,
            scale,
            scalar(TEXT_COLOR),
            self.thickness(),
            imgproc::LINE_8,
            false,
        )?;

        *image = cv::mat_to_rgb(&mat)?;
        Ok(placed)
    }

    fn draw_box(&self, mat: &mut Mat, placed: &NumberBox) -> Result<()> {
        let radius = self
            .options
            .corner_radius
            .min(placed.width / 2)
            .min(placed.height / 2) as i32;
        let (x, y) = (placed.x as i32, placed.y as i32);
        let (w, h) = (placed.width as i32, placed.height as i32);
        let color = scalar(BOX_COLOR);

        let mut fill = |rect: Rect| {
            imgproc::rectangle(&mut *mat, rect, color, imgproc::FILLED, imgproc::LINE_8, 0)
        };
        if radius == 0 {
            fill(Rect::new(x, y, w, h))?;
            return Ok(());
        }

        // cross of two rectangles plus a disc in each corner
        if w > 2 * radius {
            fill(Rect::new(x + radius, y, w - 2 * radius, h))?;
        }
        if h > 2 * radius {
            fill(Rect::new(x, y + radius, w, h - 2 * radius))?;
        }
        let (right, bottom) = (x + w - 1 - radius, y + h - 1 - radius);
        let centers = [
            (x + radius, y + radius),
            (right, y + radius),
            (x + radius, bottom),
            (right, bottom),
        ];
        for (cx, cy) in centers {
            imgproc::circle(
                &mut *mat,
                Point::new(cx, cy),
                radius,
                color,
                imgproc::FILLED,
                imgproc::LINE_8,
                0,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAY: Rgb<u8> = Rgb([128, 128, 128]);

    fn page() -> RgbImage {
        RgbImage::from_pixel(600, 800, GRAY)
    }

    #[test]
    fn test_first_page_bottom_right() {
        let mut image = page();
        let placed = PageNumberer::default().stamp(&mut image, 0).unwrap();

        assert_eq!(placed.number, 1);
        assert_eq!(placed.corner, NumberCorner::BottomRight);
        let (cx, cy) = placed.center();
        assert!(cx > 300.0 && cy > 400.0);
        assert_eq!(placed.x + placed.width, 600 - DEFAULT_SIDE_OFFSET);
        assert_eq!(placed.y + placed.height, 800 - DEFAULT_BOTTOM_OFFSET);
    }

    #[test]
    fn test_second_page_bottom_left() {
        let mut image = page();
        let placed = PageNumberer::default().stamp(&mut image, 1).unwrap();

        assert_eq!(placed.number, 2);
        assert_eq!(placed.corner, NumberCorner::BottomLeft);
        let (cx, cy) = placed.center();
        assert!(cx < 300.0 && cy > 400.0);
        assert_eq!(placed.x, DEFAULT_SIDE_OFFSET);
    }

    #[test]
    fn test_box_drawn_with_digits() {
        let mut image = page();
        let placed = PageNumberer::default().stamp(&mut image, 0).unwrap();

        // inset area is white, digits are black, outside is untouched
        assert_eq!(
            *image.get_pixel(placed.x + 2, placed.y + placed.height / 2),
            BOX_COLOR
        );
        let inside = (placed.y..placed.y + placed.height)
            .flat_map(|y| (placed.x..placed.x + placed.width).map(move |x| (x, y)));
        let inked = inside.filter(|&(x, y)| *image.get_pixel(x, y) == TEXT_COLOR).count();
        assert!(inked > 0);
        assert_eq!(*image.get_pixel(placed.x - 1, placed.y), GRAY);
        assert_eq!(*image.get_pixel(10, 10), GRAY);
    }

    #[test]
    fn test_rounded_corners_keep_background() {
        let mut image = page();
        let placed = PageNumberer::default().stamp(&mut image, 0).unwrap();
        assert_eq!(*image.get_pixel(placed.x, placed.y), GRAY);
        assert_eq!(
            *image.get_pixel(placed.x + placed.width - 1, placed.y + placed.height - 1),
            GRAY
        );
    }

    #[test]
    fn test_wider_box_for_more_digits() {
        let numberer = PageNumberer::default();
        let one = numberer.layout(600, 800, 0).unwrap();
        let three = numberer.layout(600, 800, 122).unwrap();
        assert!(three.width > one.width);
        assert_eq!(three.height, one.height);
        assert_eq!(three.number, 123);
    }

    #[test]
    fn test_image_too_small() {
        let mut image = RgbImage::from_pixel(60, 60, GRAY);
        let before = image.clone();
        let result = PageNumberer::default().stamp(&mut image, 4);
        assert!(matches!(result, Err(PageNumberError::ImageTooSmall { .. })));
        assert_eq!(image, before);
    }

    #[test]
    fn test_custom_options() {
        let options = PageNumberOptions::builder()
            .offsets(5, 5)
            .box_inset(2)
            .corner_radius(0)
            .digit_height(14)
            .text_thickness(1)
            .build();
        let mut image = RgbImage::from_pixel(60, 60, GRAY);
        let placed = PageNumberer::new(options).stamp(&mut image, 0).unwrap();

        assert_eq!(placed.x + placed.width, 55);
        assert_eq!(placed.y + placed.height, 55);
        assert!(placed.height < 30);
        // square corners with no radius
        assert_eq!(*image.get_pixel(placed.x, placed.y), BOX_COLOR);
    }
}
