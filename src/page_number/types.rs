//! Page Number module core types

use thiserror::Error;

// ============================================================
// Constants
// ============================================================

/// Horizontal distance between the number box and the page edge
pub const DEFAULT_SIDE_OFFSET: u32 = 30;

/// Vertical distance between the number box and the bottom edge
pub const DEFAULT_BOTTOM_OFFSET: u32 = 30;

/// Padding between the digits and the box border
pub const DEFAULT_BOX_INSET: u32 = 20;

/// Corner radius of the number box
pub const DEFAULT_CORNER_RADIUS: u32 = 10;

/// Target digit height in pixels
pub const DEFAULT_DIGIT_HEIGHT: u32 = 50;

/// Stroke thickness of the digits
pub const DEFAULT_TEXT_THICKNESS: u32 = 2;

// ============================================================
// Error Types
// ============================================================

/// Page numbering error types
#[derive(Debug, Error)]
pub enum PageNumberError {
    #[error("Image {width}x{height} is too small for a {box_width}x{box_height} page number box")]
    ImageTooSmall {
        width: u32,
        height: u32,
        box_width: u32,
        box_height: u32,
    },

    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),
}

pub type Result<T> = std::result::Result<T, PageNumberError>;

// ============================================================
// Core Data Structures
// ============================================================

/// Bottom corner holding the page number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberCorner {
    BottomRight,
    BottomLeft,
}

impl NumberCorner {
    /// Recto pages (even zero-based index) are numbered on the right
    pub fn for_page(page_index: usize) -> Self {
        if page_index % 2 == 0 {
            NumberCorner::BottomRight
        } else {
            NumberCorner::BottomLeft
        }
    }
}

/// Where a page number was drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub corner: NumberCorner,
    /// Human-facing number (page index + 1)
    pub number: usize,
}

impl NumberBox {
    /// Centre of the box
    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }
}

/// Page number layout options
#[derive(Debug, Clone, PartialEq)]
pub struct PageNumberOptions {
    pub side_offset: u32,
    pub bottom_offset: u32,
    pub box_inset: u32,
    pub corner_radius: u32,
    pub digit_height: u32,
    pub text_thickness: u32,
}

impl Default for PageNumberOptions {
    fn default() -> Self {
        Self {
            side_offset: DEFAULT_SIDE_OFFSET,
            bottom_offset: DEFAULT_BOTTOM_OFFSET,
            box_inset: DEFAULT_BOX_INSET,
            corner_radius: DEFAULT_CORNER_RADIUS,
            digit_height: DEFAULT_DIGIT_HEIGHT,
            text_thickness: DEFAULT_TEXT_THICKNESS,
        }
    }
}

impl PageNumberOptions {
    /// Create a new options builder
    pub fn builder() -> PageNumberOptionsBuilder {
        PageNumberOptionsBuilder::default()
    }
}

/// Builder for PageNumberOptions
#[derive(Debug, Default)]
pub struct PageNumberOptionsBuilder {
    options: PageNumberOptions,
}

impl PageNumberOptionsBuilder {
    /// Set the distance from the side and bottom edges
    #[must_use]
    pub fn offsets(mut self, side: u32, bottom: u32) -> Self {
        self.options.side_offset = side;
        self.options.bottom_offset = bottom;
        self
    }

    /// Set the padding inside the box
    #[must_use]
    pub fn box_inset(mut self, inset: u32) -> Self {
        self.options.box_inset = inset;
        self
    }

    /// Set the corner radius
    #[must_use]
    pub fn corner_radius(mut self, radius: u32) -> Self {
        self.options.corner_radius = radius;
        self
    }

    /// Set the digit height
    #[must_use]
    pub fn digit_height(mut self, height: u32) -> Self {
        self.options.digit_height = height.max(4);
        self
    }

    /// Set the digit stroke thickness
    #[must_use]
    pub fn text_thickness(mut self, thickness: u32) -> Self {
        self.options.text_thickness = thickness.max(1);
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> PageNumberOptions {
        self.options
    }
}
