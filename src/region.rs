//! Rectangle types shared by detection, annotation and inpainting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Axis-aligned rectangle in image pixel space.
///
/// Coordinates are real-valued because annotations come from a UI that works
/// in fractional pixels; every consumer rounds through [`Region::to_pixel_rect`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Region {
    /// Create a new region
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check that the region has a usable, non-negative extent
    pub fn is_valid(&self) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.width > 0.0
            && self.height > 0.0
            && self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }

    /// Round each edge to the nearest integer pixel.
    ///
    /// Edges are rounded rather than the size, so regions sharing an edge
    /// in real coordinates also share it in pixels.
    pub fn to_pixel_rect(&self) -> PixelRect {
        let left = self.x.round().max(0.0);
        let top = self.y.round().max(0.0);
        let right = (self.x + self.width).round().max(left);
        let bottom = (self.y + self.height).round().max(top);
        PixelRect {
            x: left as u32,
            y: top as u32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.x, self.y, self.width, self.height
        )
    }
}

impl FromStr for Region {
    type Err = String;

    /// Parse `x,y,w,h`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(format!("expected x,y,w,h but got '{}'", s));
        }

        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| format!("'{}' is not a number in '{}'", part, s))?;
        }

        let region = Region::new(values[0], values[1], values[2], values[3]);
        if !region.is_valid() {
            return Err(format!("region '{}' must have positive size", s));
        }
        Ok(region)
    }
}

/// Region produced by the cascade classifier, with its diagnostics attached
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedRegion {
    #[serde(flatten)]
    pub region: Region,
    /// Number of stages the window passed
    pub reject_level: i32,
    /// Sum of the final stage's weak classifiers
    pub weight: f64,
}

impl From<DetectedRegion> for Region {
    fn from(detected: DetectedRegion) -> Self {
        detected.region
    }
}

/// Integer pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// Clamp to an image of the given size; `None` when nothing remains
    pub fn clamp_to(&self, image_width: u32, image_height: u32) -> Option<PixelRect> {
        if self.x >= image_width || self.y >= image_height {
            return None;
        }
        let width = self.width.min(image_width - self.x);
        let height = self.height.min(image_height - self.y);
        if width == 0 || height == 0 {
            return None;
        }
        Some(PixelRect {
            x: self.x,
            y: self.y,
            width,
            height,
        })
    }

    /// Whether the pixel (px, py) lies inside
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x
            && py >= self.y
            && px < self.x.saturating_add(self.width)
            && py < self.y.saturating_add(self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_pixel_rect_rounds_to_nearest() {
        let rect = Region::new(10.4, 10.6, 20.5, 3.49).to_pixel_rect();
        assert_eq!(rect.x, 10);
        assert_eq!(rect.y, 11);
        assert_eq!(rect.width, 21);
        assert_eq!(rect.height, 3);
    }

    #[test]
    fn test_to_pixel_rect_adjacent_regions_share_edge() {
        let left = Region::new(0.0, 0.0, 10.5, 4.0).to_pixel_rect();
        let right = Region::new(10.5, 0.0, 10.5, 4.0).to_pixel_rect();

        assert_eq!(left.x + left.width, right.x);
        assert_eq!(right.x + right.width, 21);

        let top = Region::new(0.0, 2.4, 5.0, 3.2).to_pixel_rect();
        let below = Region::new(0.0, 5.6, 5.0, 1.0).to_pixel_rect();
        assert_eq!(top.y + top.height, below.y);
    }

    #[test]
    fn test_to_pixel_rect_clips_negative_origin() {
        let rect = Region::new(-2.0, -0.6, 5.0, 3.0).to_pixel_rect();
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (0, 0, 3, 2));
    }

    #[test]
    fn test_region_validity() {
        assert!(Region::new(0.0, 0.0, 1.0, 1.0).is_valid());
        assert!(!Region::new(0.0, 0.0, 0.0, 1.0).is_valid());
        assert!(!Region::new(-1.0, 0.0, 5.0, 1.0).is_valid());
        assert!(!Region::new(0.0, 0.0, f64::NAN, 1.0).is_valid());
    }

    #[test]
    fn test_parse_region() {
        let region: Region = "1,2,30,40".parse().unwrap();
        assert_eq!(region, Region::new(1.0, 2.0, 30.0, 40.0));

        let spaced: Region = " 1.5 , 2 , 3 , 4 ".parse().unwrap();
        assert_eq!(spaced.x, 1.5);

        assert!("1,2,3".parse::<Region>().is_err());
        assert!("a,2,3,4".parse::<Region>().is_err());
        assert!("1,2,0,4".parse::<Region>().is_err());
    }

    #[test]
    fn test_clamp_to_image() {
        let rect = PixelRect {
            x: 90,
            y: 90,
            width: 20,
            height: 20,
        };
        let clamped = rect.clamp_to(100, 100).unwrap();
        assert_eq!((clamped.width, clamped.height), (10, 10));

        let outside = PixelRect {
            x: 100,
            y: 0,
            width: 5,
            height: 5,
        };
        assert!(outside.clamp_to(100, 100).is_none());
    }

    #[test]
    fn test_contains() {
        let rect = PixelRect {
            x: 2,
            y: 2,
            width: 3,
            height: 3,
        };
        assert!(rect.contains(2, 2));
        assert!(rect.contains(4, 4));
        assert!(!rect.contains(5, 4));
        assert!(!rect.contains(1, 3));
    }

    #[test]
    fn test_detected_region_into_region() {
        let detected = DetectedRegion {
            region: Region::new(1.0, 2.0, 3.0, 4.0),
            reject_level: 20,
            weight: 1.5,
        };
        let region: Region = detected.into();
        assert_eq!(region, Region::new(1.0, 2.0, 3.0, 4.0));
    }
}
