//! Common types for the inpaint module

use thiserror::Error;

/// Inpainting error types
#[derive(Debug, Error)]
pub enum InpaintError {
    #[error("Invalid inpaint radius: {0}")]
    InvalidRadius(f64),

    #[error("Regions cover the whole {width}x{height} image; nothing left to inpaint from")]
    NoKnownPixels { width: u32, height: u32 },

    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),
}

pub type Result<T> = std::result::Result<T, InpaintError>;
