//! Common types for the annotation module

use std::path::PathBuf;
use thiserror::Error;

use crate::region::Region;

/// Annotation store error types
#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("Failed to read positive annotations for {image}: {message}")]
    Parse { image: String, message: String },

    #[error("Region {region} lies outside image {image} ({width}x{height})")]
    RegionOutOfBounds {
        image: String,
        region: Region,
        width: u32,
        height: u32,
    },

    #[error("Failed to write crop {path}: {message}")]
    CropWrite { path: PathBuf, message: String },

    #[error("Failed to replace {path}: {message}")]
    Persist { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AnnotationError>;
