//! Encoding of processed pages

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};

use super::types::{PipelineError, Result};

/// Write `image` in the format named by the extension of `path`.
///
/// JPEG output is encoded at `jpeg_quality`; other formats use the
/// encoder defaults.
pub fn save_image(image: &DynamicImage, path: &Path, jpeg_quality: u8) -> Result<()> {
    let write_error = |message: String| PipelineError::ImageWrite {
        path: path.to_path_buf(),
        message,
    };

    let format = ImageFormat::from_path(path).map_err(|e| write_error(e.to_string()))?;

    match format {
        ImageFormat::Jpeg => {
            let file = File::create(path).map_err(|e| write_error(e.to_string()))?;
            let mut writer = BufWriter::new(file);
            let encoder = JpegEncoder::new_with_quality(&mut writer, jpeg_quality);
            // JPEG has no alpha channel
            DynamicImage::ImageRgb8(image.to_rgb8())
                .write_with_encoder(encoder)
                .map_err(|e| write_error(e.to_string()))?;
            writer.flush().map_err(|e| write_error(e.to_string()))
        }
        other => image
            .save_with_format(path, other)
            .map_err(|e| write_error(e.to_string())),
    }
}

/// Copy the source file byte for byte
pub fn copy_unchanged(source: &Path, destination: &Path) -> Result<()> {
    std::fs::copy(source, destination)
        .map(|_| ())
        .map_err(|e| PipelineError::ImageWrite {
            path: destination.to_path_buf(),
            message: e.to_string(),
        })
}
