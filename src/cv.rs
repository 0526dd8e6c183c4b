//! Conversions between `image` buffers and OpenCV matrices
//!
//! Pages are decoded and encoded with the `image` crate; detection,
//! inpainting and drawing run on OpenCV `Mat`s. Colour matrices keep the
//! RGB channel order of the source buffer.

use image::{GrayImage, RgbImage};
use opencv::core::{self, Mat, Scalar, CV_8UC1, CV_8UC3};
use opencv::imgproc;
use opencv::prelude::*;

/// Copy an RGB buffer into a new 8-bit, 3-channel matrix
pub fn rgb_to_mat(image: &RgbImage) -> opencv::Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        image.height() as i32,
        image.width() as i32,
        CV_8UC3,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(image.as_raw());
    Ok(mat)
}

/// Copy a grayscale buffer into a new 8-bit, single-channel matrix
pub fn gray_to_mat(image: &GrayImage) -> opencv::Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        image.height() as i32,
        image.width() as i32,
        CV_8UC1,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(image.as_raw());
    Ok(mat)
}

/// Grayscale matrix of an RGB buffer, using OpenCV's luma weights
pub fn rgb_to_gray_mat(image: &RgbImage) -> opencv::Result<Mat> {
    let rgb = rgb_to_mat(image)?;
    let mut gray = Mat::default();
    imgproc::cvt_color_def(&rgb, &mut gray, imgproc::COLOR_RGB2GRAY)?;
    Ok(gray)
}

/// Copy an 8-bit, 3-channel matrix back into an RGB buffer
pub fn mat_to_rgb(mat: &Mat) -> opencv::Result<RgbImage> {
    if mat.typ() != CV_8UC3 {
        return Err(opencv::Error::new(
            core::StsUnsupportedFormat,
            format!("expected an 8-bit 3-channel matrix, got type {}", mat.typ()),
        ));
    }

    let (width, height) = (mat.cols() as u32, mat.rows() as u32);
    let bytes = if mat.is_continuous() {
        mat.data_bytes()?.to_vec()
    } else {
        mat.try_clone()?.data_bytes()?.to_vec()
    };

    RgbImage::from_raw(width, height, bytes).ok_or_else(|| {
        opencv::Error::new(
            core::StsError,
            format!("matrix data does not fill a {}x{} image", width, height),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn test_rgb_round_trip_keeps_channels() {
        let image = RgbImage::from_fn(7, 5, |x, y| Rgb([x as u8 * 30, y as u8 * 40, 200]));
        let mat = rgb_to_mat(&image).unwrap();

        assert_eq!((mat.cols(), mat.rows()), (7, 5));
        assert_eq!(*mat.at_2d::<core::Vec3b>(4, 6).unwrap(), core::Vec3b::from([180, 160, 200]));
        assert_eq!(mat_to_rgb(&mat).unwrap(), image);
    }

    #[test]
    fn test_gray_conversion() {
        let image = RgbImage::from_fn(4, 2, |x, _| if x < 2 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) });
        let gray = rgb_to_gray_mat(&image).unwrap();

        assert_eq!(gray.typ(), CV_8UC1);
        assert_eq!(*gray.at_2d::<u8>(0, 0).unwrap(), 0);
        assert_eq!(*gray.at_2d::<u8>(1, 3).unwrap(), 255);

        let plane = gray_to_mat(&GrayImage::from_pixel(3, 3, Luma([9]))).unwrap();
        assert_eq!(*plane.at_2d::<u8>(2, 2).unwrap(), 9);
    }

    #[test]
    fn test_mat_to_rgb_rejects_single_channel() {
        let gray = gray_to_mat(&GrayImage::new(2, 2)).unwrap();
        assert!(mat_to_rgb(&gray).is_err());
    }
}
