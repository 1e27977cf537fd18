// SPDX-License-Identifier: GPL-3.0-only

//! Conversions between owned [`Frame`] buffers and OpenCV matrices

use super::frame::{Frame, PixelFormat};
use opencv::core::{self, Mat};
use opencv::prelude::*;

/// Copy a BGR `Mat` into an owned frame
pub fn bgr_mat_to_frame(mat: &Mat) -> opencv::Result<Frame> {
    mat_to_frame(mat, PixelFormat::Bgr)
}

/// Copy a single-channel `Mat` into an owned grayscale frame
pub fn gray_mat_to_frame(mat: &Mat) -> opencv::Result<Frame> {
    mat_to_frame(mat, PixelFormat::Gray8)
}

fn mat_to_frame(mat: &Mat, format: PixelFormat) -> opencv::Result<Frame> {
    let width = mat.cols() as u32;
    let height = mat.rows() as u32;
    let data = if mat.is_continuous() {
        mat.data_bytes()?.to_vec()
    } else {
        let owned = mat.try_clone()?;
        owned.data_bytes()?.to_vec()
    };
    Ok(Frame::from_data(width, height, format, data))
}

/// Copy an owned frame into a `Mat` of the matching element type
pub fn frame_to_mat(frame: &Frame) -> opencv::Result<Mat> {
    let typ = match frame.format {
        PixelFormat::Bgr | PixelFormat::Rgb => core::CV_8UC3,
        PixelFormat::Gray8 => core::CV_8UC1,
    };
    let mut mat = Mat::new_rows_cols_with_default(
        frame.height as i32,
        frame.width as i32,
        typ,
        core::Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(&frame.data);
    Ok(mat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_round_trips_through_mat() {
        let frame = Frame::from_data(
            2,
            2,
            PixelFormat::Bgr,
            vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
        );
        let mat = frame_to_mat(&frame).unwrap();
        let back = bgr_mat_to_frame(&mat).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn gray_frame_round_trips_through_mat() {
        let frame = Frame::from_data(3, 2, PixelFormat::Gray8, vec![0, 64, 128, 192, 255, 32]);
        let mat = frame_to_mat(&frame).unwrap();
        let back = gray_mat_to_frame(&mat).unwrap();
        assert_eq!(back, frame);
    }
}
