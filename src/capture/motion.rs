// SPDX-License-Identifier: GPL-3.0-only

//! Motion detection through adaptive background subtraction
//!
//! A mixture-of-Gaussians background model classifies each pixel as
//! foreground or background. The raw foreground mask is binarized and
//! cleaned with one erosion followed by three dilations, which removes
//! isolated false positives while closing small gaps in real foreground
//! blobs. Motion is "active" whenever the cleaned mask still contains
//! external contours.
//!
//! The model accumulates scene history for as long as monitoring stays
//! enabled; toggling monitoring off and on recreates it from scratch.

use super::convert::{bgr_mat_to_frame, frame_to_mat, gray_mat_to_frame};
use super::frame::{Frame, Region};
use crate::constants::motion as tuning;
use crate::errors::MotionError;
use opencv::core::{self, Mat, Ptr};
use opencv::imgproc;
use opencv::prelude::*;
use opencv::video::{self, BackgroundSubtractorMOG2, create_background_subtractor_mog2};

/// Per-frame result of the motion pipeline
#[derive(Debug, Clone)]
pub struct MotionUpdate {
    /// True when the cleaned foreground mask contains any contour
    pub active: bool,
    /// Bounding rectangle of the largest-area contour, if any
    pub largest_region: Option<Region>,
    /// Binary foreground mask
    pub mask: Frame,
    /// Current background estimate
    pub background: Frame,
}

/// Stateful foreground/background classifier
///
/// Implementations own whatever model state they need across frames; the
/// worker recreates the filter each time monitoring is toggled on.
pub trait MotionFilter: Send {
    fn process(&mut self, frame: &Frame) -> Result<MotionUpdate, MotionError>;
}

/// Factory invoked by the worker when monitoring turns on
pub type MotionFilterFactory =
    Box<dyn Fn() -> Result<Box<dyn MotionFilter>, MotionError> + Send>;

/// The production [`MotionFilterFactory`], backed by [`Mog2MotionFilter`]
pub fn mog2_filter_factory() -> MotionFilterFactory {
    Box::new(|| Ok(Box::new(Mog2MotionFilter::new()?) as Box<dyn MotionFilter>))
}

/// MOG2-backed motion filter
pub struct Mog2MotionFilter {
    subtractor: Ptr<BackgroundSubtractorMOG2>,
    kernel: Mat,
}

impl Mog2MotionFilter {
    pub fn new() -> Result<Self, MotionError> {
        let subtractor = create_background_subtractor_mog2(
            tuning::MODEL_HISTORY,
            tuning::VARIANCE_THRESHOLD,
            tuning::DETECT_SHADOWS,
        )
        .map_err(|e| MotionError::ModelUnavailable(e.to_string()))?;
        let kernel = imgproc::get_structuring_element(
            imgproc::MORPH_RECT,
            core::Size::new(tuning::MORPH_KERNEL_SIZE, tuning::MORPH_KERNEL_SIZE),
            core::Point::new(-1, -1),
        )?;
        Ok(Self { subtractor, kernel })
    }

    /// Binarize the raw foreground probabilities and suppress speckle noise
    fn clean_mask(&self, raw: &Mat) -> Result<Mat, MotionError> {
        let mut binary = Mat::default();
        imgproc::threshold(
            raw,
            &mut binary,
            tuning::MASK_THRESHOLD,
            255.0,
            imgproc::THRESH_BINARY,
        )?;

        let border = imgproc::morphology_default_border_value()?;
        let mut eroded = Mat::default();
        imgproc::erode(
            &binary,
            &mut eroded,
            &self.kernel,
            core::Point::new(-1, -1),
            tuning::ERODE_ITERATIONS,
            core::BORDER_CONSTANT,
            border,
        )?;

        let mut dilated = Mat::default();
        imgproc::dilate(
            &eroded,
            &mut dilated,
            &self.kernel,
            core::Point::new(-1, -1),
            tuning::DILATE_ITERATIONS,
            core::BORDER_CONSTANT,
            border,
        )?;

        Ok(dilated)
    }

    /// Bounding rectangle of the largest-area contour in the cleaned mask
    fn largest_region(
        contours: &core::Vector<core::Vector<core::Point>>,
    ) -> Result<Option<Region>, MotionError> {
        let mut best: Option<(f64, core::Rect)> = None;
        for contour in contours {
            let area = imgproc::contour_area(&contour, false)?;
            if best.as_ref().is_none_or(|(max, _)| area > *max) {
                best = Some((area, imgproc::bounding_rect(&contour)?));
            }
        }
        Ok(best.map(|(_, rect)| Region {
            x: rect.x.max(0) as u32,
            y: rect.y.max(0) as u32,
            width: rect.width.max(0) as u32,
            height: rect.height.max(0) as u32,
        }))
    }
}

impl MotionFilter for Mog2MotionFilter {
    fn process(&mut self, frame: &Frame) -> Result<MotionUpdate, MotionError> {
        let input = frame_to_mat(frame)?;

        let mut raw_mask = Mat::default();
        video::BackgroundSubtractorMOG2Trait::apply(
            &mut self.subtractor,
            &input,
            &mut raw_mask,
            -1.0,
        )?;

        let cleaned = self.clean_mask(&raw_mask)?;

        let mut contours = core::Vector::<core::Vector<core::Point>>::new();
        imgproc::find_contours(
            &cleaned,
            &mut contours,
            imgproc::RETR_EXTERNAL,
            imgproc::CHAIN_APPROX_SIMPLE,
            core::Point::new(0, 0),
        )?;

        let largest_region = Self::largest_region(&contours)?;

        let mut background_mat = Mat::default();
        video::BackgroundSubtractorTraitConst::get_background_image(
            &self.subtractor,
            &mut background_mat,
        )?;
        let background = if background_mat.empty() {
            // The model reports no estimate until it has seen enough frames
            Frame::blank(frame.width, frame.height)
        } else {
            bgr_mat_to_frame(&background_mat)?
        };

        Ok(MotionUpdate {
            active: !contours.is_empty(),
            largest_region,
            mask: gray_mat_to_frame(&cleaned)?,
            background,
        })
    }
}
